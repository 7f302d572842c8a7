//! # Maze Duel Client
//!
//! The windowed frontend for both roles of a maze duel.
//!
//! ## Roles
//!
//! ### Hosting
//! The frontend embeds the `server` crate's [`server::game::HostGame`]: the
//! local player's keys feed the authoritative session directly and the
//! listener serves snapshots to the joining player.
//!
//! ### Joining
//! The frontend keeps a mirror [`shared::Session`] that never simulates. Each
//! snapshot from the host overwrites it wholesale; there is no prediction or
//! interpolation, so what is drawn is exactly what the host last sent.
//!
//! ## Threading
//!
//! macroquad owns the main thread. Networking runs on a tokio runtime in the
//! background and talks to the frontend only through channels, so the frame
//! loop never waits on a socket.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! - [`game::MirrorGame`]: applies snapshots and forwards local input
//! - [`game::Frontend`]: mode select, login, hosting and joining stages
//!
//! ### Input Module (`input`)
//! Keyboard sampling with edge detection and the login text form.
//!
//! ### Network Module (`network`)
//! The mirror-side communication task and its frontend handle.
//!
//! ### Rendering Module (`rendering`)
//! Draws both mazes side by side with per-player info bars and phase banners.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
