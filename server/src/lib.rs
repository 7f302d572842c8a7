//! # Maze Duel Host
//!
//! The authoritative side of a two-player maze duel. The host owns the only
//! live copy of both mazes; the guest sees them through snapshots.
//!
//! ## Exchange cadence
//!
//! Over one TCP connection the host repeats, every cadence period:
//! 1. Send the latest full [`shared::GameSnapshot`]
//! 2. Block until the guest answers with one [`shared::InputMessage`]
//! 3. Hand that input to the game loop
//!
//! Frames are length-prefixed bincode packets (see [`shared::protocol`]).
//! A read or decode failure ends the connection and the session freezes
//! with the link marked lost.
//!
//! ## Module Organization
//!
//! ### Peer Manager (`peer_manager`)
//! Admission of the single guest slot and per-peer activity counters.
//!
//! ### Network (`network`)
//! TCP listener, per-connection exchange task and the channels that connect
//! them to the game loop. Network tasks never touch the session directly.
//!
//! ### Game (`game`)
//! [`game::HostGame`] wraps the host [`shared::Session`], drains network
//! events, ticks the simulation and publishes snapshots. Used by both the
//! headless binary and the graphical client when it hosts.

pub mod game;
pub mod network;
pub mod peer_manager;
