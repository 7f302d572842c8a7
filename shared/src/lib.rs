//! # Shared Game Core
//!
//! Everything both roles of a match agree on lives here: the entity model,
//! the per-maze simulation, the level catalog, the replication protocol and
//! the session state machine that ties two mazes into one match.
//!
//! The authoritative side (`server`) drives [`session::Session::tick`] and
//! publishes [`protocol::GameSnapshot`]s; the mirror side (`client`) overwrites
//! its copy of the session with each snapshot it receives and only ever sends
//! back [`protocol::InputMessage`]s.
//!
//! ## Module Organization
//!
//! - `geometry`: positions, rectangles, facing and movement intent
//! - `entity`: players, enemies, walls, collectibles and cosmetic particles
//! - `levels`: the static ASCII level catalog and its parser
//! - `maze`: one player's maze and its per-tick update
//! - `protocol`: snapshot/input records, length-prefixed framing, replication
//! - `session`: mode select → login → play → level complete → game over
//! - `config`: simulation and session tunables

pub mod config;
pub mod entity;
pub mod geometry;
pub mod levels;
pub mod maze;
pub mod protocol;
pub mod session;

pub use config::{SessionConfig, SimConfig};
pub use entity::{Collectible, CollectibleKind, Enemy, EnemyBehavior, Particle, Player, PlayerId, Wall};
pub use geometry::{Direction, MoveIntent, Position, Rect};
pub use maze::{MazeSimulation, SimEvent, TickReport};
pub use protocol::{
    read_frame, write_frame, FullStateReplication, GameSnapshot, InputMessage, MazeSnapshot, Packet,
    ProtocolError, ReplicationTransport,
};
pub use session::{GamePhase, LinkState, MatchResult, Role, Session, SessionError, SessionUpdate};

/// Side length of one grid cell in pixels.
pub const TILE_SIZE: f32 = 40.0;
/// TCP port both roles use unless configured otherwise.
pub const DEFAULT_PORT: u16 = 5050;

pub const PLAYER_SIZE: f32 = TILE_SIZE - 8.0;
pub const PLAYER_SPEED: f32 = 4.0;
pub const PLAYER_MAX_HEALTH: i32 = 100;
pub const PLAYER_ATTACK_DAMAGE: i32 = 15;
pub const PLAYER_ATTACK_RANGE: f32 = TILE_SIZE * 1.5;
pub const PLAYER_ATTACK_COOLDOWN_MS: u64 = 300;

pub const ENEMY_SIZE: f32 = TILE_SIZE - 8.0;
pub const ENEMY_SPEED_PATROL: f32 = 2.0;
pub const ENEMY_SPEED_CHASE: f32 = 3.0;
pub const ENEMY_MAX_HEALTH: i32 = 30;
pub const ENEMY_DAMAGE: i32 = 5;
pub const ENEMY_ATTACK_RANGE: f32 = TILE_SIZE * 1.2;
pub const ENEMY_ATTACK_COOLDOWN_MS: u64 = 1000;
pub const ENEMY_DETECTION_RANGE: f32 = TILE_SIZE * 6.0;
/// Patrol targets are re-rolled within this many pixels of the enemy.
pub const ENEMY_PATROL_RADIUS: i32 = 100;
pub const PATROL_ARRIVAL_DISTANCE: f32 = 10.0;
pub const PATROL_REROLL_MIN_MS: u64 = 1000;
pub const PATROL_REROLL_MAX_MS: u64 = 3000;

pub const WALL_MAX_HEALTH: i32 = 40;
pub const COLLECTIBLE_SIZE: f32 = TILE_SIZE / 2.0;

pub const GOLD_VALUE: u32 = 25;
pub const HEALTH_POTION_HEAL: i32 = 20;
pub const ENEMY_KILL_BONUS: u32 = 50;
pub const WALL_DESTROY_BONUS: u32 = 10;

pub const SURGE_DURATION_MS: u64 = 1000;
pub const SURGE_PARTICLE_COUNT: usize = 80;
pub const BONUS_ENEMY_COUNT: usize = 2;

/// Largest payload a peer may announce in a frame header.
pub const MAX_FRAME_LEN: usize = 1 << 20;
/// Pause between two iterations of either side's communication loop.
pub const SESSION_CADENCE_MS: u64 = 16;
pub const LEVEL_COMPLETE_DELAY_MS: u64 = 2000;
pub const INTRO_DURATION_MS: u64 = 3000;

/// Player slot controlled by the hosting process.
pub const HOST_PLAYER: PlayerId = 1;
/// Player slot controlled by the connected peer.
pub const GUEST_PLAYER: PlayerId = 2;
