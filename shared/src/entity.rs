//! Game objects living inside a maze.
//!
//! Instead of a base class every entity implements the capability traits it
//! needs: [`Positioned`] for anything with a bounding box and [`Replicated`]
//! for anything that travels in a snapshot. Particles are positioned but never
//! replicated individually.

use crate::geometry::{Direction, MoveIntent, Position, Rect};
use crate::protocol::{CollectibleState, EnemyState, PlayerState, WallState};
use crate::*;
use serde::{Deserialize, Serialize};

pub type PlayerId = u8;

pub trait Positioned {
    fn position(&self) -> Position;

    /// Full width and height of the bounding box.
    fn size(&self) -> (f32, f32);

    fn bounds(&self) -> Rect {
        let (width, height) = self.size();
        Rect::centered(self.position(), width, height)
    }
}

/// Conversion between a live entity and its wire record.
pub trait Replicated {
    type State;

    fn capture(&self) -> Self::State;

    /// Overwrites every replicated field with the values in `state`.
    fn restore(&mut self, state: &Self::State);
}

/// Returns true when no attack happened yet or `cooldown_ms` has passed since.
pub fn cooldown_elapsed(last_ms: Option<u64>, now_ms: u64, cooldown_ms: u64) -> bool {
    last_ms.map_or(true, |last| now_ms.saturating_sub(last) >= cooldown_ms)
}

/// Progression that survives a level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStats {
    pub health: i32,
    pub score: u32,
    pub keys: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub position: Position,
    pub health: i32,
    pub max_health: i32,
    pub score: u32,
    pub keys: u32,
    pub facing: Direction,
    pub last_attack_ms: Option<u64>,
    pub intent: MoveIntent,
    pub attack_requested: bool,
}

impl Player {
    pub fn new(id: PlayerId, position: Position) -> Self {
        Self {
            id,
            position,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            score: 0,
            keys: 0,
            facing: Direction::default(),
            last_attack_ms: None,
            intent: MoveIntent::default(),
            attack_requested: false,
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.health = (self.health - amount).clamp(0, self.max_health);
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).clamp(0, self.max_health);
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0
    }

    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            health: self.health,
            score: self.score,
            keys: self.keys,
        }
    }

    pub fn apply_stats(&mut self, stats: PlayerStats) {
        self.health = stats.health.clamp(0, self.max_health);
        self.score = stats.score;
        self.keys = stats.keys;
    }
}

impl Positioned for Player {
    fn position(&self) -> Position {
        self.position
    }

    fn size(&self) -> (f32, f32) {
        (PLAYER_SIZE, PLAYER_SIZE)
    }
}

impl Replicated for Player {
    type State = PlayerState;

    fn capture(&self) -> PlayerState {
        PlayerState {
            x: self.position.x,
            y: self.position.y,
            health: self.health,
            score: self.score,
            keys: self.keys,
            facing: self.facing,
        }
    }

    fn restore(&mut self, state: &PlayerState) {
        self.position = Position::new(state.x, state.y);
        self.health = state.health.clamp(0, self.max_health);
        self.score = state.score;
        self.keys = state.keys;
        self.facing = state.facing;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnemyBehavior {
    #[default]
    Patrol,
    Chase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub position: Position,
    pub health: i32,
    pub max_health: i32,
    pub behavior: EnemyBehavior,
    pub patrol_target: Position,
    pub last_attack_ms: Option<u64>,
    /// Time after which the patrol target is re-rolled even if not reached.
    pub next_patrol_ms: u64,
}

impl Enemy {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            health: ENEMY_MAX_HEALTH,
            max_health: ENEMY_MAX_HEALTH,
            behavior: EnemyBehavior::Patrol,
            patrol_target: position,
            last_attack_ms: None,
            next_patrol_ms: 0,
        }
    }

    pub fn take_damage(&mut self, amount: i32) {
        self.health = (self.health - amount).clamp(0, self.max_health);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

impl Positioned for Enemy {
    fn position(&self) -> Position {
        self.position
    }

    fn size(&self) -> (f32, f32) {
        (ENEMY_SIZE, ENEMY_SIZE)
    }
}

impl Replicated for Enemy {
    type State = EnemyState;

    fn capture(&self) -> EnemyState {
        EnemyState {
            x: self.position.x,
            y: self.position.y,
            health: self.health,
            behavior: self.behavior,
            patrol_x: self.patrol_target.x,
            patrol_y: self.patrol_target.y,
        }
    }

    fn restore(&mut self, state: &EnemyState) {
        self.position = Position::new(state.x, state.y);
        self.health = state.health.clamp(0, self.max_health);
        self.behavior = state.behavior;
        self.patrol_target = Position::new(state.patrol_x, state.patrol_y);
    }
}

/// A wall occupying one full grid cell. Only breakable walls carry health.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub row: usize,
    pub col: usize,
    pub health: Option<i32>,
}

impl Wall {
    pub fn solid(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            health: None,
        }
    }

    pub fn breakable(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            health: Some(WALL_MAX_HEALTH),
        }
    }

    pub fn is_breakable(&self) -> bool {
        self.health.is_some()
    }

    /// Applies damage to a breakable wall and returns true once it is destroyed.
    /// Solid walls ignore damage.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        match self.health.as_mut() {
            Some(health) => {
                *health = (*health - amount).clamp(0, WALL_MAX_HEALTH);
                *health == 0
            }
            None => false,
        }
    }
}

impl Positioned for Wall {
    fn position(&self) -> Position {
        Position::tile_center(self.row, self.col)
    }

    fn size(&self) -> (f32, f32) {
        (TILE_SIZE, TILE_SIZE)
    }
}

impl Replicated for Wall {
    type State = WallState;

    fn capture(&self) -> WallState {
        WallState {
            row: self.row as u16,
            col: self.col as u16,
            breakable: self.is_breakable(),
            health: self.health,
        }
    }

    fn restore(&mut self, state: &WallState) {
        self.row = state.row as usize;
        self.col = state.col as usize;
        self.health = if state.breakable {
            Some(state.health.unwrap_or(WALL_MAX_HEALTH).clamp(0, WALL_MAX_HEALTH))
        } else {
            None
        };
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleKind {
    Gold,
    HealthPotion,
    Key,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub position: Position,
    pub kind: CollectibleKind,
}

impl Collectible {
    pub fn new(position: Position, kind: CollectibleKind) -> Self {
        Self { position, kind }
    }

    /// Applies this pickup's effect to `player`.
    pub fn apply(&self, player: &mut Player, config: &SimConfig) {
        match self.kind {
            CollectibleKind::Gold => player.score += config.gold_value,
            CollectibleKind::HealthPotion => player.heal(config.potion_heal),
            CollectibleKind::Key => player.keys += 1,
        }
    }
}

impl Positioned for Collectible {
    fn position(&self) -> Position {
        self.position
    }

    fn size(&self) -> (f32, f32) {
        (COLLECTIBLE_SIZE, COLLECTIBLE_SIZE)
    }
}

impl Replicated for Collectible {
    type State = CollectibleState;

    fn capture(&self) -> CollectibleState {
        CollectibleState {
            x: self.position.x,
            y: self.position.y,
            kind: self.kind,
        }
    }

    fn restore(&mut self, state: &CollectibleState) {
        self.position = Position::new(state.x, state.y);
        self.kind = state.kind;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Hit,
    Death,
    Debris,
    Sparkle,
    Electric,
}

impl ParticleKind {
    fn gravity(self) -> f32 {
        match self {
            ParticleKind::Electric => 0.0,
            _ => 0.3,
        }
    }
}

/// Cosmetic only; never read by the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Position,
    pub vx: f32,
    pub vy: f32,
    pub lifespan: u32,
    pub max_lifespan: u32,
    pub kind: ParticleKind,
}

impl Particle {
    pub fn new(position: Position, vx: f32, vy: f32, lifespan: u32, kind: ParticleKind) -> Self {
        Self {
            position,
            vx,
            vy,
            lifespan,
            max_lifespan: lifespan,
            kind,
        }
    }

    /// Advances one tick. Returns false once the particle has expired.
    pub fn update(&mut self) -> bool {
        self.position = self.position.offset(self.vx, self.vy);
        self.vy += self.kind.gravity();
        self.lifespan = self.lifespan.saturating_sub(1);
        self.lifespan > 0
    }

    /// Remaining life in `0.0..=1.0`, used for fading.
    pub fn life_fraction(&self) -> f32 {
        if self.max_lifespan == 0 {
            return 0.0;
        }
        self.lifespan as f32 / self.max_lifespan as f32
    }
}

impl Positioned for Particle {
    fn position(&self) -> Position {
        self.position
    }

    fn size(&self) -> (f32, f32) {
        (4.0, 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_player_creation() {
        let player = Player::new(1, Position::tile_center(1, 1));
        assert_eq!(player.id, 1);
        assert_eq!(player.health, PLAYER_MAX_HEALTH);
        assert_eq!(player.score, 0);
        assert_eq!(player.keys, 0);
        assert_eq!(player.facing, Direction::Right);
        assert!(player.last_attack_ms.is_none());
    }

    #[test]
    fn test_player_bounds() {
        let player = Player::new(1, Position::new(60.0, 60.0));
        let bounds = player.bounds();
        assert_approx_eq!(bounds.x, 44.0);
        assert_approx_eq!(bounds.y, 44.0);
        assert_approx_eq!(bounds.width, PLAYER_SIZE);
    }

    #[test]
    fn test_player_health_is_clamped() {
        let mut player = Player::new(1, Position::default());
        player.take_damage(250);
        assert_eq!(player.health, 0);
        assert!(player.is_defeated());

        player.heal(500);
        assert_eq!(player.health, PLAYER_MAX_HEALTH);
    }

    #[test]
    fn test_player_stats_carry_over() {
        let mut player = Player::new(2, Position::default());
        player.apply_stats(PlayerStats {
            health: 55,
            score: 300,
            keys: 2,
        });
        assert_eq!(player.stats().health, 55);
        assert_eq!(player.stats().score, 300);
        assert_eq!(player.stats().keys, 2);
    }

    #[test]
    fn test_player_state_round_trip_keeps_id() {
        let mut source = Player::new(1, Position::new(100.0, 140.0));
        source.score = 75;
        source.facing = Direction::Up;

        let mut mirror = Player::new(2, Position::default());
        mirror.restore(&source.capture());

        assert_eq!(mirror.id, 2);
        assert_eq!(mirror.position, source.position);
        assert_eq!(mirror.score, 75);
        assert_eq!(mirror.facing, Direction::Up);
    }

    #[test]
    fn test_cooldown_elapsed() {
        assert!(cooldown_elapsed(None, 0, 300));
        assert!(!cooldown_elapsed(Some(100), 399, 300));
        assert!(cooldown_elapsed(Some(100), 400, 300));
    }

    #[test]
    fn test_enemy_damage_and_death() {
        let mut enemy = Enemy::new(Position::tile_center(2, 2));
        assert_eq!(enemy.behavior, EnemyBehavior::Patrol);
        enemy.take_damage(15);
        assert!(!enemy.is_dead());
        enemy.take_damage(40);
        assert_eq!(enemy.health, 0);
        assert!(enemy.is_dead());
    }

    #[test]
    fn test_breakable_wall_destruction() {
        let mut wall = Wall::breakable(3, 4);
        assert!(!wall.take_damage(10));
        assert!(!wall.take_damage(10));
        assert!(!wall.take_damage(10));
        assert!(wall.take_damage(10));
        assert_eq!(wall.health, Some(0));
    }

    #[test]
    fn test_solid_wall_ignores_damage() {
        let mut wall = Wall::solid(0, 0);
        assert!(!wall.take_damage(1000));
        assert_eq!(wall.health, None);
        assert_approx_eq!(wall.bounds().width, TILE_SIZE);
    }

    #[test]
    fn test_collectible_effects() {
        let config = SimConfig::default();
        let mut player = Player::new(1, Position::default());
        player.take_damage(90);

        Collectible::new(Position::default(), CollectibleKind::Gold).apply(&mut player, &config);
        Collectible::new(Position::default(), CollectibleKind::HealthPotion).apply(&mut player, &config);
        Collectible::new(Position::default(), CollectibleKind::Key).apply(&mut player, &config);

        assert_eq!(player.score, 25);
        assert_eq!(player.health, 30);
        assert_eq!(player.keys, 1);
    }

    #[test]
    fn test_particle_decay() {
        let mut particle = Particle::new(Position::default(), 1.0, 0.0, 2, ParticleKind::Hit);
        assert!(particle.update());
        assert_approx_eq!(particle.vy, 0.3);
        assert!(!particle.update());

        let mut spark = Particle::new(Position::default(), 0.0, 0.0, 5, ParticleKind::Electric);
        spark.update();
        assert_approx_eq!(spark.vy, 0.0);
        assert_approx_eq!(spark.life_fraction(), 0.8);
    }
}
