//! Simulation and session tunables.
//!
//! Defaults come from the crate-level constants; tests and the binaries
//! override individual fields.

use crate::*;

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub player_speed: f32,
    pub player_attack_damage: i32,
    pub player_attack_range: f32,
    pub player_attack_cooldown_ms: u64,
    pub enemy_patrol_speed: f32,
    pub enemy_chase_speed: f32,
    pub enemy_damage: i32,
    pub enemy_attack_range: f32,
    pub enemy_attack_cooldown_ms: u64,
    pub enemy_detection_range: f32,
    pub gold_value: u32,
    pub potion_heal: i32,
    pub kill_bonus: u32,
    pub wall_bonus: u32,
    pub surge_duration_ms: u64,
    pub bonus_enemy_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            player_speed: PLAYER_SPEED,
            player_attack_damage: PLAYER_ATTACK_DAMAGE,
            player_attack_range: PLAYER_ATTACK_RANGE,
            player_attack_cooldown_ms: PLAYER_ATTACK_COOLDOWN_MS,
            enemy_patrol_speed: ENEMY_SPEED_PATROL,
            enemy_chase_speed: ENEMY_SPEED_CHASE,
            enemy_damage: ENEMY_DAMAGE,
            enemy_attack_range: ENEMY_ATTACK_RANGE,
            enemy_attack_cooldown_ms: ENEMY_ATTACK_COOLDOWN_MS,
            enemy_detection_range: ENEMY_DETECTION_RANGE,
            gold_value: GOLD_VALUE,
            potion_heal: HEALTH_POTION_HEAL,
            kill_bonus: ENEMY_KILL_BONUS,
            wall_bonus: WALL_DESTROY_BONUS,
            surge_duration_ms: SURGE_DURATION_MS,
            bonus_enemy_count: BONUS_ENEMY_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub level_complete_delay_ms: u64,
    pub intro_duration_ms: u64,
    pub cadence_ms: u64,
    pub username: String,
    pub password: String,
    /// Seed for both mazes' RNGs; `None` draws one from entropy.
    pub seed: Option<u64>,
    pub sim: SimConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            level_complete_delay_ms: LEVEL_COMPLETE_DELAY_MS,
            intro_duration_ms: INTRO_DURATION_MS,
            cadence_ms: SESSION_CADENCE_MS,
            username: "user".to_string(),
            password: "pass".to_string(),
            seed: None,
            sim: SimConfig::default(),
        }
    }
}
