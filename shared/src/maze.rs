//! One player's maze: the player, its enemies, walls, collectibles and exit.
//!
//! The authoritative side calls [`MazeSimulation::tick`] once per frame. The
//! mirror side never ticks; it overwrites the whole maze with
//! [`MazeSimulation::apply_snapshot`].

use crate::entity::{
    cooldown_elapsed, Collectible, CollectibleKind, Enemy, EnemyBehavior, Particle, ParticleKind,
    Player, PlayerId, Positioned, Replicated, Wall,
};
use crate::geometry::{Position, Rect};
use crate::levels::{self, LevelError, LevelLayout, Tile};
use crate::protocol::{MazeSnapshot, ProtocolError, SparkState};
use crate::*;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::f32::consts::TAU;

const HIT_PARTICLES: usize = 5;
const DEATH_PARTICLES: usize = 15;
const DEBRIS_PARTICLES: usize = 10;
const SPARKLE_PARTICLES: usize = 8;
/// Lifespan in ticks of sparks rebuilt from a snapshot.
const MIRRORED_SPARK_LIFESPAN: u32 = 30;

/// Something worth reacting to that happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    EnemySlain { at: Position },
    WallDestroyed { row: usize, col: usize },
    ItemCollected { kind: CollectibleKind },
    PlayerHit { damage: i32, health: i32 },
    SurgeStarted { origin: Position },
    BonusEnemiesSpawned { count: usize },
}

/// Post-tick facts the session has to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub player_defeated: bool,
    pub reached_exit: bool,
    pub events: Vec<SimEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terrain {
    Floor,
    Wall,
    BreakableWall,
    Exit,
}

/// Live terrain of the loaded level. Destroyed breakable walls become floor.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    width: usize,
    height: usize,
    cells: Vec<Terrain>,
}

impl TerrainGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Terrain::Floor; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Terrain> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.cells[row * self.width + col])
    }

    /// Out-of-range cells are ignored.
    pub fn set(&mut self, row: usize, col: usize, terrain: Terrain) {
        if row < self.height && col < self.width {
            self.cells[row * self.width + col] = terrain;
        }
    }

    /// Pixel extent of the whole grid.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width as f32 * TILE_SIZE,
            self.height as f32 * TILE_SIZE,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Surge {
    origin: Position,
    initial_enemies: usize,
    triggered: bool,
    started_ms: Option<u64>,
}

impl Surge {
    fn new(origin: Position, initial_enemies: usize) -> Self {
        Self {
            origin,
            initial_enemies,
            triggered: false,
            started_ms: None,
        }
    }
}

pub struct MazeSimulation {
    player_id: PlayerId,
    level_index: usize,
    config: SimConfig,
    grid: TerrainGrid,
    player: Option<Player>,
    enemies: Vec<Enemy>,
    walls: Vec<Wall>,
    collectibles: Vec<Collectible>,
    exit: Option<Rect>,
    particles: Vec<Particle>,
    destroyed_walls: BTreeSet<(usize, usize)>,
    surge: Surge,
    rng: StdRng,
}

impl MazeSimulation {
    /// Creates an empty maze; nothing happens on `tick` until a level is loaded.
    pub fn new(player_id: PlayerId, config: SimConfig, seed: u64) -> Self {
        Self {
            player_id,
            level_index: 0,
            config,
            grid: TerrainGrid::new(0, 0),
            player: None,
            enemies: Vec::new(),
            walls: Vec::new(),
            collectibles: Vec::new(),
            exit: None,
            particles: Vec::new(),
            destroyed_walls: BTreeSet::new(),
            surge: Surge::new(Position::default(), 0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn load_level(&mut self, index: usize) -> Result<(), LevelError> {
        let layout = levels::load(index)?;
        self.load_layout(index, &layout);
        Ok(())
    }

    /// Replaces every live set with the contents of `layout`. Health, score
    /// and keys of a previously loaded player carry over.
    pub fn load_layout(&mut self, index: usize, layout: &LevelLayout) {
        let carried = self.player.take().map(|p| p.stats());

        self.level_index = index;
        self.grid = TerrainGrid::new(layout.width(), layout.height());
        self.enemies.clear();
        self.walls.clear();
        self.collectibles.clear();
        self.particles.clear();
        self.destroyed_walls.clear();
        self.exit = None;

        for (row, col, tile) in layout.cells() {
            let center = Position::tile_center(row, col);
            match tile {
                Tile::Wall => {
                    self.grid.set(row, col, Terrain::Wall);
                    self.walls.push(Wall::solid(row, col));
                }
                Tile::BreakableWall => {
                    self.grid.set(row, col, Terrain::BreakableWall);
                    self.walls.push(Wall::breakable(row, col));
                }
                Tile::PlayerSpawn => self.player = Some(Player::new(self.player_id, center)),
                Tile::EnemySpawn => self.enemies.push(Enemy::new(center)),
                Tile::Gold => self
                    .collectibles
                    .push(Collectible::new(center, CollectibleKind::Gold)),
                Tile::HealthPotion => self
                    .collectibles
                    .push(Collectible::new(center, CollectibleKind::HealthPotion)),
                Tile::Key => self
                    .collectibles
                    .push(Collectible::new(center, CollectibleKind::Key)),
                Tile::Exit => {
                    self.grid.set(row, col, Terrain::Exit);
                    self.exit = Some(Rect::tile(row, col));
                }
                Tile::Floor | Tile::SurgeOrigin => {}
            }
        }

        if let (Some(player), Some(stats)) = (self.player.as_mut(), carried) {
            player.apply_stats(stats);
        }

        let (row, col) = layout.surge_origin();
        self.surge = Surge::new(Position::tile_center(row, col), self.enemies.len());

        debug!(
            "Maze {} loaded level {}: {} enemies, {} walls, {} collectibles",
            self.player_id,
            index,
            self.enemies.len(),
            self.walls.len(),
            self.collectibles.len()
        );
    }

    /// Stores movement and attack intent for the next tick.
    pub fn apply_input(&mut self, input: &InputMessage) {
        if let Some(player) = self.player.as_mut() {
            player.intent = input.intent();
            player.attack_requested = input.attack;
        }
    }

    /// Advances the maze by one step at wall-clock time `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> TickReport {
        let mut report = TickReport::default();
        let Some(mut player) = self.player.take() else {
            return report;
        };

        self.move_player(&mut player);

        if player.attack_requested
            && cooldown_elapsed(
                player.last_attack_ms,
                now_ms,
                self.config.player_attack_cooldown_ms,
            )
        {
            player.last_attack_ms = Some(now_ms);
            self.resolve_attack(&mut player, now_ms, &mut report.events);
        }

        self.update_enemies(&mut player, now_ms, &mut report.events);
        self.collect_items(&mut player, &mut report.events);
        self.update_surge(now_ms, &mut report.events);
        self.particles.retain_mut(|particle| particle.update());

        report.player_defeated = player.is_defeated();
        report.reached_exit = self
            .exit
            .map_or(false, |exit| exit.intersects(&player.bounds()));

        for event in &report.events {
            debug!("Maze {}: {:?}", self.player_id, event);
        }

        self.player = Some(player);
        report
    }

    fn move_player(&self, player: &mut Player) {
        let intent = player.intent;
        if let Some(facing) = intent.facing() {
            player.facing = facing;
        }
        if intent.is_idle() {
            return;
        }

        let speed = self.config.player_speed;
        let candidate = player
            .position
            .offset(intent.dx as f32 * speed, intent.dy as f32 * speed);
        let bounds = Rect::centered(candidate, PLAYER_SIZE, PLAYER_SIZE);

        if !self.grid.bounds().contains(&bounds) {
            return;
        }
        if self.walls.iter().any(|wall| wall.bounds().intersects(&bounds)) {
            return;
        }
        player.position = candidate;
    }

    fn resolve_attack(&mut self, player: &mut Player, now_ms: u64, events: &mut Vec<SimEvent>) {
        let origin = player.position;
        let range = self.config.player_attack_range;
        let damage = self.config.player_attack_damage;

        let mut hits = Vec::new();
        for enemy in self
            .enemies
            .iter_mut()
            .filter(|enemy| enemy.position.distance_to(origin) < range)
        {
            enemy.take_damage(damage);
            hits.push(enemy.position);
        }
        for at in hits {
            self.burst(at, HIT_PARTICLES, ParticleKind::Hit);
        }

        let mut slain = Vec::new();
        self.enemies.retain(|enemy| {
            if enemy.is_dead() {
                slain.push(enemy.position);
                false
            } else {
                true
            }
        });
        for at in slain {
            player.score += self.config.kill_bonus;
            events.push(SimEvent::EnemySlain { at });
            self.burst(at, DEATH_PARTICLES, ParticleKind::Death);
        }

        let mut destroyed = Vec::new();
        for wall in self
            .walls
            .iter_mut()
            .filter(|wall| wall.is_breakable() && wall.position().distance_to(origin) < range)
        {
            if wall.take_damage(damage) {
                destroyed.push((wall.row, wall.col));
            }
        }
        if !destroyed.is_empty() {
            self.walls
                .retain(|wall| !destroyed.contains(&(wall.row, wall.col)));
            for (row, col) in destroyed {
                self.grid.set(row, col, Terrain::Floor);
                self.destroyed_walls.insert((row, col));
                player.score += self.config.wall_bonus;
                events.push(SimEvent::WallDestroyed { row, col });
                self.burst(
                    Position::tile_center(row, col),
                    DEBRIS_PARTICLES,
                    ParticleKind::Debris,
                );
            }
        }

        if !self.surge.triggered && self.surge.initial_enemies > 0 && self.enemies.is_empty() {
            self.start_surge(now_ms, events);
        }
    }

    fn update_enemies(&mut self, player: &mut Player, now_ms: u64, events: &mut Vec<SimEvent>) {
        let config = &self.config;
        let extent = self.grid.bounds();

        for enemy in self.enemies.iter_mut() {
            let distance = enemy.position.distance_to(player.position);
            let (target, speed) = if distance < config.enemy_detection_range {
                enemy.behavior = EnemyBehavior::Chase;
                (player.position, config.enemy_chase_speed)
            } else {
                enemy.behavior = EnemyBehavior::Patrol;
                if now_ms >= enemy.next_patrol_ms
                    || enemy.position.distance_to(enemy.patrol_target) < PATROL_ARRIVAL_DISTANCE
                {
                    let dx = self.rng.gen_range(-ENEMY_PATROL_RADIUS..=ENEMY_PATROL_RADIUS);
                    let dy = self.rng.gen_range(-ENEMY_PATROL_RADIUS..=ENEMY_PATROL_RADIUS);
                    enemy.patrol_target = enemy.position.offset(dx as f32, dy as f32);
                    enemy.next_patrol_ms =
                        now_ms + self.rng.gen_range(PATROL_REROLL_MIN_MS..=PATROL_REROLL_MAX_MS);
                }
                (enemy.patrol_target, config.enemy_patrol_speed)
            };

            let candidate = enemy.position.step_towards(target, speed);
            let bounds = Rect::centered(candidate, ENEMY_SIZE, ENEMY_SIZE);
            if extent.contains(&bounds) && !overlaps_solid_wall(&self.walls, &bounds) {
                enemy.position = candidate;
            }

            if enemy.behavior == EnemyBehavior::Chase
                && enemy.position.distance_to(player.position) < config.enemy_attack_range
                && cooldown_elapsed(enemy.last_attack_ms, now_ms, config.enemy_attack_cooldown_ms)
            {
                enemy.last_attack_ms = Some(now_ms);
                player.take_damage(config.enemy_damage);
                events.push(SimEvent::PlayerHit {
                    damage: config.enemy_damage,
                    health: player.health,
                });
            }
        }
    }

    fn collect_items(&mut self, player: &mut Player, events: &mut Vec<SimEvent>) {
        let bounds = player.bounds();
        let config = &self.config;
        let mut collected = Vec::new();

        self.collectibles.retain(|item| {
            if item.bounds().intersects(&bounds) {
                item.apply(player, config);
                collected.push((item.kind, item.position));
                false
            } else {
                true
            }
        });

        for (kind, at) in collected {
            events.push(SimEvent::ItemCollected { kind });
            self.burst(at, SPARKLE_PARTICLES, ParticleKind::Sparkle);
        }
    }

    fn start_surge(&mut self, now_ms: u64, events: &mut Vec<SimEvent>) {
        self.surge.triggered = true;
        self.surge.started_ms = Some(now_ms);
        let origin = self.surge.origin;
        self.burst(origin, SURGE_PARTICLE_COUNT, ParticleKind::Electric);
        events.push(SimEvent::SurgeStarted { origin });
    }

    fn update_surge(&mut self, now_ms: u64, events: &mut Vec<SimEvent>) {
        let Some(started) = self.surge.started_ms else {
            return;
        };
        if now_ms.saturating_sub(started) < self.config.surge_duration_ms {
            return;
        }

        self.surge.started_ms = None;
        let origin = self.surge.origin;
        let jitter = TILE_SIZE / 2.0;
        for _ in 0..self.config.bonus_enemy_count {
            let dx = self.rng.gen_range(-jitter..=jitter);
            let dy = self.rng.gen_range(-jitter..=jitter);
            let jittered = origin.offset(dx, dy);
            let bounds = Rect::centered(jittered, ENEMY_SIZE, ENEMY_SIZE);
            let spawn = if self.grid.bounds().contains(&bounds)
                && !overlaps_solid_wall(&self.walls, &bounds)
            {
                jittered
            } else {
                origin
            };
            self.enemies.push(Enemy::new(spawn));
        }
        events.push(SimEvent::BonusEnemiesSpawned {
            count: self.config.bonus_enemy_count,
        });
    }

    fn burst(&mut self, origin: Position, count: usize, kind: ParticleKind) {
        let (max_speed, lifespan) = match kind {
            ParticleKind::Hit => (2.0, 15..=25),
            ParticleKind::Death => (3.0, 20..=40),
            ParticleKind::Debris => (2.5, 20..=35),
            ParticleKind::Sparkle => (1.5, 15..=30),
            ParticleKind::Electric => (4.0, 30..=60),
        };
        for _ in 0..count {
            let angle = self.rng.gen_range(0.0..TAU);
            let speed = self.rng.gen_range(0.5..=max_speed);
            let life = self.rng.gen_range(lifespan.clone());
            self.particles.push(Particle::new(
                origin,
                angle.cos() * speed,
                angle.sin() * speed,
                life,
                kind,
            ));
        }
    }

    /// Copies every observable field into a wire record.
    pub fn snapshot(&self) -> MazeSnapshot {
        MazeSnapshot {
            level_index: self.level_index as u32,
            width: self.grid.width() as u16,
            height: self.grid.height() as u16,
            player: self.player.as_ref().map(Player::capture),
            enemies: self.enemies.iter().map(Enemy::capture).collect(),
            collectibles: self.collectibles.iter().map(Collectible::capture).collect(),
            walls: self.walls.iter().map(Wall::capture).collect(),
            exit: self.exit,
            destroyed_walls: self
                .destroyed_walls
                .iter()
                .map(|&(row, col)| (row as u16, col as u16))
                .collect(),
            surge_started_ms: self.surge.started_ms,
            sparks: self
                .particles
                .iter()
                .filter(|p| p.kind == ParticleKind::Electric)
                .map(|p| SparkState {
                    x: p.position.x,
                    y: p.position.y,
                })
                .collect(),
        }
    }

    /// Overwrites the whole maze with `snapshot`. Nothing is merged; entities
    /// absent from the snapshot are gone afterwards.
    pub fn apply_snapshot(&mut self, snapshot: &MazeSnapshot) -> Result<(), ProtocolError> {
        Self::validate_snapshot(snapshot)?;
        let width = snapshot.width as usize;
        let height = snapshot.height as usize;

        let mut grid = TerrainGrid::new(width, height);
        let mut walls = Vec::with_capacity(snapshot.walls.len());
        for state in &snapshot.walls {
            let mut wall = Wall::solid(0, 0);
            wall.restore(state);
            let terrain = if wall.is_breakable() {
                Terrain::BreakableWall
            } else {
                Terrain::Wall
            };
            grid.set(wall.row, wall.col, terrain);
            walls.push(wall);
        }
        if let Some(exit) = snapshot.exit {
            let (row, col) = exit.center().to_grid();
            grid.set(row, col, Terrain::Exit);
        }

        self.player = match &snapshot.player {
            Some(state) => {
                let mut player = self
                    .player
                    .take()
                    .unwrap_or_else(|| Player::new(self.player_id, Position::default()));
                player.restore(state);
                Some(player)
            }
            None => None,
        };
        self.enemies = snapshot
            .enemies
            .iter()
            .map(|state| {
                let mut enemy = Enemy::new(Position::new(state.x, state.y));
                enemy.restore(state);
                enemy
            })
            .collect();
        self.collectibles = snapshot
            .collectibles
            .iter()
            .map(|state| Collectible::new(Position::new(state.x, state.y), state.kind))
            .collect();
        self.particles = snapshot
            .sparks
            .iter()
            .map(|spark| {
                Particle::new(
                    Position::new(spark.x, spark.y),
                    0.0,
                    0.0,
                    MIRRORED_SPARK_LIFESPAN,
                    ParticleKind::Electric,
                )
            })
            .collect();

        self.level_index = snapshot.level_index as usize;
        self.grid = grid;
        self.walls = walls;
        self.exit = snapshot.exit;
        self.destroyed_walls = snapshot
            .destroyed_walls
            .iter()
            .map(|&(row, col)| (row as usize, col as usize))
            .collect();
        self.surge.started_ms = snapshot.surge_started_ms;
        Ok(())
    }

    /// Rejects snapshots that cannot be applied. Nothing is mutated when
    /// this fails.
    pub fn validate_snapshot(snapshot: &MazeSnapshot) -> Result<(), ProtocolError> {
        let width = snapshot.width as usize;
        let height = snapshot.height as usize;
        match snapshot
            .walls
            .iter()
            .find(|state| state.row as usize >= height || state.col as usize >= width)
        {
            Some(state) => Err(ProtocolError::InvalidSnapshot(format!(
                "wall at ({}, {}) outside {}x{} grid",
                state.row, state.col, width, height
            ))),
            None => Ok(()),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> Option<&mut Player> {
        self.player.as_mut()
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn exit(&self) -> Option<Rect> {
        self.exit
    }

    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    pub fn destroyed_walls(&self) -> &BTreeSet<(usize, usize)> {
        &self.destroyed_walls
    }

    pub fn surge_active(&self) -> bool {
        self.surge.started_ms.is_some()
    }
}

fn overlaps_solid_wall(walls: &[Wall], bounds: &Rect) -> bool {
    walls
        .iter()
        .any(|wall| !wall.is_breakable() && wall.bounds().intersects(bounds))
}
