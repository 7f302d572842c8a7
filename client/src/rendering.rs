use crate::game::{Frontend, Stage};
use crate::input::{LoginField, LoginForm};
use macroquad::prelude::*;
use shared::entity::{ParticleKind, Positioned};
use shared::{
    CollectibleKind, EnemyBehavior, GamePhase, LinkState, MatchResult, MazeSimulation, Role,
    Session, PLAYER_MAX_HEALTH, TILE_SIZE, WALL_MAX_HEALTH,
};

const BACKGROUND: Color = Color::new(0.10, 0.10, 0.10, 1.0);
const FLOOR: Color = Color::new(0.16, 0.16, 0.18, 1.0);
const SOLID_WALL: Color = Color::new(0.40, 0.40, 0.45, 1.0);
const BREAKABLE_WALL: Color = Color::new(0.55, 0.35, 0.20, 1.0);
const EXIT: Color = Color::new(0.20, 0.60, 0.90, 1.0);
const LOCAL_PLAYER: Color = Color::new(0.20, 0.85, 0.30, 1.0);
const REMOTE_PLAYER: Color = Color::new(1.00, 0.27, 0.27, 1.0);

const INFO_BAR_HEIGHT: f32 = 28.0;
const MARGIN: f32 = 12.0;

/// Where a maze is drawn and how much it is scaled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MazeViewport {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl MazeViewport {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.y + y * self.scale)
    }

    fn rect(&self, bounds: shared::Rect) -> (f32, f32, f32, f32) {
        let (x, y) = self.map(bounds.x, bounds.y);
        (x, y, bounds.width * self.scale, bounds.height * self.scale)
    }
}

/// Places two mazes of `maze_width` x `maze_height` pixels side by side in the
/// window, leaving room for an info bar above each, and scales them to fit.
pub fn side_by_side(width: f32, height: f32, maze_width: f32, maze_height: f32) -> [MazeViewport; 2] {
    let slot_width = (width - MARGIN * 3.0) / 2.0;
    let slot_height = height - MARGIN * 2.0 - INFO_BAR_HEIGHT;
    let scale = (slot_width / maze_width)
        .min(slot_height / maze_height)
        .max(0.05);

    let drawn_width = maze_width * scale;
    let y = MARGIN + INFO_BAR_HEIGHT;
    let left = MARGIN + (slot_width - drawn_width) / 2.0;
    let right = MARGIN * 2.0 + slot_width + (slot_width - drawn_width) / 2.0;

    [
        MazeViewport { x: left, y, scale },
        MazeViewport { x: right, y, scale },
    ]
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&mut self, frontend: &Frontend, now_ms: u64) {
        clear_background(BACKGROUND);

        let session = frontend.session();
        match session.phase() {
            GamePhase::ModeSelect => self.draw_mode_select(),
            GamePhase::Login => self.draw_login(frontend.login(), session.role()),
            GamePhase::Intro => self.draw_intro(session, now_ms),
            GamePhase::Playing | GamePhase::LevelComplete | GamePhase::GameOver => {
                self.draw_match(session);
                match session.phase() {
                    GamePhase::LevelComplete => self.draw_banner(
                        &format!("Level {} complete!", session.level_index()),
                        "Next maze loading...",
                    ),
                    GamePhase::GameOver => self.draw_game_over(session),
                    _ => {}
                }
            }
        }

        self.draw_link_state(frontend);
        if let Some(status) = frontend.status() {
            draw_text(status, MARGIN, screen_height() - 8.0, 18.0, GRAY);
        }
    }

    fn draw_mode_select(&mut self) {
        self.draw_centered("MAZE DUEL", screen_height() * 0.3, 64.0, WHITE);
        self.draw_centered("[1] Host a match", screen_height() * 0.5, 28.0, LOCAL_PLAYER);
        self.draw_centered("[2] Join a match", screen_height() * 0.5 + 40.0, 28.0, REMOTE_PLAYER);
    }

    fn draw_login(&mut self, form: &LoginForm, role: Option<Role>) {
        let title = match role {
            Some(Role::Host) => "Log in to host",
            _ => "Log in to join",
        };
        self.draw_centered(title, screen_height() * 0.3, 36.0, WHITE);

        let x = screen_width() / 2.0 - 150.0;
        let mut y = screen_height() * 0.42;
        let masked = form.masked_password();
        for (label, value, field) in [
            ("Username", form.username(), LoginField::Username),
            ("Password", masked.as_str(), LoginField::Password),
        ] {
            let focused = form.focus() == field;
            draw_text(label, x, y, 20.0, GRAY);
            draw_rectangle_lines(x, y + 6.0, 300.0, 32.0, 2.0, if focused { WHITE } else { GRAY });
            let cursor = if focused { "_" } else { "" };
            draw_text(&format!("{}{}", value, cursor), x + 8.0, y + 30.0, 24.0, WHITE);
            y += 70.0;
        }

        if let Some(error) = form.error() {
            self.draw_centered(error, y + 10.0, 20.0, RED);
        }
        self.draw_centered("Tab switches field, Enter submits, Esc goes back", y + 40.0, 18.0, GRAY);
    }

    fn draw_intro(&mut self, session: &Session, now_ms: u64) {
        let remaining = session
            .config()
            .intro_duration_ms
            .saturating_sub(session.phase_elapsed(now_ms));
        self.draw_centered("Reach the exit first, or outscore your rival", screen_height() * 0.35, 28.0, WHITE);
        self.draw_centered(
            "Arrows/WASD move, Space attacks, Esc leaves",
            screen_height() * 0.45,
            22.0,
            GRAY,
        );
        self.draw_centered(
            &format!("Starting in {:.1}s (Enter to skip)", remaining as f32 / 1000.0),
            screen_height() * 0.6,
            24.0,
            YELLOW,
        );
    }

    fn draw_match(&mut self, session: &Session) {
        let (Some(own), Some(peer)) = (session.own_maze(), session.peer_maze()) else {
            self.draw_centered("Waiting for the first maze...", screen_height() / 2.0, 24.0, GRAY);
            return;
        };

        let grid = own.grid();
        let [left, right] = side_by_side(
            screen_width(),
            screen_height(),
            grid.width() as f32 * TILE_SIZE,
            grid.height() as f32 * TILE_SIZE,
        );

        self.draw_info_bar(own, left, "You", LOCAL_PLAYER);
        self.draw_maze(own, left, LOCAL_PLAYER);
        self.draw_info_bar(peer, right, "Rival", REMOTE_PLAYER);
        self.draw_maze(peer, right, REMOTE_PLAYER);
    }

    fn draw_info_bar(&mut self, maze: &MazeSimulation, view: MazeViewport, label: &str, color: Color) {
        let Some(player) = maze.player() else {
            return;
        };
        let y = view.y - 8.0;
        draw_text(
            &format!(
                "{} (P{})  HP {}/{}  Score {}  Keys {}  Level {}",
                label,
                player.id,
                player.health,
                player.max_health,
                player.score,
                player.keys,
                maze.level_index() + 1
            ),
            view.x,
            y,
            20.0,
            color,
        );
    }

    fn draw_maze(&mut self, maze: &MazeSimulation, view: MazeViewport, player_color: Color) {
        let grid = maze.grid();
        let (x, y, w, h) = view.rect(grid.bounds());
        draw_rectangle(x, y, w, h, FLOOR);

        if let Some(exit) = maze.exit() {
            let (x, y, w, h) = view.rect(exit);
            draw_rectangle(x, y, w, h, EXIT);
        }

        for wall in maze.walls() {
            let (x, y, w, h) = view.rect(wall.bounds());
            match wall.health {
                Some(health) => {
                    let mut color = BREAKABLE_WALL;
                    color.a = 0.4 + 0.6 * health as f32 / WALL_MAX_HEALTH as f32;
                    draw_rectangle(x, y, w, h, color);
                    draw_rectangle_lines(x, y, w, h, 1.0, BLACK);
                }
                None => draw_rectangle(x, y, w, h, SOLID_WALL),
            }
        }

        for collectible in maze.collectibles() {
            let center = collectible.position;
            let (cx, cy) = view.map(center.x, center.y);
            let color = match collectible.kind {
                CollectibleKind::Gold => GOLD,
                CollectibleKind::HealthPotion => PINK,
                CollectibleKind::Key => SKYBLUE,
            };
            draw_circle(cx, cy, collectible.size().0 * view.scale / 2.0, color);
        }

        for enemy in maze.enemies() {
            let color = match enemy.behavior {
                EnemyBehavior::Patrol => ORANGE,
                EnemyBehavior::Chase => RED,
            };
            let (x, y, w, h) = view.rect(enemy.bounds());
            draw_rectangle(x, y, w, h, color);
            self.draw_health_bar(x, y - 5.0, w, enemy.health, enemy.max_health);
        }

        if let Some(player) = maze.player() {
            let (x, y, w, h) = view.rect(player.bounds());
            draw_rectangle(x, y, w, h, player_color);
            draw_rectangle_lines(x, y, w, h, 2.0, WHITE);
            self.draw_facing(x + w / 2.0, y + h / 2.0, w / 2.0, player.facing);
            self.draw_health_bar(x, y - 5.0, w, player.health, PLAYER_MAX_HEALTH);
        }

        for particle in maze.particles() {
            let color = match particle.kind {
                ParticleKind::Hit => YELLOW,
                ParticleKind::Death => RED,
                ParticleKind::Debris => BROWN,
                ParticleKind::Sparkle => GOLD,
                ParticleKind::Electric => Color::new(0.5, 0.8, 1.0, 1.0),
            };
            let faded = Color::new(color.r, color.g, color.b, particle.life_fraction());
            let (px, py) = view.map(particle.position.x, particle.position.y);
            draw_rectangle(px, py, 3.0, 3.0, faded);
        }
    }

    fn draw_facing(&mut self, cx: f32, cy: f32, reach: f32, facing: shared::Direction) {
        let (dx, dy) = match facing {
            shared::Direction::Up => (0.0, -reach),
            shared::Direction::Down => (0.0, reach),
            shared::Direction::Left => (-reach, 0.0),
            shared::Direction::Right => (reach, 0.0),
        };
        draw_line(cx, cy, cx + dx, cy + dy, 2.0, WHITE);
    }

    fn draw_health_bar(&mut self, x: f32, y: f32, width: f32, health: i32, max_health: i32) {
        let fraction = if max_health > 0 {
            (health as f32 / max_health as f32).clamp(0.0, 1.0)
        } else {
            0.0
        };
        draw_rectangle(x, y, width, 3.0, Color::from_rgba(60, 0, 0, 255));
        draw_rectangle(x, y, width * fraction, 3.0, GREEN);
    }

    fn draw_game_over(&mut self, session: &Session) {
        let Some(result) = session.result() else {
            return;
        };
        self.draw_banner(&outcome_text(&result, session.role()), "Enter to return to the menu");
    }

    fn draw_link_state(&mut self, frontend: &Frontend) {
        let message = match (frontend.stage(), frontend.link()) {
            (Stage::Hosting(_), LinkState::Waiting) => "Waiting for an opponent to join...",
            (Stage::Joined(_), LinkState::Waiting) => "Connecting to host...",
            (Stage::Menu(_), _) => return,
            (_, LinkState::Lost) => "Connection lost - press Esc for the menu",
            (_, LinkState::Connected) => return,
        };
        let width = screen_width();
        draw_rectangle(0.0, 0.0, width, 24.0, Color::new(0.0, 0.0, 0.0, 0.7));
        self.draw_centered(message, 18.0, 20.0, YELLOW);
    }

    fn draw_banner(&mut self, title: &str, subtitle: &str) {
        let y = screen_height() / 2.0;
        draw_rectangle(0.0, y - 50.0, screen_width(), 90.0, Color::new(0.0, 0.0, 0.0, 0.75));
        self.draw_centered(title, y, 40.0, WHITE);
        self.draw_centered(subtitle, y + 30.0, 20.0, GRAY);
    }

    fn draw_centered(&mut self, text: &str, y: f32, font_size: f32, color: Color) {
        let dims = measure_text(text, None, font_size as u16, 1.0);
        draw_text(text, (screen_width() - dims.width) / 2.0, y, font_size, color);
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Headline for the game-over banner from this player's point of view.
pub fn outcome_text(result: &MatchResult, role: Option<Role>) -> String {
    let own = match role {
        Some(Role::Guest) => shared::GUEST_PLAYER,
        _ => shared::HOST_PLAYER,
    };
    let [host, guest] = result.scores;
    match result.winner {
        None => format!("Tie! {} - {}", host, guest),
        Some(winner) if winner == own => format!("You win! {} - {}", host, guest),
        Some(_) => format!("You lose. {} - {}", host, guest),
    }
}
