//! Match orchestration: mode select → login → intro → playing →
//! level complete → game over.
//!
//! A [`Session`] owns both mazes. On the host it forwards input into them,
//! ticks them and decides level advances and the end of the match. On the
//! guest it never ticks; [`Session::apply_snapshot`] overwrites it wholesale.

use crate::levels::{self, LevelError};
use crate::maze::MazeSimulation;
use crate::protocol::{GameSnapshot, InputMessage, MazeSnapshot, ProtocolError};
use crate::{PlayerId, SessionConfig, GUEST_PLAYER, HOST_PLAYER};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    ModeSelect,
    Login,
    Intro,
    Playing,
    LevelComplete,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No peer has connected yet.
    Waiting,
    Connected,
    /// The peer was connected and the link dropped.
    Lost,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    /// `None` on a tie.
    pub winner: Option<PlayerId>,
    pub scores: [u32; 2],
}

impl MatchResult {
    pub fn from_scores(host: u32, guest: u32) -> Self {
        let winner = match host.cmp(&guest) {
            std::cmp::Ordering::Greater => Some(HOST_PLAYER),
            std::cmp::Ordering::Less => Some(GUEST_PLAYER),
            std::cmp::Ordering::Equal => None,
        };
        Self {
            winner,
            scores: [host, guest],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} during {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: GamePhase,
    },
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("only the host can {0}")]
    NotHost(&'static str),
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Outcome of one [`Session::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Nothing to simulate in the current phase or role.
    Idle,
    Ticked,
    /// The peer dropped; gameplay is frozen.
    Halted,
    LevelAdvanced { level: usize },
    GameOver(MatchResult),
}

pub struct Session {
    config: SessionConfig,
    role: Option<Role>,
    phase: GamePhase,
    phase_started_ms: u64,
    level_index: usize,
    maze1: Option<MazeSimulation>,
    maze2: Option<MazeSimulation>,
    result: Option<MatchResult>,
    link: LinkState,
    local_input: InputMessage,
    seed: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            config,
            role: None,
            phase: GamePhase::ModeSelect,
            phase_started_ms: 0,
            level_index: 0,
            maze1: None,
            maze2: None,
            result: None,
            link: LinkState::Waiting,
            local_input: InputMessage::default(),
            seed,
        }
    }

    fn expect_phase(&self, expected: GamePhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn enter(&mut self, phase: GamePhase, now_ms: u64) {
        info!("Session phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phase_started_ms = now_ms;
    }

    pub fn select_mode(&mut self, role: Role) -> Result<(), SessionError> {
        self.expect_phase(GamePhase::ModeSelect, "select a mode")?;
        self.role = Some(role);
        self.enter(GamePhase::Login, self.phase_started_ms);
        Ok(())
    }

    /// Checks the static credentials and moves on to the intro.
    pub fn login(&mut self, username: &str, password: &str, now_ms: u64) -> Result<(), SessionError> {
        self.expect_phase(GamePhase::Login, "log in")?;
        if username != self.config.username || password != self.config.password {
            warn!("Rejected login for user '{}'", username);
            return Err(SessionError::InvalidCredentials);
        }
        self.enter(GamePhase::Intro, now_ms);
        Ok(())
    }

    /// Drives the timed phases: the intro and the pause after a level.
    pub fn update(&mut self, now_ms: u64) -> Result<(), SessionError> {
        let elapsed = now_ms.saturating_sub(self.phase_started_ms);
        match self.phase {
            GamePhase::Intro if elapsed >= self.config.intro_duration_ms => self.finish_intro(now_ms),
            GamePhase::LevelComplete
                if self.role == Some(Role::Host) && elapsed >= self.config.level_complete_delay_ms =>
            {
                self.enter(GamePhase::Playing, now_ms);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Ends the intro early.
    pub fn skip_intro(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.expect_phase(GamePhase::Intro, "skip the intro")?;
        self.finish_intro(now_ms)
    }

    fn finish_intro(&mut self, now_ms: u64) -> Result<(), SessionError> {
        match self.role {
            Some(Role::Host) => self.start_game(now_ms),
            _ => {
                self.enter(GamePhase::Playing, now_ms);
                Ok(())
            }
        }
    }

    /// Loads the first level into two fresh mazes.
    pub fn start_game(&mut self, now_ms: u64) -> Result<(), SessionError> {
        if self.role != Some(Role::Host) {
            return Err(SessionError::NotHost("start a game"));
        }
        if !matches!(self.phase, GamePhase::Intro | GamePhase::Playing) {
            return Err(SessionError::InvalidTransition {
                action: "start a game",
                phase: self.phase,
            });
        }

        let mut maze1 = MazeSimulation::new(HOST_PLAYER, self.config.sim.clone(), self.seed);
        let mut maze2 = MazeSimulation::new(
            GUEST_PLAYER,
            self.config.sim.clone(),
            self.seed.wrapping_add(1),
        );
        maze1.load_level(0)?;
        maze2.load_level(0)?;

        self.maze1 = Some(maze1);
        self.maze2 = Some(maze2);
        self.level_index = 0;
        self.result = None;
        self.enter(GamePhase::Playing, now_ms);
        Ok(())
    }

    /// Input from this process's own player.
    pub fn apply_local_input(&mut self, input: &InputMessage) {
        self.local_input = *input;
        if self.role == Some(Role::Host) {
            if let Some(maze) = self.maze1.as_mut() {
                maze.apply_input(input);
            }
        }
    }

    /// Input received from the peer; only meaningful on the host.
    pub fn apply_remote_input(&mut self, input: &InputMessage) {
        if self.role == Some(Role::Host) {
            if let Some(maze) = self.maze2.as_mut() {
                maze.apply_input(input);
            }
        }
    }

    /// Advances both mazes one step and applies the round-loss and
    /// level-advance checks on the same tick.
    pub fn tick(&mut self, now_ms: u64) -> Result<SessionUpdate, SessionError> {
        if self.role != Some(Role::Host) || self.phase != GamePhase::Playing {
            return Ok(SessionUpdate::Idle);
        }
        if self.link == LinkState::Lost {
            return Ok(SessionUpdate::Halted);
        }
        let (Some(maze1), Some(maze2)) = (self.maze1.as_mut(), self.maze2.as_mut()) else {
            return Ok(SessionUpdate::Idle);
        };

        let report1 = maze1.tick(now_ms);
        let report2 = maze2.tick(now_ms);

        if report1.player_defeated || report2.player_defeated {
            return Ok(SessionUpdate::GameOver(self.finish_match(now_ms)));
        }
        if report1.reached_exit || report2.reached_exit {
            return self.advance_level(now_ms);
        }
        Ok(SessionUpdate::Ticked)
    }

    fn advance_level(&mut self, now_ms: u64) -> Result<SessionUpdate, SessionError> {
        let next = self.level_index + 1;
        if next >= levels::level_count() {
            return Ok(SessionUpdate::GameOver(self.finish_match(now_ms)));
        }

        for maze in [self.maze1.as_mut(), self.maze2.as_mut()].into_iter().flatten() {
            maze.load_level(next)?;
        }
        self.level_index = next;
        info!("Advancing to level {}", next + 1);
        self.enter(GamePhase::LevelComplete, now_ms);
        Ok(SessionUpdate::LevelAdvanced { level: next })
    }

    fn finish_match(&mut self, now_ms: u64) -> MatchResult {
        let result = MatchResult::from_scores(self.score_of(HOST_PLAYER), self.score_of(GUEST_PLAYER));
        match result.winner {
            Some(winner) => info!(
                "Game over: player {} wins {} to {}",
                winner, result.scores[0], result.scores[1]
            ),
            None => info!("Game over: tie at {}", result.scores[0]),
        }
        self.result = Some(result);
        self.enter(GamePhase::GameOver, now_ms);
        result
    }

    fn score_of(&self, id: PlayerId) -> u32 {
        self.maze(id)
            .and_then(|maze| maze.player())
            .map_or(0, |player| player.score)
    }

    /// Leaves a running game for the mode-select screen.
    pub fn abort(&mut self) -> Result<(), SessionError> {
        self.expect_phase(GamePhase::Playing, "abort")?;
        self.reset();
        Ok(())
    }

    pub fn return_to_menu(&mut self) -> Result<(), SessionError> {
        self.expect_phase(GamePhase::GameOver, "return to the menu")?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.role = None;
        self.maze1 = None;
        self.maze2 = None;
        self.result = None;
        self.level_index = 0;
        self.link = LinkState::Waiting;
        self.local_input = InputMessage::default();
        self.enter(GamePhase::ModeSelect, self.phase_started_ms);
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            level_index: self.level_index as u32,
            maze1: self.maze1.as_ref().map(MazeSimulation::snapshot),
            maze2: self.maze2.as_ref().map(MazeSimulation::snapshot),
            result: self.result,
        }
    }

    /// Overwrites the guest's copy of the match with the host's state. Ignored
    /// on the host, and until both sides are past the login flow.
    pub fn apply_snapshot(&mut self, snapshot: &GameSnapshot) -> Result<(), ProtocolError> {
        let pregame = |phase: GamePhase| {
            matches!(
                phase,
                GamePhase::ModeSelect | GamePhase::Login | GamePhase::Intro
            )
        };
        if self.role != Some(Role::Guest) || pregame(self.phase) || pregame(snapshot.phase) {
            return Ok(());
        }

        // Both mazes are checked up front so a bad one leaves the session untouched.
        for state in snapshot.maze1.iter().chain(snapshot.maze2.iter()) {
            MazeSimulation::validate_snapshot(state)?;
        }
        let existing = self.maze1.take();
        self.maze1 = self.mirror_maze(existing, HOST_PLAYER, snapshot.maze1.as_ref())?;
        let existing = self.maze2.take();
        self.maze2 = self.mirror_maze(existing, GUEST_PLAYER, snapshot.maze2.as_ref())?;
        self.level_index = snapshot.level_index as usize;
        self.result = snapshot.result;
        if self.phase != snapshot.phase {
            self.enter(snapshot.phase, self.phase_started_ms);
        }
        Ok(())
    }

    fn mirror_maze(
        &self,
        existing: Option<MazeSimulation>,
        id: PlayerId,
        state: Option<&MazeSnapshot>,
    ) -> Result<Option<MazeSimulation>, ProtocolError> {
        let Some(state) = state else {
            return Ok(None);
        };
        let mut maze = existing
            .unwrap_or_else(|| MazeSimulation::new(id, self.config.sim.clone(), self.seed));
        maze.apply_snapshot(state)?;
        Ok(Some(maze))
    }

    pub fn set_link(&mut self, link: LinkState) {
        if self.link != link {
            info!("Link {:?} -> {:?}", self.link, link);
        }
        self.link = link;
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Milliseconds spent in the current phase.
    pub fn phase_elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.phase_started_ms)
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn maze(&self, id: PlayerId) -> Option<&MazeSimulation> {
        match id {
            HOST_PLAYER => self.maze1.as_ref(),
            GUEST_PLAYER => self.maze2.as_ref(),
            _ => None,
        }
    }

    /// The maze of the player sitting at this process.
    pub fn own_maze(&self) -> Option<&MazeSimulation> {
        match self.role? {
            Role::Host => self.maze1.as_ref(),
            Role::Guest => self.maze2.as_ref(),
        }
    }

    /// The maze of the player on the other end of the link.
    pub fn peer_maze(&self) -> Option<&MazeSimulation> {
        match self.role? {
            Role::Host => self.maze2.as_ref(),
            Role::Guest => self.maze1.as_ref(),
        }
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn local_input(&self) -> InputMessage {
        self.local_input
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
