//! Frontend state: the guest-side mirror and the stage machine that moves
//! between the menu, hosting and joining.

use crate::input::{FrameInput, LoginForm};
use crate::network::{MirrorEvent, MirrorLink};
use log::{error, info, warn};
use server::game::HostGame;
use shared::{GamePhase, InputMessage, LinkState, Role, Session, SessionConfig, SessionError, SessionUpdate};
use std::time::Duration;
use tokio::runtime::Handle;

/// Guest-side session fed by snapshots from the host
///
/// The live [`Session`] is only ever touched from the frontend thread; the
/// communication task hands over decoded snapshots through a channel.
pub struct MirrorGame {
    session: Session,
    link: Option<MirrorLink>,
    snapshots_applied: u64,
}

impl MirrorGame {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            link: None,
            snapshots_applied: 0,
        }
    }

    pub fn attach(&mut self, link: MirrorLink) {
        self.session.set_link(LinkState::Waiting);
        self.link = Some(link);
    }

    /// Applies every pending event from the communication task. A snapshot
    /// that cannot be applied ends the link like a transport error would.
    pub fn poll(&mut self, now_ms: u64) -> Result<(), SessionError> {
        self.session.update(now_ms)?;

        while let Some(event) = self.link.as_mut().and_then(MirrorLink::try_next_event) {
            match event {
                MirrorEvent::Connected => self.session.set_link(LinkState::Connected),
                MirrorEvent::Snapshot(snapshot) => {
                    if let Err(e) = self.session.apply_snapshot(&snapshot) {
                        warn!("Discarding host link after bad snapshot: {}", e);
                        self.drop_link();
                        break;
                    }
                    self.snapshots_applied += 1;
                }
                MirrorEvent::Disconnected { reason } => {
                    warn!("Lost host: {}", reason);
                    self.link = None;
                    self.session.set_link(LinkState::Lost);
                }
            }
        }
        Ok(())
    }

    /// Records the local player's keys and queues them for the host.
    pub fn send_input(&mut self, input: &InputMessage) {
        self.session.apply_local_input(input);
        if let Some(link) = &self.link {
            link.send_input(*input);
        }
    }

    fn drop_link(&mut self) {
        if let Some(link) = self.link.take() {
            link.stop();
        }
        self.session.set_link(LinkState::Lost);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }
}

/// Where the frontend currently is
pub enum Stage {
    /// Mode select and login, nothing on the network yet
    Menu(Session),
    /// Authoritative side with an embedded listener
    Hosting(HostGame),
    /// Mirror of a remote host
    Joined(MirrorGame),
}

impl Stage {
    pub fn session(&self) -> &Session {
        match self {
            Stage::Menu(session) => session,
            Stage::Hosting(game) => game.session(),
            Stage::Joined(mirror) => mirror.session(),
        }
    }

    fn session_mut(&mut self) -> &mut Session {
        match self {
            Stage::Menu(session) => session,
            Stage::Hosting(game) => game.session_mut(),
            Stage::Joined(mirror) => mirror.session_mut(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub session: SessionConfig,
    /// Address the host binds to and the guest connects to
    pub address: String,
}

/// Drives the stage machine from sampled keyboard input
pub struct Frontend {
    stage: Stage,
    config: FrontendConfig,
    runtime: Handle,
    login: LoginForm,
    status: Option<String>,
}

impl Frontend {
    pub fn new(config: FrontendConfig, runtime: Handle) -> Self {
        Self {
            stage: Stage::Menu(Session::new(config.session.clone())),
            config,
            runtime,
            login: LoginForm::default(),
            status: None,
        }
    }

    /// Picks a role without going through the mode-select screen.
    pub fn preselect(&mut self, role: Role) {
        if let Stage::Menu(session) = &mut self.stage {
            if let Err(e) = session.select_mode(role) {
                warn!("Cannot preselect {:?}: {}", role, e);
            }
        }
    }

    /// Runs one frame. Must be called from outside the tokio runtime.
    pub fn update(&mut self, frame: &FrameInput, now_ms: u64) {
        let result = match self.stage.session().phase() {
            GamePhase::ModeSelect => {
                self.update_mode_select(frame);
                Ok(())
            }
            GamePhase::Login => {
                self.update_login(frame, now_ms);
                Ok(())
            }
            _ if frame.back && self.link() == LinkState::Lost => {
                self.leave();
                Ok(())
            }
            GamePhase::Intro if frame.confirm || frame.back => {
                self.stage.session_mut().skip_intro(now_ms)
            }
            GamePhase::Playing if frame.back => {
                self.leave();
                Ok(())
            }
            GamePhase::GameOver if frame.confirm || frame.back => {
                self.leave();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!("{}", e);
        }

        if let Err(e) = self.advance(&frame.movement, now_ms) {
            error!("Session error: {}", e);
            self.status = Some(e.to_string());
            self.leave();
        }
    }

    fn advance(&mut self, movement: &InputMessage, now_ms: u64) -> Result<(), SessionError> {
        match &mut self.stage {
            Stage::Menu(_) => Ok(()),
            Stage::Hosting(game) => match game.step(now_ms, movement)? {
                SessionUpdate::LevelAdvanced { level } => {
                    info!("Level {} reached", level + 1);
                    Ok(())
                }
                SessionUpdate::GameOver(result) => {
                    info!("Match over: {:?}", result);
                    Ok(())
                }
                _ => Ok(()),
            },
            Stage::Joined(mirror) => {
                mirror.poll(now_ms)?;
                mirror.send_input(movement);
                Ok(())
            }
        }
    }

    fn update_mode_select(&mut self, frame: &FrameInput) {
        let role = if frame.choose_host {
            Role::Host
        } else if frame.choose_join {
            Role::Guest
        } else {
            return;
        };
        if let Stage::Menu(session) = &mut self.stage {
            if session.select_mode(role).is_ok() {
                self.status = None;
                self.login.clear();
            }
        }
    }

    fn update_login(&mut self, frame: &FrameInput, now_ms: u64) {
        if frame.back {
            self.reset_menu();
            return;
        }
        if !self.login.handle(frame) {
            return;
        }

        let Stage::Menu(session) = &mut self.stage else {
            return;
        };
        match session.login(self.login.username(), self.login.password(), now_ms) {
            Ok(()) => self.go_online(),
            Err(e) => self.login.reject(e.to_string()),
        }
    }

    /// Moves a freshly logged-in session onto the network.
    fn go_online(&mut self) {
        let placeholder = Stage::Menu(Session::new(self.config.session.clone()));
        let Stage::Menu(session) = std::mem::replace(&mut self.stage, placeholder) else {
            return;
        };

        match session.role() {
            Some(Role::Host) => {
                match self.runtime.block_on(HostGame::start(&self.config.address, session)) {
                    Ok(game) => {
                        self.status = Some(format!("Hosting on {}", game.local_addr()));
                        self.stage = Stage::Hosting(game);
                    }
                    Err(e) => {
                        error!("Could not host on {}: {}", self.config.address, e);
                        self.status = Some(format!("Could not host: {}", e));
                    }
                }
            }
            Some(Role::Guest) => {
                let cadence = Duration::from_millis(self.config.session.cadence_ms);
                let link = MirrorLink::connect(&self.runtime, self.config.address.clone(), cadence);
                let mut mirror = MirrorGame::new(session);
                mirror.attach(link);
                self.status = Some(format!("Joining {}", self.config.address));
                self.stage = Stage::Joined(mirror);
            }
            None => {}
        }
    }

    /// Ends the current match and goes back to mode select.
    pub fn leave(&mut self) {
        let session = self.stage.session_mut();
        let left = match session.phase() {
            GamePhase::Playing => session.abort(),
            GamePhase::GameOver => session.return_to_menu(),
            _ => Ok(()),
        };
        if let Err(e) = left {
            warn!("{}", e);
        }

        match &self.stage {
            Stage::Hosting(game) => game.stop(),
            Stage::Joined(mirror) if mirror.session().link() == LinkState::Lost => {
                self.status = Some("Connection to host lost".to_string());
            }
            _ => {}
        }
        self.reset_menu();
    }

    fn reset_menu(&mut self) {
        self.login.clear();
        self.stage = Stage::Menu(Session::new(self.config.session.clone()));
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn session(&self) -> &Session {
        self.stage.session()
    }

    pub fn login(&self) -> &LoginForm {
        &self.login
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Peer link state; the menu counts as waiting.
    pub fn link(&self) -> LinkState {
        self.stage.session().link()
    }
}

impl Drop for Frontend {
    fn drop(&mut self) {
        if let Stage::Hosting(game) = &self.stage {
            game.stop();
        }
    }
}
