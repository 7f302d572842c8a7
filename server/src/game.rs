//! Authoritative host loop glue
//!
//! [`HostGame`] owns the host's [`Session`], starts the listener and turns
//! network events into session calls. One call to [`HostGame::step`] is one
//! frame of the host: drain the network, advance timers, feed the local
//! player's input, tick, publish the resulting snapshot.

use crate::network::{HostServer, NetworkEvent};
use log::{debug, info, warn};
use shared::{GameSnapshot, InputMessage, LinkState, Session, SessionError, SessionUpdate};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// The two-player host admits exactly one guest.
const MAX_PEERS: usize = 1;

pub struct HostGame {
    session: Session,
    events: mpsc::UnboundedReceiver<NetworkEvent>,
    snapshots: watch::Sender<Option<Arc<GameSnapshot>>>,
    shutdown: watch::Sender<bool>,
    local_addr: SocketAddr,
    peer: Option<u32>,
}

impl HostGame {
    /// Binds the listener and spawns its accept loop on the current runtime.
    ///
    /// The session should already be in the host role; nothing is ticked until
    /// [`HostGame::step`] is called.
    pub async fn start(addr: &str, session: Session) -> io::Result<Self> {
        let cadence = Duration::from_millis(session.config().cadence_ms);
        let server = HostServer::bind(addr, MAX_PEERS, cadence).await?;
        let local_addr = server.local_addr()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(Some(Arc::new(session.snapshot())));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(server.run(events_tx, snapshots_rx, shutdown_rx));

        Ok(Self {
            session,
            events: events_rx,
            snapshots: snapshots_tx,
            shutdown: shutdown_tx,
            local_addr,
            peer: None,
        })
    }

    /// Applies every pending network event without blocking.
    pub fn poll_network(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                NetworkEvent::PeerConnected { peer_id, addr } => {
                    info!("Guest {} joined from {}", peer_id, addr);
                    self.peer = Some(peer_id);
                    self.session.set_link(LinkState::Connected);
                }
                NetworkEvent::PeerInput { peer_id, input } => {
                    if self.peer == Some(peer_id) {
                        self.session.apply_remote_input(&input);
                    } else {
                        debug!("Dropping input from stale peer {}", peer_id);
                    }
                }
                NetworkEvent::PeerDisconnected { peer_id, reason } => {
                    if self.peer == Some(peer_id) {
                        warn!("Guest {} lost: {}", peer_id, reason);
                        self.peer = None;
                        self.session.set_link(LinkState::Lost);
                    }
                }
            }
        }
    }

    /// Runs one host frame and publishes the resulting state.
    ///
    /// Until a guest has connected the timers still run but the mazes are not
    /// ticked. After the guest drops, the session reports
    /// [`SessionUpdate::Halted`].
    pub fn step(&mut self, now_ms: u64, local: &InputMessage) -> Result<SessionUpdate, SessionError> {
        self.poll_network();
        self.session.update(now_ms)?;
        self.session.apply_local_input(local);
        let update = match self.session.link() {
            LinkState::Waiting => SessionUpdate::Idle,
            LinkState::Connected | LinkState::Lost => self.session.tick(now_ms)?,
        };
        self.publish();
        Ok(update)
    }

    /// Makes the current session state the one the guest receives next.
    pub fn publish(&self) {
        let _ = self
            .snapshots
            .send(Some(Arc::new(self.session.snapshot())));
    }

    /// Signals the listener and any peer task to close.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_connected(&self) -> bool {
        self.peer.is_some()
    }
}

impl Drop for HostGame {
    fn drop(&mut self) {
        self.stop();
    }
}
