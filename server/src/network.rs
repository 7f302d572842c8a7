//! Host network layer: TCP listener, per-peer exchange loop and the channels
//! connecting them to the game loop
//!
//! Networking tasks never touch the live session. The game loop publishes
//! each new [`GameSnapshot`] into a `watch` channel (latest wins) and the
//! connection task forwards every received [`InputMessage`] back as a
//! [`NetworkEvent`].

use crate::peer_manager::PeerManager;
use log::{debug, error, info, warn};
use shared::protocol::{read_frame, write_frame, FullStateReplication, ReplicationTransport};
use shared::{GameSnapshot, InputMessage, ProtocolError};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock};

/// Latest snapshot published by the game loop, `None` until the first one.
pub type SnapshotFeed = watch::Receiver<Option<Arc<GameSnapshot>>>;

/// Messages sent from network tasks to the game loop
#[derive(Debug)]
pub enum NetworkEvent {
    PeerConnected { peer_id: u32, addr: SocketAddr },
    PeerInput { peer_id: u32, input: InputMessage },
    PeerDisconnected { peer_id: u32, reason: String },
}

/// Listening side of the authoritative host
pub struct HostServer {
    listener: TcpListener,
    peers: Arc<RwLock<PeerManager>>,
    cadence: Duration,
}

impl HostServer {
    pub async fn bind(addr: &str, max_peers: usize, cadence: Duration) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Host listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            peers: Arc::new(RwLock::new(PeerManager::new(max_peers))),
            cadence,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the shutdown signal flips or its sender is
    /// dropped. Each admitted peer gets its own exchange task.
    pub async fn run(
        self,
        events: mpsc::UnboundedSender<NetworkEvent>,
        snapshots: SnapshotFeed,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &events, &snapshots, &shutdown).await,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                _ = shutdown.changed() => {
                    info!("Listener shutting down");
                    break;
                }
            }
        }
    }

    async fn admit(
        &self,
        mut stream: TcpStream,
        addr: SocketAddr,
        events: &mpsc::UnboundedSender<NetworkEvent>,
        snapshots: &SnapshotFeed,
        shutdown: &watch::Receiver<bool>,
    ) {
        let peer_id = {
            let mut peers = self.peers.write().await;
            peers.add_peer(addr)
        };

        let Some(peer_id) = peer_id else {
            warn!("Refusing connection from {}: a peer is already connected", addr);
            let _ = stream.shutdown().await;
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }
        if events
            .send(NetworkEvent::PeerConnected { peer_id, addr })
            .is_err()
        {
            error!("Game loop is gone, dropping peer {}", peer_id);
            self.peers.write().await.remove_peer(&peer_id);
            return;
        }

        let connection = PeerConnection {
            peer_id,
            stream,
            transport: FullStateReplication,
            events: events.clone(),
            snapshots: snapshots.clone(),
            shutdown: shutdown.clone(),
            peers: Arc::clone(&self.peers),
            cadence: self.cadence,
        };
        tokio::spawn(connection.run());
    }
}

/// One admitted peer: sends a snapshot, waits for one input, sleeps, repeats
struct PeerConnection<T: ReplicationTransport> {
    peer_id: u32,
    stream: TcpStream,
    transport: T,
    events: mpsc::UnboundedSender<NetworkEvent>,
    snapshots: SnapshotFeed,
    shutdown: watch::Receiver<bool>,
    peers: Arc<RwLock<PeerManager>>,
    cadence: Duration,
}

impl<T: ReplicationTransport> PeerConnection<T> {
    async fn run(mut self) {
        let reason = loop {
            let outcome = tokio::select! {
                result = exchange(&mut self.stream, &mut self.transport, &mut self.snapshots) => result,
                _ = self.shutdown.changed() => break "host shutting down".to_string(),
            };

            match outcome {
                Ok(input) => {
                    self.peers.write().await.record_input(self.peer_id);
                    let event = NetworkEvent::PeerInput {
                        peer_id: self.peer_id,
                        input,
                    };
                    if self.events.send(event).is_err() {
                        break "game loop stopped".to_string();
                    }
                }
                Err(ProtocolError::Closed) => break "peer closed the connection".to_string(),
                Err(e) => {
                    error!("Peer {} exchange failed: {}", self.peer_id, e);
                    break e.to_string();
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.cadence) => {}
                _ = self.shutdown.changed() => break "host shutting down".to_string(),
            }
        };

        // Unblocks the peer's pending read instead of leaving it to notice EOF later.
        let _ = self.stream.shutdown().await;
        self.peers.write().await.remove_peer(&self.peer_id);
        info!("Peer {} link closed: {}", self.peer_id, reason);
        let _ = self.events.send(NetworkEvent::PeerDisconnected {
            peer_id: self.peer_id,
            reason,
        });
    }
}

/// One iteration of the host side of the cadence: push the latest snapshot,
/// then block for the peer's input.
pub async fn exchange<S, T>(
    stream: &mut S,
    transport: &mut T,
    snapshots: &mut SnapshotFeed,
) -> Result<InputMessage, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: ReplicationTransport,
{
    let snapshot = latest_snapshot(snapshots).await?;
    let payload = transport.encode_snapshot(&snapshot)?;
    write_frame(stream, &payload).await?;

    let frame = read_frame(stream).await?;
    transport.decode_input(&frame)
}

async fn latest_snapshot(snapshots: &mut SnapshotFeed) -> Result<Arc<GameSnapshot>, ProtocolError> {
    loop {
        let current = snapshots.borrow().clone();
        if let Some(snapshot) = current {
            return Ok(snapshot);
        }
        snapshots
            .changed()
            .await
            .map_err(|_| ProtocolError::Closed)?;
    }
}
