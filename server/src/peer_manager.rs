//! Peer admission and bookkeeping for the hosting side
//!
//! A match has exactly two players, so the host admits a single remote peer at
//! a time. Connections arriving while the slot is taken are refused by the
//! listener before any frame is exchanged.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// A connected remote player
#[derive(Debug)]
pub struct Peer {
    /// Identifier assigned by the host, unique for the host's lifetime
    pub id: u32,
    /// Remote address of the TCP connection
    pub addr: SocketAddr,
    pub connected_at: Instant,
    pub inputs_received: u64,
}

impl Peer {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            inputs_received: 0,
        }
    }
}

/// Tracks admitted peers and enforces the host's capacity
pub struct PeerManager {
    peers: HashMap<u32, Peer>,
    next_peer_id: u32,
    max_peers: usize,
}

impl PeerManager {
    /// Creates an empty roster; peer IDs start from 1
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: HashMap::new(),
            next_peer_id: 1,
            max_peers,
        }
    }

    /// Attempts to admit a new connection
    ///
    /// Returns `Some(peer_id)` on success, `None` if every slot is taken.
    pub fn add_peer(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.peers.len() >= self.max_peers {
            return None;
        }

        let peer_id = self.next_peer_id;
        self.next_peer_id += 1;

        info!("Peer {} connected from {}", peer_id, addr);
        self.peers.insert(peer_id, Peer::new(peer_id, addr));

        Some(peer_id)
    }

    /// Releases a peer's slot. Returns false if the peer was already gone.
    pub fn remove_peer(&mut self, peer_id: &u32) -> bool {
        if let Some(peer) = self.peers.remove(peer_id) {
            info!(
                "Peer {} disconnected after {:.1}s ({} inputs)",
                peer.id,
                peer.connected_at.elapsed().as_secs_f32(),
                peer.inputs_received
            );
            true
        } else {
            false
        }
    }

    /// Counts one delivered input. Returns false if the peer ID is unknown.
    pub fn record_input(&mut self, peer_id: u32) -> bool {
        if let Some(peer) = self.peers.get_mut(&peer_id) {
            peer.inputs_received += 1;
            true
        } else {
            false
        }
    }
}
