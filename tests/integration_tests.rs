//! Integration tests for the host, the mirror and the wire protocol
//!
//! These tests validate cross-crate interactions over real loopback sockets.

use assert_approx_eq::assert_approx_eq;
use client::game::MirrorGame;
use client::network::MirrorLink;
use server::game::HostGame;
use shared::protocol::{
    decode_packet, read_frame, write_frame, FullStateReplication, ReplicationTransport,
};
use shared::{
    GamePhase, InputMessage, LinkState, Packet, ProtocolError, Role, Session, SessionConfig,
    SessionUpdate, GUEST_PLAYER, HOST_PLAYER, MAX_FRAME_LEN,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::time::sleep;

fn test_config() -> SessionConfig {
    SessionConfig {
        seed: Some(11),
        cadence_ms: 2,
        intro_duration_ms: 0,
        level_complete_delay_ms: 50,
        ..SessionConfig::default()
    }
}

fn session_in(role: Role) -> Session {
    let mut session = Session::new(test_config());
    session.select_mode(role).unwrap();
    session.login("user", "pass", 0).unwrap();
    session.skip_intro(0).unwrap();
    session
}

async fn start_host() -> HostGame {
    HostGame::start("127.0.0.1:0", session_in(Role::Host))
        .await
        .unwrap()
}

/// Steps the host and polls the mirror until `done` holds or two seconds pass.
async fn run_until<F>(host: &mut HostGame, mirror: &mut MirrorGame, input: InputMessage, mut done: F) -> u64
where
    F: FnMut(&HostGame, &MirrorGame) -> bool,
{
    let mut now = 0;
    for _ in 0..400 {
        now += 16;
        host.step(now, &InputMessage::default()).unwrap();
        mirror.poll(now).unwrap();
        mirror.send_input(&input);
        if done(host, mirror) {
            return now;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within the time limit");
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// A snapshot of a running match survives the trip through a real socket
    #[tokio::test]
    async fn snapshot_over_tcp() {
        let mut host = session_in(Role::Host);
        host.set_link(LinkState::Connected);
        for now in 0..30 {
            host.apply_local_input(&InputMessage {
                down: true,
                ..InputMessage::default()
            });
            host.tick(now * 16).unwrap();
        }
        let snapshot = host.snapshot();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sent = snapshot.clone();
        let writer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let payload = FullStateReplication.encode_snapshot(&sent).unwrap();
            write_frame(&mut socket, &payload).await.unwrap();
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let frame = read_frame(&mut stream).await.unwrap();
        let received = FullStateReplication.decode_snapshot(&frame).unwrap();
        writer.await.unwrap();

        assert_eq!(received, snapshot);
    }

    /// Payloads are plain bincode packets, so either end can be rebuilt
    /// against the codec alone
    #[test]
    fn payload_is_bincode_packet() {
        let input = InputMessage {
            left: true,
            attack: true,
            ..InputMessage::default()
        };
        let raw = bincode::serialize(&Packet::Input(input)).unwrap();
        assert_eq!(decode_packet(&raw).unwrap(), Packet::Input(input));
        assert_eq!(FullStateReplication.encode_input(&input).unwrap(), raw);
    }

    /// A frame split across many small reads is reassembled
    #[tokio::test]
    async fn snapshot_frame_split_reads() {
        let snapshot = session_in(Role::Host).snapshot();
        let payload = FullStateReplication.encode_snapshot(&snapshot).unwrap();

        let mut builder = tokio_test::io::Builder::new();
        builder.read(&(payload.len() as u32).to_be_bytes());
        for chunk in payload.chunks(7) {
            builder.read(chunk);
        }
        let mut reader = builder.build();

        let frame = read_frame(&mut reader).await.unwrap();
        assert_eq!(FullStateReplication.decode_snapshot(&frame).unwrap(), snapshot);
    }
}

/// SIMULATION REPLICATION TESTS
mod game_logic_tests {
    use super::*;

    /// A guest session fed every host snapshot shows exactly the host's mazes
    #[test]
    fn mirror_matches_host_without_network() {
        let mut host = session_in(Role::Host);
        host.set_link(LinkState::Connected);
        let mut guest = session_in(Role::Guest);

        let pattern = [
            InputMessage {
                right: true,
                ..InputMessage::default()
            },
            InputMessage {
                down: true,
                attack: true,
                ..InputMessage::default()
            },
        ];

        for step in 0..120u64 {
            let input = pattern[(step / 20) as usize % pattern.len()];
            host.apply_local_input(&input);
            host.apply_remote_input(&input);
            host.tick(step * 16).unwrap();
            guest.apply_snapshot(&host.snapshot()).unwrap();
        }

        for id in [HOST_PLAYER, GUEST_PLAYER] {
            let authoritative = host.maze(id).unwrap().snapshot();
            let mirrored = guest.maze(id).unwrap().snapshot();
            assert_eq!(mirrored, authoritative);
        }
        assert_eq!(guest.phase(), host.phase());
    }

    /// Both players start on the same layout at the same spawn
    #[test]
    fn both_mazes_share_level() {
        let host = session_in(Role::Host);
        let p1 = host.maze(HOST_PLAYER).unwrap().player().unwrap().position;
        let p2 = host.maze(GUEST_PLAYER).unwrap().player().unwrap().position;
        assert_approx_eq!(p1.x, p2.x);
        assert_approx_eq!(p1.y, p2.y);
    }
}

/// HOST / MIRROR INTEGRATION TESTS
mod client_server_tests {
    use super::*;

    /// The guest's keys move the guest player on the host, and the mirror
    /// follows the host's position
    #[tokio::test]
    async fn guest_input_reaches_host_and_back() {
        let mut host = start_host().await;
        let spawn = host
            .session()
            .maze(GUEST_PLAYER)
            .unwrap()
            .player()
            .unwrap()
            .position;

        let link = MirrorLink::connect(
            &Handle::current(),
            host.local_addr().to_string(),
            Duration::from_millis(2),
        );
        let mut mirror = MirrorGame::new(session_in(Role::Guest));
        mirror.attach(link);

        let right = InputMessage {
            right: true,
            ..InputMessage::default()
        };
        run_until(&mut host, &mut mirror, right, |host, mirror| {
            let on_host = host
                .session()
                .maze(GUEST_PLAYER)
                .and_then(|m| m.player())
                .map(|p| p.position);
            let mirrored = mirror
                .session()
                .own_maze()
                .and_then(|m| m.player())
                .map(|p| p.position);
            matches!(on_host, Some(pos) if pos.x > spawn.x + 20.0)
                && mirrored.map_or(false, |pos| pos.x > spawn.x + 20.0)
        })
        .await;

        assert!(host.is_connected());
        assert!(mirror.is_connected());
        assert_eq!(mirror.session().phase(), GamePhase::Playing);
    }

    /// Dropping the guest freezes the host and marks the link lost
    #[tokio::test]
    async fn guest_disconnect_halts_host() {
        let mut host = start_host().await;
        let link = MirrorLink::connect(
            &Handle::current(),
            host.local_addr().to_string(),
            Duration::from_millis(2),
        );
        let mut mirror = MirrorGame::new(session_in(Role::Guest));
        mirror.attach(link);
        run_until(&mut host, &mut mirror, InputMessage::default(), |host, mirror| {
            host.is_connected() && mirror.snapshots_applied() > 0
        })
        .await;

        drop(mirror);

        let mut now = 10_000;
        for _ in 0..400 {
            now += 16;
            host.step(now, &InputMessage::default()).unwrap();
            if !host.is_connected() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(host.session().link(), LinkState::Lost);
        assert_eq!(
            host.step(now + 16, &InputMessage::default()).unwrap(),
            SessionUpdate::Halted
        );
    }

    /// Stopping the host is observed by the mirror as a lost link
    #[tokio::test]
    async fn host_stop_is_seen_by_mirror() {
        let mut host = start_host().await;
        let link = MirrorLink::connect(
            &Handle::current(),
            host.local_addr().to_string(),
            Duration::from_millis(2),
        );
        let mut mirror = MirrorGame::new(session_in(Role::Guest));
        mirror.attach(link);
        run_until(&mut host, &mut mirror, InputMessage::default(), |_, mirror| {
            mirror.is_connected() && mirror.snapshots_applied() > 0
        })
        .await;

        host.stop();

        let mut now = 0;
        while mirror.session().link() != LinkState::Lost && now < 2000 {
            now += 10;
            sleep(Duration::from_millis(10)).await;
            mirror.poll(now).unwrap();
        }
        assert_eq!(mirror.session().link(), LinkState::Lost);
    }

    /// Only one guest at a time; the slot frees up when it leaves
    #[tokio::test]
    async fn second_guest_refused_until_slot_frees() {
        let mut host = start_host().await;
        let addr = host.local_addr();

        let first = TcpStream::connect(addr).await.unwrap();
        for _ in 0..200 {
            host.poll_network();
            if host.is_connected() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert!(host.is_connected());

        let mut second = TcpStream::connect(addr).await.unwrap();
        let refused = tokio::time::timeout(Duration::from_secs(2), read_frame(&mut second))
            .await
            .unwrap();
        assert!(matches!(refused, Err(ProtocolError::Closed)));

        drop(first);
        for _ in 0..200 {
            host.poll_network();
            if !host.is_connected() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        let mut third = TcpStream::connect(addr).await.unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(2), read_frame(&mut third))
            .await
            .unwrap()
            .unwrap();
        assert!(FullStateReplication.decode_snapshot(&frame).is_ok());
    }
}

/// ERROR HANDLING TESTS
mod stress_tests {
    use super::*;

    async fn wait_for_link(host: &mut HostGame, wanted: LinkState) {
        for _ in 0..400 {
            host.poll_network();
            if host.session().link() == wanted {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("host link never became {:?}", wanted);
    }

    /// A peer that answers with undecodable bytes is disconnected
    #[tokio::test]
    async fn malformed_input_drops_peer() {
        let mut host = start_host().await;
        let mut peer = TcpStream::connect(host.local_addr()).await.unwrap();
        wait_for_link(&mut host, LinkState::Connected).await;

        read_frame(&mut peer).await.unwrap();
        write_frame(&mut peer, &[0xde, 0xad, 0xbe, 0xef, 0x01])
            .await
            .unwrap();

        wait_for_link(&mut host, LinkState::Lost).await;
        assert!(!host.is_connected());
    }

    /// A peer announcing a frame above the size limit is disconnected
    #[tokio::test]
    async fn oversized_frame_drops_peer() {
        let mut host = start_host().await;
        let mut peer = TcpStream::connect(host.local_addr()).await.unwrap();
        wait_for_link(&mut host, LinkState::Connected).await;

        read_frame(&mut peer).await.unwrap();
        let header = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        peer.write_all(&header).await.unwrap();

        wait_for_link(&mut host, LinkState::Lost).await;
    }

    /// A guest that sends a snapshot instead of input breaks the protocol
    #[tokio::test]
    async fn wrong_packet_kind_drops_peer() {
        let mut host = start_host().await;
        let mut peer = TcpStream::connect(host.local_addr()).await.unwrap();
        wait_for_link(&mut host, LinkState::Connected).await;

        let frame = read_frame(&mut peer).await.unwrap();
        write_frame(&mut peer, &frame).await.unwrap();

        wait_for_link(&mut host, LinkState::Lost).await;
    }
}
