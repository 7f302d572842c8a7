//! Wire protocol between the authoritative host and the mirror.
//!
//! Every message travels as one frame: a 4-byte big-endian payload length
//! followed by exactly that many bytes of bincode-encoded [`Packet`]. Both
//! ends use the same framing; a frame that announces more than
//! [`MAX_FRAME_LEN`] bytes, fails to decode or carries the wrong packet kind
//! ends the connection.

use crate::entity::{CollectibleKind, EnemyBehavior};
use crate::geometry::{Direction, MoveIntent, Rect};
use crate::session::{GamePhase, MatchResult};
use crate::MAX_FRAME_LEN;
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Codec(#[from] bincode::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("peer closed the connection")]
    Closed,
    #[error("expected {expected} packet")]
    UnexpectedPacket { expected: &'static str },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub score: u32,
    pub keys: u32,
    pub facing: Direction,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct EnemyState {
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub behavior: EnemyBehavior,
    pub patrol_x: f32,
    pub patrol_y: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct CollectibleState {
    pub x: f32,
    pub y: f32,
    pub kind: CollectibleKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WallState {
    pub row: u16,
    pub col: u16,
    pub breakable: bool,
    pub health: Option<i32>,
}

/// Position of one surge particle; the mirror redraws these for visual parity.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SparkState {
    pub x: f32,
    pub y: f32,
}

/// Everything a mirror needs to redraw one maze.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MazeSnapshot {
    pub level_index: u32,
    pub width: u16,
    pub height: u16,
    pub player: Option<PlayerState>,
    pub enemies: Vec<EnemyState>,
    pub collectibles: Vec<CollectibleState>,
    pub walls: Vec<WallState>,
    pub exit: Option<Rect>,
    pub destroyed_walls: Vec<(u16, u16)>,
    pub surge_started_ms: Option<u64>,
    pub sparks: Vec<SparkState>,
}

/// Full session state pushed from the host once per loop iteration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub level_index: u32,
    pub maze1: Option<MazeSnapshot>,
    pub maze2: Option<MazeSnapshot>,
    pub result: Option<MatchResult>,
}

/// Keys currently held by the mirror's player.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputMessage {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub attack: bool,
}

impl InputMessage {
    pub fn intent(&self) -> MoveIntent {
        MoveIntent::from_keys(self.up, self.down, self.left, self.right)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Snapshot(GameSnapshot),
    Input(InputMessage),
}

pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    Ok(serialize(packet)?)
}

pub fn decode_packet(payload: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(deserialize(payload)?)
}

/// Writes `payload` as a single length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame, looping until the announced length has arrived. End of
/// stream before the frame is complete is reported as [`ProtocolError::Closed`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    read_exact_or_closed(reader, &mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut payload = vec![0u8; len];
    read_exact_or_closed(reader, &mut payload).await?;
    Ok(payload)
}

async fn read_exact_or_closed<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ProtocolError::Closed),
        Err(e) => Err(e.into()),
    }
}

/// Turns snapshots and inputs into frame payloads and back.
///
/// Networking tasks only talk to the simulation through this trait, so a
/// delta or predictive scheme can replace [`FullStateReplication`] without
/// touching the simulation.
pub trait ReplicationTransport: Send {
    fn encode_snapshot(&mut self, snapshot: &GameSnapshot) -> Result<Vec<u8>, ProtocolError>;
    fn decode_snapshot(&mut self, payload: &[u8]) -> Result<GameSnapshot, ProtocolError>;
    fn encode_input(&mut self, input: &InputMessage) -> Result<Vec<u8>, ProtocolError>;
    fn decode_input(&mut self, payload: &[u8]) -> Result<InputMessage, ProtocolError>;
}

/// Sends the complete state every time; the mirror overwrites, never merges.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullStateReplication;

impl ReplicationTransport for FullStateReplication {
    fn encode_snapshot(&mut self, snapshot: &GameSnapshot) -> Result<Vec<u8>, ProtocolError> {
        encode_packet(&Packet::Snapshot(snapshot.clone()))
    }

    fn decode_snapshot(&mut self, payload: &[u8]) -> Result<GameSnapshot, ProtocolError> {
        match decode_packet(payload)? {
            Packet::Snapshot(snapshot) => Ok(snapshot),
            Packet::Input(_) => Err(ProtocolError::UnexpectedPacket {
                expected: "snapshot",
            }),
        }
    }

    fn encode_input(&mut self, input: &InputMessage) -> Result<Vec<u8>, ProtocolError> {
        encode_packet(&Packet::Input(*input))
    }

    fn decode_input(&mut self, payload: &[u8]) -> Result<InputMessage, ProtocolError> {
        match decode_packet(payload)? {
            Packet::Input(input) => Ok(input),
            Packet::Snapshot(_) => Err(ProtocolError::UnexpectedPacket { expected: "input" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::maze::MazeSimulation;

    fn sample_snapshot() -> GameSnapshot {
        let mut maze1 = MazeSimulation::new(1, SimConfig::default(), 1);
        maze1.load_level(0).unwrap();
        let mut maze2 = MazeSimulation::new(2, SimConfig::default(), 2);
        maze2.load_level(0).unwrap();
        GameSnapshot {
            phase: GamePhase::Playing,
            level_index: 0,
            maze1: Some(maze1.snapshot()),
            maze2: Some(maze2.snapshot()),
            result: None,
        }
    }

    #[test]
    fn test_input_message_intent() {
        let input = InputMessage {
            up: true,
            down: false,
            left: true,
            right: true,
            attack: true,
        };
        assert_eq!(input.intent(), MoveIntent { dx: 0, dy: -1 });
    }

    #[test]
    fn test_packet_serialization_input() {
        let packet = Packet::Input(InputMessage {
            right: true,
            attack: true,
            ..InputMessage::default()
        });
        let bytes = encode_packet(&packet).unwrap();
        assert_eq!(decode_packet(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        let result = decode_packet(&[0xff, 0xff, 0xff, 0xff, 0x01]);
        assert!(matches!(result, Err(ProtocolError::Codec(_))));
    }

    #[test]
    fn test_transport_rejects_wrong_packet_kind() {
        let mut transport = FullStateReplication;
        let input_bytes = transport.encode_input(&InputMessage::default()).unwrap();
        assert!(matches!(
            transport.decode_snapshot(&input_bytes),
            Err(ProtocolError::UnexpectedPacket { expected: "snapshot" })
        ));

        let snapshot_bytes = transport.encode_snapshot(&sample_snapshot()).unwrap();
        assert!(matches!(
            transport.decode_input(&snapshot_bytes),
            Err(ProtocolError::UnexpectedPacket { expected: "input" })
        ));
    }

    #[test]
    fn test_transport_snapshot_round_trip() {
        let mut transport = FullStateReplication;
        let snapshot = sample_snapshot();
        let bytes = transport.encode_snapshot(&snapshot).unwrap();
        assert_eq!(transport.decode_snapshot(&bytes).unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_frame_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let payload = vec![7u8; 1000];

        let writer = tokio::spawn(async move {
            write_frame(&mut a, &payload).await.unwrap();
            a
        });
        let received = read_frame(&mut b).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received, vec![7u8; 1000]);
    }

    #[tokio::test]
    async fn test_frame_header_is_big_endian() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &[1, 2, 3]).await.unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 3, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_split_reads() {
        let mut reader = tokio_test::io::Builder::new()
            .read(&[0, 0])
            .read(&[0, 5, b'h'])
            .read(b"el")
            .read(b"lo")
            .build();
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_read_frame_closed_mid_payload() {
        let mut reader = tokio_test::io::Builder::new()
            .read(&[0, 0, 0, 10])
            .read(b"abc")
            .build();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_frame_closed_before_header() {
        let mut reader = tokio_test::io::Builder::new().build();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        let mut reader = tokio_test::io::Builder::new().read(&len).build();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_frame_rejects_oversized_payload() {
        let mut sink = Vec::new();
        let payload = vec![0u8; MAX_FRAME_LEN + 1];
        assert!(matches!(
            write_frame(&mut sink, &payload).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
        assert!(sink.is_empty());
    }
}
