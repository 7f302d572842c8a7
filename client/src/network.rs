//! Mirror-side communication task
//!
//! The task connects to the host and then loops: read one snapshot, hand it to
//! the frontend, answer with the most recent input, sleep. The frontend only
//! touches the two channel ends and never waits on the socket.

use log::{error, info, warn};
use shared::protocol::{read_frame, write_frame, FullStateReplication, ReplicationTransport};
use shared::{GameSnapshot, InputMessage, ProtocolError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

#[derive(Debug)]
pub enum MirrorEvent {
    Connected,
    Snapshot(Box<GameSnapshot>),
    Disconnected { reason: String },
}

/// Frontend handle to the running communication task
pub struct MirrorLink {
    events: mpsc::UnboundedReceiver<MirrorEvent>,
    input: watch::Sender<InputMessage>,
    shutdown: watch::Sender<bool>,
}

impl MirrorLink {
    /// Spawns the communication task on `runtime` and returns immediately.
    /// Connection failures arrive later as [`MirrorEvent::Disconnected`].
    pub fn connect(runtime: &Handle, addr: String, cadence: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = watch::channel(InputMessage::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        runtime.spawn(run_mirror(addr, cadence, events_tx, input_rx, shutdown_rx));

        Self {
            events: events_rx,
            input: input_tx,
            shutdown: shutdown_tx,
        }
    }

    /// Replaces the input the task sends with its next answer.
    pub fn send_input(&self, input: InputMessage) {
        let _ = self.input.send(input);
    }

    pub fn try_next_event(&mut self) -> Option<MirrorEvent> {
        self.events.try_recv().ok()
    }

    /// Asks the task to close the socket and exit.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for MirrorLink {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_mirror(
    addr: String,
    cadence: Duration,
    events: mpsc::UnboundedSender<MirrorEvent>,
    input: watch::Receiver<InputMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Connecting to host at {}", addr);
    let connected = tokio::select! {
        result = TcpStream::connect(addr.as_str()) => result,
        _ = shutdown.changed() => return,
    };
    let mut stream = match connected {
        Ok(stream) => stream,
        Err(e) => {
            error!("Could not reach host {}: {}", addr, e);
            let _ = events.send(MirrorEvent::Disconnected {
                reason: e.to_string(),
            });
            return;
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Could not disable Nagle: {}", e);
    }
    info!("Connected to host at {}", addr);
    let _ = events.send(MirrorEvent::Connected);

    let mut transport = FullStateReplication;
    let reason = loop {
        let outcome = tokio::select! {
            result = exchange(&mut stream, &mut transport, &input) => result,
            _ = shutdown.changed() => break "left the match".to_string(),
        };

        match outcome {
            Ok(snapshot) => {
                if events.send(MirrorEvent::Snapshot(Box::new(snapshot))).is_err() {
                    break "frontend closed".to_string();
                }
            }
            Err(ProtocolError::Closed) => break "host closed the connection".to_string(),
            Err(e) => {
                error!("Host exchange failed: {}", e);
                break e.to_string();
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(cadence) => {}
            _ = shutdown.changed() => break "left the match".to_string(),
        }
    };

    let _ = stream.shutdown().await;
    info!("Host link closed: {}", reason);
    let _ = events.send(MirrorEvent::Disconnected { reason });
}

/// One iteration of the mirror side of the cadence: block for a snapshot,
/// then answer with the current input.
pub async fn exchange<S, T>(
    stream: &mut S,
    transport: &mut T,
    input: &watch::Receiver<InputMessage>,
) -> Result<GameSnapshot, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: ReplicationTransport,
{
    let frame = read_frame(stream).await?;
    let snapshot = transport.decode_snapshot(&frame)?;

    let current = *input.borrow();
    let payload = transport.encode_input(&current)?;
    write_frame(stream, &payload).await?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GamePhase;
    use tokio::net::TcpListener;

    fn snapshot(phase: GamePhase) -> GameSnapshot {
        GameSnapshot {
            phase,
            level_index: 2,
            maze1: None,
            maze2: None,
            result: None,
        }
    }

    async fn next_event(link: &mut MirrorLink) -> MirrorEvent {
        for _ in 0..200 {
            if let Some(event) = link.try_next_event() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no event from mirror task");
    }

    #[tokio::test]
    async fn test_exchange_answers_with_latest_input() {
        let (mut mirror_end, mut host_end) = tokio::io::duplex(4096);
        let (input_tx, input_rx) = watch::channel(InputMessage::default());
        input_tx
            .send(InputMessage {
                down: true,
                attack: true,
                ..InputMessage::default()
            })
            .unwrap();

        let host = tokio::spawn(async move {
            let mut transport = FullStateReplication;
            let payload = transport.encode_snapshot(&snapshot(GamePhase::Playing)).unwrap();
            write_frame(&mut host_end, &payload).await.unwrap();
            let reply = read_frame(&mut host_end).await.unwrap();
            transport.decode_input(&reply).unwrap()
        });

        let received = exchange(&mut mirror_end, &mut FullStateReplication, &input_rx)
            .await
            .unwrap();

        assert_eq!(received.level_index, 2);
        let input = host.await.unwrap();
        assert!(input.down && input.attack);
        assert!(!input.up);
    }

    #[tokio::test]
    async fn test_exchange_rejects_garbage() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[0, 0, 0, 3])
            .read(&[0xff, 0xff, 0xff])
            .build();
        let (_tx, input_rx) = watch::channel(InputMessage::default());

        let result = exchange(&mut stream, &mut FullStateReplication, &input_rx).await;
        assert!(matches!(result, Err(ProtocolError::Codec(_))));
    }

    #[tokio::test]
    async fn test_link_reports_snapshots_then_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut link = MirrorLink::connect(&Handle::current(), addr, Duration::from_millis(1));

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut transport = FullStateReplication;
        let payload = transport.encode_snapshot(&snapshot(GamePhase::Playing)).unwrap();
        write_frame(&mut socket, &payload).await.unwrap();
        read_frame(&mut socket).await.unwrap();
        drop(socket);

        assert!(matches!(next_event(&mut link).await, MirrorEvent::Connected));
        match next_event(&mut link).await {
            MirrorEvent::Snapshot(received) => assert_eq!(received.phase, GamePhase::Playing),
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert!(matches!(
            next_event(&mut link).await,
            MirrorEvent::Disconnected { .. }
        ));
    }

    #[tokio::test]
    async fn test_link_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut link = MirrorLink::connect(&Handle::current(), addr, Duration::from_millis(1));
        assert!(matches!(
            next_event(&mut link).await,
            MirrorEvent::Disconnected { .. }
        ));
    }

    #[tokio::test]
    async fn test_stop_closes_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut link = MirrorLink::connect(&Handle::current(), addr, Duration::from_millis(1));
        let (mut socket, _) = listener.accept().await.unwrap();
        assert!(matches!(next_event(&mut link).await, MirrorEvent::Connected));

        link.stop();

        let closed = tokio::time::timeout(Duration::from_secs(2), read_frame(&mut socket))
            .await
            .unwrap();
        assert!(matches!(closed, Err(ProtocolError::Closed)));
        assert!(matches!(
            next_event(&mut link).await,
            MirrorEvent::Disconnected { .. }
        ));
    }
}
