//! Transport session to the game-logic process.
//!
//! A session owns one TCP stream. Once connected, the read half moves into a
//! background read loop that turns every read into a [`Frame`] (or a
//! [`ReadError`]) and pushes it onto one of two channels. The write half
//! stays with the session so decisions can be written while the loop is
//! blocked on a read.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex as AsyncMutex, mpsc, oneshot},
    time::timeout,
};

use super::{
    config::TransportConfig,
    errors::{ConnectionError, ReadError, TransportError, WriteError},
    messages::Frame,
    utils::READ_BUFFER_SIZE,
};

/// Operations an interactive program needs from its connection to the
/// game-logic process.
#[async_trait]
pub trait GameClient: Send + Sync + 'static {
    /// Dial the game-logic process. Doesn't retry.
    async fn connect(&self, addr: &str) -> Result<(), ConnectionError>;

    /// Spawn the read loop and hand back its channels.
    fn start_read_loop(&self) -> Result<ReadChannels, TransportError>;

    /// Write a player response.
    async fn respond(&self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Stop the read loop and shut the connection down.
    async fn close(&self);
}

/// Something delivered by the read loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Frame(Frame),
    Error(ReadError),
}

/// Receiving ends of a read loop's data and error channels.
#[derive(Debug)]
pub struct ReadChannels {
    pub data: mpsc::Receiver<Frame>,
    pub errors: mpsc::Receiver<ReadError>,
}

impl ReadChannels {
    /// Waits for whichever channel is ready first. Returns `None` once both
    /// channels are closed.
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        tokio::select! {
            Some(frame) = self.data.recv() => Some(ChannelEvent::Frame(frame)),
            Some(error) = self.errors.recv() => Some(ChannelEvent::Error(error)),
            else => None,
        }
    }
}

/// A TCP connection to the game-logic process.
pub struct TransportSession {
    config: TransportConfig,
    /// Read half, parked here between connect and the start of the read loop
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: AsyncMutex<Option<OwnedWriteHalf>>,
    /// Stops the running read loop
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TransportSession {
    /// Creates an unconnected session.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            reader: Mutex::new(None),
            writer: AsyncMutex::new(None),
            shutdown: Mutex::new(None),
        }
    }

    fn stop_read_loop(&self) {
        let shutdown = lock(&self.shutdown).take();
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }
    }
}

impl Default for TransportSession {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl GameClient for TransportSession {
    async fn connect(&self, addr: &str) -> Result<(), ConnectionError> {
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) => {
                return Err(ConnectionError::Dial {
                    addr: addr.to_string(),
                    message: error.to_string(),
                });
            }
            Err(_) => {
                return Err(ConnectionError::Timeout {
                    addr: addr.to_string(),
                    secs: self.config.connect_timeout.as_secs(),
                });
            }
        };
        if let Err(error) = stream.set_nodelay(true) {
            warn!("Couldn't disable Nagle's algorithm for {addr}: {error}");
        }

        // A retry replaces whatever the previous attempt left behind.
        self.stop_read_loop();
        let (read_half, write_half) = stream.into_split();
        *lock(&self.reader) = Some(read_half);
        *self.writer.lock().await = Some(write_half);

        info!("Connected to game server at {addr}");
        Ok(())
    }

    fn start_read_loop(&self) -> Result<ReadChannels, TransportError> {
        let reader = lock(&self.reader).take();
        let Some(reader) = reader else {
            return if lock(&self.shutdown).is_some() {
                Err(TransportError::AlreadyReading)
            } else {
                Err(TransportError::NotConnected)
            };
        };

        let capacity = self.config.channel_capacity.max(1);
        let (data_tx, data) = mpsc::channel(capacity);
        let (error_tx, errors) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *lock(&self.shutdown) = Some(shutdown_tx);

        tokio::spawn(read_loop(reader, data_tx, error_tx, shutdown_rx));
        Ok(ReadChannels { data, errors })
    }

    async fn respond(&self, bytes: &[u8]) -> Result<(), WriteError> {
        let mut writer = self.writer.lock().await;
        let writer = writer.as_mut().ok_or(WriteError::NotConnected)?;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) {
        self.stop_read_loop();
        lock(&self.reader).take();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(error) = writer.shutdown().await {
                debug!("Error shutting down game server connection: {error}");
            }
            info!("Closed game server connection");
        }
    }
}

/// Reads until the peer closes the stream, the session asks it to stop, or
/// nobody is listening on the channels anymore. Read errors are forwarded
/// and the loop keeps going; the consumer decides which ones are fatal.
async fn read_loop(
    mut reader: OwnedReadHalf,
    data: mpsc::Sender<Frame>,
    errors: mpsc::Sender<ReadError>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        let result = tokio::select! {
            _ = &mut shutdown => break,
            result = reader.read(&mut buf) => result,
        };

        let delivered = match result {
            Ok(0) => {
                debug!("Game server closed the connection");
                break;
            }
            Ok(n) => {
                let frame = Frame::from_read(&buf[..n]);
                tokio::select! {
                    _ = &mut shutdown => break,
                    sent = data.send(frame) => sent.is_ok(),
                }
            }
            Err(error) => {
                warn!("Error reading from game server: {error}");
                tokio::select! {
                    _ = &mut shutdown => break,
                    sent = errors.send(error.into()) => sent.is_ok(),
                }
            }
        };

        if !delivered {
            debug!("Read loop consumer went away");
            break;
        }
    }
    debug!("Read loop finished");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::{io::AsyncReadExt, net::TcpListener, time::timeout};

    use super::*;
    use crate::{
        game::entities::{GameData, Player},
        net::utils::write_padded,
    };

    const WAIT: Duration = Duration::from_secs(2);

    async fn setup() -> (TransportSession, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let session = TransportSession::default();
        let (connected, accepted) = tokio::join!(session.connect(&addr), listener.accept());
        connected.unwrap();
        let (stream, _) = accepted.unwrap();
        (session, stream)
    }

    /// Next event, skipping the empty frames left over when the padding of
    /// a frame arrives in a read of its own.
    async fn next_event(channels: &mut ReadChannels) -> Option<ChannelEvent> {
        loop {
            match timeout(WAIT, channels.next()).await.unwrap() {
                Some(ChannelEvent::Frame(frame)) if frame.is_empty() => continue,
                other => return other,
            }
        }
    }

    #[tokio::test]
    async fn connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let session = TransportSession::default();
        let error = session.connect(&addr).await.unwrap_err();
        assert!(matches!(error, ConnectionError::Dial { .. }));
        assert!(matches!(
            session.respond(b"1").await,
            Err(WriteError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn read_loop_requires_connection() {
        let session = TransportSession::default();
        assert_eq!(
            session.start_read_loop().unwrap_err(),
            TransportError::NotConnected
        );
    }

    #[tokio::test]
    async fn read_loop_starts_once() {
        let (session, _stream) = setup().await;
        let _channels = session.start_read_loop().unwrap();
        assert_eq!(
            session.start_read_loop().unwrap_err(),
            TransportError::AlreadyReading
        );
    }

    #[tokio::test]
    async fn frames_arrive_in_order() {
        let (session, mut stream) = setup().await;
        let mut channels = session.start_read_loop().unwrap();

        for score in [100, 200, 300] {
            let data = GameData {
                players: vec![Player::new("A", score)],
                ..GameData::default()
            };
            write_padded(&mut stream, &data).await.unwrap();
            let event = next_event(&mut channels).await;
            let Some(ChannelEvent::Frame(frame)) = event else {
                panic!("expected a frame, got {event:?}");
            };
            assert_eq!(frame.decode().unwrap().players[0].score, score);
        }
    }

    #[tokio::test]
    async fn respond_writes_decision_byte() {
        let (session, mut stream) = setup().await;
        session.respond(b"1").await.unwrap();

        let mut buf = [0u8; 1];
        timeout(WAIT, stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"1");
    }

    #[tokio::test]
    async fn respond_before_connect_fails() {
        let session = TransportSession::default();
        assert_eq!(
            session.respond(b"1").await.unwrap_err(),
            WriteError::NotConnected
        );
    }

    #[tokio::test]
    async fn respond_after_close_fails() {
        let (session, _stream) = setup().await;
        session.close().await;
        assert_eq!(
            session.respond(b"1").await.unwrap_err(),
            WriteError::NotConnected
        );
    }

    #[tokio::test]
    async fn respond_to_departed_peer_eventually_fails() {
        let (session, stream) = setup().await;
        drop(stream);

        // The first write after the peer leaves usually succeeds and only
        // provokes a reset; a later one reports it.
        let mut result = Ok(());
        for _ in 0..100 {
            result = session.respond(b"1").await;
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(matches!(result, Err(WriteError::Io(_))));
    }

    #[tokio::test]
    async fn close_unblocks_pending_read() {
        let (session, _stream) = setup().await;
        let mut channels = session.start_read_loop().unwrap();

        // Nothing was written, so the loop is parked on a read.
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.close().await;

        assert_eq!(timeout(WAIT, channels.next()).await.unwrap(), None);
        assert!(channels.data.is_closed());
        assert!(channels.errors.is_closed());
    }

    #[tokio::test]
    async fn peer_close_closes_channels() {
        let (session, stream) = setup().await;
        let mut channels = session.start_read_loop().unwrap();
        drop(stream);
        assert_eq!(timeout(WAIT, channels.next()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropping_session_stops_read_loop() {
        let (session, _stream) = setup().await;
        let mut channels = session.start_read_loop().unwrap();
        drop(session);
        assert_eq!(timeout(WAIT, channels.next()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn buffered_frames_survive_peer_close() {
        let (session, mut stream) = setup().await;
        let mut channels = session.start_read_loop().unwrap();
        let data = GameData {
            turn: "B".to_string(),
            ..GameData::default()
        };
        write_padded(&mut stream, &data).await.unwrap();
        drop(stream);

        let Some(ChannelEvent::Frame(frame)) = next_event(&mut channels).await else {
            panic!("expected the buffered frame");
        };
        assert_eq!(frame.decode().unwrap().turn, "B");
        assert_eq!(next_event(&mut channels).await, None);
    }
}
