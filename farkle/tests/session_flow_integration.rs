//! Integration tests driving a full session against a stub game-logic
//! process on a loopback socket.

use async_trait::async_trait;
use farkle::{
    ClientState, GameClient, ReadChannels, SessionConfig, SessionDriver, SessionHandle,
    TransportSession, UiState, UserInput,
    net::{
        errors::{ConnectionError, TransportError, WriteError},
        utils::READ_BUFFER_SIZE,
    },
};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::watch,
    time::timeout,
};

const SAMPLE: &str = r#"{"bots":[{"Name":"A","Score":0},{"Name":"B","Score":0}],"num_dice":5,"round_score":0,"roll":[3,4],"turn":"A"}"#;

async fn stub_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

async fn write_frame(stream: &mut TcpStream, json: &str) {
    let mut buf = json.as_bytes().to_vec();
    buf.resize(READ_BUFFER_SIZE, 0);
    stream.write_all(&buf).await.unwrap();
    stream.flush().await.unwrap();
}

async fn wait_until(
    rx: &mut watch::Receiver<ClientState>,
    predicate: impl FnMut(&ClientState) -> bool,
) -> ClientState {
    let state = timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("state never reached")
        .expect("driver stopped");
    ClientState::clone(&state)
}

fn start<C: GameClient>(client: C, addr: &str) -> SessionHandle {
    let (handle, _task) = SessionDriver::spawn(
        "alice".into(),
        addr,
        Arc::new(client),
        &SessionConfig::default(),
    );
    handle
}

#[tokio::test]
async fn stub_frame_makes_game_live() {
    let (listener, addr) = stub_server().await;
    let handle = start(TransportSession::default(), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    write_frame(&mut stream, SAMPLE).await;

    let state = wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;
    assert_eq!(state.data.roll, vec![3, 4]);
    assert_eq!(state.data.turn, "A");
    assert_eq!(state.data.players.len(), 2);

    // Rolling writes the single decision byte back.
    handle.input(UserInput::Roll).await.unwrap();
    let mut decision = [0u8; 1];
    timeout(Duration::from_secs(5), stream.read_exact(&mut decision))
        .await
        .expect("no decision written")
        .unwrap();
    assert_eq!(&decision, b"1");
}

#[tokio::test]
async fn connect_with_nothing_listening_fails() {
    let addr = {
        let (listener, addr) = stub_server().await;
        drop(listener);
        addr
    };
    let handle = start(TransportSession::default(), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let state = wait_until(&mut rx, |s| {
        matches!(s.ui, UiState::FailedConnection { .. })
    })
    .await;
    assert_eq!(state.data, Default::default());
    assert!(!handle.is_closed());
}

#[tokio::test]
async fn server_closing_disconnects_and_reconnect_works() {
    let (listener, addr) = stub_server().await;
    let handle = start(TransportSession::default(), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    write_frame(&mut stream, SAMPLE).await;
    wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;

    drop(stream);
    wait_until(&mut rx, |s| s.ui == UiState::Disconnected).await;

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    wait_until(&mut rx, |s| s.ui == UiState::SuccessfulConnection).await;
    write_frame(&mut stream, r#"{"bots":[{"Name":"A","Score":150}],"turn":"A"}"#).await;
    let state = wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;
    assert_eq!(state.data.players[0].score, 150);
}

#[tokio::test]
async fn roll_after_server_hung_up_fails_then_reconnects() {
    let (listener, addr) = stub_server().await;
    let handle = start(TransportSession::default(), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    write_frame(&mut stream, SAMPLE).await;
    wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;

    drop(stream);
    wait_until(&mut rx, |s| s.ui == UiState::Disconnected).await;

    // Early writes can still be accepted locally; once the peer's reset
    // arrives they fail.
    let state = timeout(Duration::from_secs(5), async {
        loop {
            handle.input(UserInput::Roll).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            let state = handle.state();
            if matches!(state.ui, UiState::FailedResponse { .. }) {
                return state;
            }
        }
    })
    .await
    .expect("write to a closed peer never failed");
    assert!(!state.writable);
    assert!(state.can_connect());

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    write_frame(&mut stream, SAMPLE).await;
    let state = wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;
    assert_eq!(state.data.turn, "A");
}

/// Transport whose writes always fail, wrapping a real one for reads.
struct BrokenWrites(TransportSession);

#[async_trait]
impl GameClient for BrokenWrites {
    async fn connect(&self, addr: &str) -> Result<(), ConnectionError> {
        self.0.connect(addr).await
    }

    fn start_read_loop(&self) -> Result<ReadChannels, TransportError> {
        self.0.start_read_loop()
    }

    async fn respond(&self, _bytes: &[u8]) -> Result<(), WriteError> {
        Err(WriteError::Io("broken pipe".to_string()))
    }

    async fn close(&self) {
        self.0.close().await;
    }
}

#[tokio::test]
async fn failed_response_keeps_frames_flowing() {
    let (listener, addr) = stub_server().await;
    let handle = start(BrokenWrites(TransportSession::default()), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    wait_until(&mut rx, |s| s.ui == UiState::SuccessfulConnection).await;

    handle.input(UserInput::Roll).await.unwrap();
    let state = wait_until(&mut rx, |s| matches!(s.ui, UiState::FailedResponse { .. })).await;
    assert_eq!(
        state.ui,
        UiState::FailedResponse {
            reason: "write failed: broken pipe".to_string()
        }
    );

    write_frame(&mut stream, SAMPLE).await;
    let state = wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;
    assert_eq!(state.data.turn, "A");
}

#[tokio::test]
async fn garbage_frame_degrades_with_stale_data() {
    let (listener, addr) = stub_server().await;
    let handle = start(TransportSession::default(), &addr);
    let mut rx = handle.subscribe();

    handle.input(UserInput::Connect).await.unwrap();
    let (mut stream, _) = listener.accept().await.unwrap();
    write_frame(&mut stream, SAMPLE).await;
    wait_until(&mut rx, |s| s.ui == UiState::GameLive).await;

    write_frame(&mut stream, "not json at all").await;
    let state = wait_until(&mut rx, |s| matches!(s.ui, UiState::Degraded { .. })).await;
    assert!(state.stale);
    assert_eq!(state.data.roll, vec![3, 4]);
}
