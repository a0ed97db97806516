//! Per-terminal adapter.
//!
//! Bridges one remote terminal and one interactive program: bytes typed on
//! the terminal become [`UserInput`]s, and every state the program publishes
//! is rendered and written back as a full screen. The adapter also
//! registers the program with the hub and announces arrivals and
//! departures.

use farkle::{
    ClientState, GameClient, HubEvent, HubHandle, SessionDriver, SessionEvent, SessionHandle,
    SessionId, TransportSession, UserInput, Username, view,
};
use log::{debug, info, warn};
use std::{io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};

use crate::{config::ServerConfig, logging::log_session_event};

/// Clears the screen and homes the cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub const NAME_PROMPT: &str = "Welcome to Farkle!\r\nEnter your name: ";

const KEY_HELP: &str = "[c] connect  [1] roll  [q] quit";

/// Longest name line kept. The rest of a longer line is discarded.
const MAX_NAME_LINE: u64 = 256;

/// How long the driver gets to close its transport after the terminal left.
const DRIVER_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Full screen for one state: board, lobby footer and key help.
pub fn screen(state: &ClientState) -> String {
    let mut out = String::from(CLEAR_SCREEN);
    out.push_str(&crlf(&view::render(&state.ui, &state.data)));
    out.push_str("\r\n\r\n");

    if !state.lobby.is_empty() {
        let names: Vec<&str> = state.lobby.iter().map(Username::as_str).collect();
        out.push_str(&format!("Players here: {}\r\n", names.join(", ")));
    }
    for notice in &state.notices {
        out.push_str(&format!("* {}\r\n", crlf(notice)));
    }

    out.push_str(KEY_HELP);
    out.push_str("\r\n");
    out
}

fn crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}

/// Serves one remote terminal until it disconnects or quits.
///
/// `ordinal` numbers connections and names players who don't pick a name.
pub async fn handle_terminal(
    stream: TcpStream,
    peer: SocketAddr,
    ordinal: usize,
    hub: HubHandle,
    config: Arc<ServerConfig>,
) -> io::Result<()> {
    let client = TransportSession::new(config.session.transport);
    serve(stream, peer, ordinal, hub, &config, Arc::new(client)).await
}

/// Same as [`handle_terminal`] against any [`GameClient`].
pub async fn serve<C: GameClient>(
    stream: TcpStream,
    peer: SocketAddr,
    ordinal: usize,
    hub: HubHandle,
    config: &ServerConfig,
    client: Arc<C>,
) -> io::Result<()> {
    if let Err(error) = stream.set_nodelay(true) {
        debug!("Couldn't disable Nagle's algorithm for {peer}: {error}");
    }
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    writer.write_all(NAME_PROMPT.as_bytes()).await?;
    writer.flush().await?;
    let Some(name) = read_name(&mut reader).await? else {
        debug!("{peer} left before picking a name");
        return Ok(());
    };
    let name = if name.is_empty() {
        Username::new(&format!("player-{ordinal}"))
    } else {
        name
    };

    let (handle, driver) =
        SessionDriver::spawn(name.clone(), config.game_addr.clone(), client, &config.session);

    // Earlier arrivals, so the newcomer's lobby isn't empty.
    let others = hub.sessions().await.unwrap_or_default();
    for other in others {
        let _ = handle
            .send(SessionEvent::Hub(HubEvent::ConnectionMessage(other.name)))
            .await;
    }

    let id = match hub.register(name.clone(), handle.inbox()) {
        Ok(id) => id,
        Err(error) => {
            warn!("Couldn't register {name} with the hub: {error}");
            let _ = handle.input(UserInput::Quit).await;
            return Ok(());
        }
    };
    log_session_event("attach", Some(id), Some(name.as_str()), &peer.to_string());
    if let Err(error) = hub.broadcast(HubEvent::ConnectionMessage(name.clone())) {
        warn!("Couldn't announce {name}: {error}");
    }

    let result = pump(&mut reader, &mut writer, &handle, driver).await;

    detach(&hub, id, &name, &handle).await;
    log_session_event("detach", Some(id), Some(name.as_str()), &peer.to_string());
    if result.is_ok() {
        let _ = writer.write_all(b"\r\nBye!\r\n").await;
        let _ = writer.shutdown().await;
    }
    result
}

/// Reads the name line. `None` means the terminal went away first.
async fn read_name<R>(reader: &mut R) -> io::Result<Option<Username>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_NAME_LINE)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if !line.ends_with(b"\n") {
        discard_line(reader).await?;
    }
    Ok(Some(Username::new(&String::from_utf8_lossy(&line))))
}

/// Drops input up to and including the next newline so the tail of an
/// overlong name isn't read as keys.
async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|&byte| byte == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Moves keys one way and screens the other until the terminal closes, the
/// player quits or the program stops.
async fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    handle: &SessionHandle,
    mut driver: JoinHandle<ClientState>,
) -> io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut snapshots = handle.subscribe();
    let mut buf = [0u8; 64];

    let initial = snapshots.borrow_and_update().clone();
    write_screen(writer, &initial).await?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                write_screen(writer, &state).await?;
            }

            read = reader.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    break;
                }
                for &byte in &buf[..n] {
                    let Some(input) = UserInput::from_key(char::from(byte)) else {
                        continue;
                    };
                    if handle.input(input).await.is_err() || input == UserInput::Quit {
                        return Ok(());
                    }
                }
            }

            _ = &mut driver => break,
        }
    }
    Ok(())
}

async fn write_screen<W: AsyncWrite + Unpin>(writer: &mut W, state: &ClientState) -> io::Result<()> {
    writer.write_all(screen(state).as_bytes()).await?;
    writer.flush().await
}

/// Takes the program out of the hub, tells everyone else and stops it.
async fn detach(hub: &HubHandle, id: SessionId, name: &Username, handle: &SessionHandle) {
    if let Err(error) = hub.unregister(id) {
        debug!("Couldn't unregister {name}: {error}");
    }
    if let Err(error) = hub.broadcast(HubEvent::PlayerLeft(name.clone())) {
        debug!("Couldn't announce departure of {name}: {error}");
    }

    let _ = handle.input(UserInput::Quit).await;
    if timeout(DRIVER_STOP_TIMEOUT, closed(handle)).await.is_err() {
        warn!("Session for {name} didn't stop in time");
    } else {
        info!("{name} detached");
    }
}

/// Resolves once the program's inbox is gone.
async fn closed(handle: &SessionHandle) {
    handle.inbox().closed().await;
}
