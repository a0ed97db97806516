//! Session driver actor.
//!
//! Owns one [`ClientState`] and feeds it events from three places: the
//! program's inbox (key presses and hub notifications), completions of the
//! background tasks it spawned, and the transport's read channels. Commands
//! returned by the state machine run as tasks in a `JoinSet`; their results
//! come back as events, so the loop itself never blocks on the network.

use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::{JoinHandle, JoinSet},
};

use super::{
    config::SessionConfig,
    errors::SessionError,
    messages::{Command, SessionEvent, UserInput},
    state_machine::ClientState,
};
use crate::{
    game::entities::Username,
    net::transport::{ChannelEvent, GameClient, ReadChannels},
};

/// Handle for feeding a running session and watching its state.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionEvent>,
    snapshots: watch::Receiver<ClientState>,
}

impl SessionHandle {
    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn input(&self, input: UserInput) -> Result<(), SessionError> {
        self.send(SessionEvent::Input(input)).await
    }

    /// Sender side of the program's inbox, for registering with the hub.
    pub fn inbox(&self) -> mpsc::Sender<SessionEvent> {
        self.sender.clone()
    }

    /// Receiver that's notified after every applied event.
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.snapshots.clone()
    }

    /// Most recently published state.
    pub fn state(&self) -> ClientState {
        self.snapshots.borrow().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Drives one interactive program against a [`GameClient`].
pub struct SessionDriver<C: GameClient> {
    /// Player name, for logs
    name: Username,

    /// Address of the game-logic process
    game_addr: String,

    client: Arc<C>,

    state: ClientState,

    /// Key presses and hub notifications
    inbox: mpsc::Receiver<SessionEvent>,

    /// Results of background commands
    completions: mpsc::UnboundedReceiver<SessionEvent>,
    completions_tx: mpsc::UnboundedSender<SessionEvent>,

    /// Channels of the current read loop
    channels: Option<ReadChannels>,

    /// Whether the state machine is waiting on `channels`
    armed: bool,

    /// Background commands
    tasks: JoinSet<()>,

    /// Close of the previous connection, if it may still be running.
    /// A new connect waits for it.
    closing: Option<JoinHandle<()>>,

    snapshots: watch::Sender<ClientState>,

    quit: bool,
}

impl<C: GameClient> SessionDriver<C> {
    /// Create a new session driver
    ///
    /// # Returns
    ///
    /// * `(SessionDriver, SessionHandle)` - Driver and handle for feeding it
    pub fn new(
        name: Username,
        game_addr: impl Into<String>,
        client: Arc<C>,
        config: &SessionConfig,
    ) -> (Self, SessionHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(ClientState::new());

        let driver = Self {
            name,
            game_addr: game_addr.into(),
            client,
            state: ClientState::new(),
            inbox,
            completions,
            completions_tx,
            channels: None,
            armed: false,
            tasks: JoinSet::new(),
            closing: None,
            snapshots,
            quit: false,
        };
        let handle = SessionHandle {
            sender,
            snapshots: snapshot_rx,
        };
        (driver, handle)
    }

    /// Create a driver and spawn it on the current runtime.
    pub fn spawn(
        name: Username,
        game_addr: impl Into<String>,
        client: Arc<C>,
        config: &SessionConfig,
    ) -> (SessionHandle, JoinHandle<ClientState>) {
        let (driver, handle) = Self::new(name, game_addr, client, config);
        (handle, tokio::spawn(driver.run()))
    }

    /// Run until the user quits or every handle (including the hub's) is
    /// gone. Closes the transport on the way out and returns the final
    /// state.
    pub async fn run(mut self) -> ClientState {
        log::debug!("Session for {} starting", self.name);

        loop {
            let event = tokio::select! {
                event = self.inbox.recv() => match event {
                    Some(event) => event,
                    None => break,
                },

                Some(event) = self.completions.recv() => event,

                event = next_channel_event(&mut self.channels), if self.armed => {
                    self.armed = false;
                    if matches!(event, SessionEvent::ChannelsClosed) {
                        self.channels = None;
                    }
                    event
                }

                Some(result) = self.tasks.join_next() => {
                    if let Err(error) = result {
                        if error.is_panic() {
                            log::error!("Session task for {} panicked: {error}", self.name);
                        }
                    }
                    continue;
                }
            };

            self.handle_event(event);
            if self.quit {
                break;
            }
        }

        finish_close(self.closing.take()).await;
        self.client.close().await;
        self.tasks.shutdown().await;
        log::debug!("Session for {} stopped", self.name);
        self.state
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let before = self.state.ui.clone();
        let (state, commands) = std::mem::take(&mut self.state).apply(event);
        self.state = state;
        if self.state.ui != before {
            log::debug!("Session for {}: {} -> {}", self.name, before, self.state.ui);
        }

        for command in commands {
            self.execute(command);
        }
        self.snapshots.send_replace(self.state.clone());
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let client = Arc::clone(&self.client);
                let addr = self.game_addr.clone();
                let completions = self.completions_tx.clone();
                let closing = self.closing.take();
                self.tasks.spawn(async move {
                    finish_close(closing).await;
                    let event = match client.connect(&addr).await {
                        Ok(()) => SessionEvent::ConnectionSuccess,
                        Err(error) => SessionEvent::ConnectionFailed {
                            reason: error.to_string(),
                        },
                    };
                    let _ = completions.send(event);
                });
            }

            Command::StartReading => match self.client.start_read_loop() {
                Ok(channels) => self.channels = Some(channels),
                Err(error) => {
                    log::warn!("Couldn't start read loop for {}: {error}", self.name);
                    self.channels = None;
                    let _ = self.completions_tx.send(SessionEvent::ChannelsClosed);
                }
            },

            Command::AwaitChannels => self.armed = self.channels.is_some(),

            Command::Respond(decision) => {
                let client = Arc::clone(&self.client);
                let completions = self.completions_tx.clone();
                self.tasks.spawn(async move {
                    let event = match client.respond(decision.as_bytes()).await {
                        Ok(()) => SessionEvent::ResponseSucceeded,
                        Err(error) => SessionEvent::ResponseFailed {
                            reason: error.to_string(),
                        },
                    };
                    let _ = completions.send(event);
                });
            }

            Command::Close => {
                self.channels = None;
                self.armed = false;
                let client = Arc::clone(&self.client);
                let previous = self.closing.take();
                self.closing = Some(tokio::spawn(async move {
                    finish_close(previous).await;
                    client.close().await;
                }));
            }

            Command::Quit => self.quit = true,
        }
    }
}

async fn finish_close(closing: Option<JoinHandle<()>>) {
    if let Some(closing) = closing
        && let Err(error) = closing.await
        && error.is_panic()
    {
        log::error!("Closing the game server connection panicked: {error}");
    }
}

/// Next event from the read channels. Pending forever when there are none.
async fn next_channel_event(channels: &mut Option<ReadChannels>) -> SessionEvent {
    let Some(channels) = channels else {
        return std::future::pending().await;
    };
    match channels.next().await {
        Some(ChannelEvent::Frame(frame)) => SessionEvent::FrameReceived(frame.into_bytes()),
        Some(ChannelEvent::Error(error)) => SessionEvent::ReadError(error),
        None => SessionEvent::ChannelsClosed,
    }
}
