//! Client state machine.
//!
//! [`ClientState::apply`] is a pure transition function: it consumes the
//! current state and one [`SessionEvent`] and returns the next state along
//! with the [`Command`]s the driver should run. Nothing here touches the
//! network, so every transition can be tested without sockets.

use std::{collections::VecDeque, fmt};

use super::messages::{Command, SessionEvent, UserInput};
use crate::{
    game::entities::{GameData, Username},
    hub::messages::HubEvent,
    net::{errors::ReadError, messages::Decision, utils::decode_frame},
};

/// Most recent notices kept for display.
pub const MAX_NOTICES: usize = 5;

/// What the program is currently showing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum UiState {
    /// Nothing attempted yet.
    #[default]
    Welcome,
    /// A connection attempt is in flight.
    Connecting,
    FailedConnection {
        reason: String,
    },
    /// Connected, no game data yet.
    SuccessfulConnection,
    /// A decision is being written.
    Responding,
    SuccessfulResponse,
    FailedResponse {
        reason: String,
    },
    /// At least one snapshot has been received.
    GameLive,
    /// The last frame or read failed but the connection is still up. The
    /// previous snapshot is kept.
    Degraded {
        reason: String,
    },
    /// The connection to the game-logic process is gone.
    Disconnected,
}

impl UiState {
    /// Whether pressing connect starts a new attempt.
    pub fn can_connect(&self) -> bool {
        matches!(
            self,
            Self::Welcome | Self::FailedConnection { .. } | Self::Disconnected
        )
    }

    /// Whether the screen belongs to a live connection.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::SuccessfulConnection
                | Self::Responding
                | Self::SuccessfulResponse
                | Self::FailedResponse { .. }
                | Self::GameLive
                | Self::Degraded { .. }
        )
    }
}

impl fmt::Display for UiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome => write!(f, "welcome"),
            Self::Connecting => write!(f, "connecting"),
            Self::FailedConnection { .. } => write!(f, "failed connection"),
            Self::SuccessfulConnection => write!(f, "successful connection"),
            Self::Responding => write!(f, "responding"),
            Self::SuccessfulResponse => write!(f, "successful response"),
            Self::FailedResponse { .. } => write!(f, "failed response"),
            Self::GameLive => write!(f, "game live"),
            Self::Degraded { .. } => write!(f, "degraded"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Everything one interactive program knows.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientState {
    pub ui: UiState,
    /// Last successfully decoded snapshot.
    pub data: GameData,
    /// Set when the last frame couldn't be decoded and `data` is older
    /// than what the server most recently sent.
    pub stale: bool,
    /// Players attached to the same server, in join order.
    pub lobby: Vec<Username>,
    /// Recent hub notices and connection problems, oldest first.
    pub notices: VecDeque<String>,
    /// Notices posted since the program started, including ones that have
    /// scrolled out of `notices`.
    pub notices_posted: u64,
    /// Whether the read loop of the current connection is running.
    pub reading: bool,
    /// Whether the current connection can still be written to. Outlives
    /// `reading` when the game server closes its side first.
    pub writable: bool,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether pressing connect starts a new attempt. Besides the explicit
    /// welcome and failure screens, that's any settled screen left behind
    /// once the read side of the connection is gone.
    pub fn can_connect(&self) -> bool {
        self.ui.can_connect()
            || (!self.reading && !matches!(self.ui, UiState::Connecting | UiState::Responding))
    }

    /// Whether a decision can be submitted. Only one write is in flight at
    /// a time.
    pub fn can_respond(&self) -> bool {
        self.writable && self.ui != UiState::Responding
    }

    /// Applies one event. Events that make no sense in the current state
    /// (a stale completion, a key that isn't bound right now) leave the
    /// state unchanged and produce no commands.
    pub fn apply(mut self, event: SessionEvent) -> (Self, Vec<Command>) {
        let commands = match event {
            SessionEvent::Input(input) => self.on_input(input),

            SessionEvent::ConnectionSuccess => {
                if self.ui != UiState::Connecting {
                    return (self, vec![]);
                }
                self.ui = UiState::SuccessfulConnection;
                self.reading = true;
                self.writable = true;
                vec![Command::StartReading, Command::AwaitChannels]
            }

            SessionEvent::ConnectionFailed { reason } => {
                if self.ui == UiState::Connecting {
                    self.ui = UiState::FailedConnection { reason };
                }
                vec![]
            }

            SessionEvent::FrameReceived(bytes) => self.on_frame(&bytes),

            SessionEvent::ReadError(error) => self.on_read_error(error),

            // The write half stays open, so a decision can still be sent and
            // fail on its own.
            SessionEvent::ChannelsClosed => {
                self.reading = false;
                if self.ui.is_connected() {
                    self.ui = UiState::Disconnected;
                    self.push_notice("game server closed the connection".to_string());
                }
                vec![]
            }

            SessionEvent::ResponseSucceeded => {
                if self.ui == UiState::Responding {
                    self.ui = UiState::SuccessfulResponse;
                }
                vec![]
            }

            SessionEvent::ResponseFailed { reason } => {
                if self.writable {
                    self.ui = UiState::FailedResponse { reason };
                    // Nothing left to read from or write to.
                    if !self.reading {
                        self.writable = false;
                    }
                }
                vec![]
            }

            SessionEvent::Hub(event) => {
                self.on_hub_event(event);
                vec![]
            }
        };
        (self, commands)
    }

    fn on_input(&mut self, input: UserInput) -> Vec<Command> {
        match input {
            UserInput::Connect if self.can_connect() => {
                self.ui = UiState::Connecting;
                self.reading = false;
                self.writable = false;
                vec![Command::Connect]
            }
            UserInput::Roll if self.can_respond() => {
                self.ui = UiState::Responding;
                vec![Command::Respond(Decision::Roll)]
            }
            UserInput::Quit => vec![Command::Quit],
            _ => vec![],
        }
    }

    fn on_frame(&mut self, bytes: &[u8]) -> Vec<Command> {
        // Padding that arrived in a read of its own.
        if bytes.is_empty() {
            return vec![Command::AwaitChannels];
        }

        match decode_frame(bytes) {
            Ok(data) => {
                self.data = data;
                self.stale = false;
                self.ui = UiState::GameLive;
            }
            Err(error) => {
                log::debug!("Dropping undecodable frame: {error}");
                self.stale = true;
                self.ui = UiState::Degraded {
                    reason: error.to_string(),
                };
            }
        }
        vec![Command::AwaitChannels]
    }

    fn on_read_error(&mut self, error: ReadError) -> Vec<Command> {
        if error.is_fatal() {
            self.ui = UiState::Disconnected;
            self.reading = false;
            self.writable = false;
            self.push_notice(error.to_string());
            vec![Command::Close]
        } else {
            self.ui = UiState::Degraded {
                reason: error.to_string(),
            };
            vec![Command::AwaitChannels]
        }
    }

    fn on_hub_event(&mut self, event: HubEvent) {
        match &event {
            HubEvent::ConnectionMessage(name) => {
                if !self.lobby.contains(name) {
                    self.lobby.push(name.clone());
                }
            }
            HubEvent::PlayerLeft(name) => {
                if let Some(pos) = self.lobby.iter().position(|n| n == name) {
                    self.lobby.remove(pos);
                }
            }
            HubEvent::Notice(_) => {}
        }
        self.push_notice(event.to_string());
    }

    fn push_notice(&mut self, notice: String) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
        self.notices_posted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    const SAMPLE: &[u8] = br#"{"bots":[{"Name":"A","Score":0},{"Name":"B","Score":0}],"num_dice":5,"round_score":0,"roll":[3,4],"turn":"A"}"#;

    fn connected() -> ClientState {
        let (state, _) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
        let (state, _) = state.apply(SessionEvent::ConnectionSuccess);
        state
    }

    fn live() -> ClientState {
        let (state, _) = connected().apply(SessionEvent::FrameReceived(SAMPLE.to_vec()));
        state
    }

    #[test]
    fn connect_from_welcome() {
        let (state, commands) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::Connecting);
        assert_eq!(commands, vec![Command::Connect]);
    }

    #[test]
    fn connection_success_starts_reading() {
        let (state, _) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
        let (state, commands) = state.apply(SessionEvent::ConnectionSuccess);
        assert_eq!(state.ui, UiState::SuccessfulConnection);
        assert_eq!(commands, vec![Command::StartReading, Command::AwaitChannels]);
    }

    #[test]
    fn connection_failure_can_be_retried() {
        let (state, _) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
        let (state, commands) = state.apply(SessionEvent::ConnectionFailed {
            reason: "refused".to_string(),
        });
        assert_eq!(
            state.ui,
            UiState::FailedConnection {
                reason: "refused".to_string()
            }
        );
        assert!(commands.is_empty());

        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::Connecting);
        assert_eq!(commands, vec![Command::Connect]);
    }

    #[test]
    fn connect_ignored_while_connecting_or_connected() {
        let (state, _) = ClientState::new().apply(SessionEvent::Input(UserInput::Connect));
        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::Connecting);
        assert!(commands.is_empty());

        let (state, commands) = live().apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::GameLive);
        assert!(commands.is_empty());
    }

    #[test]
    fn frame_makes_game_live() {
        let (state, commands) = connected().apply(SessionEvent::FrameReceived(SAMPLE.to_vec()));
        assert_eq!(state.ui, UiState::GameLive);
        assert_eq!(commands, vec![Command::AwaitChannels]);
        assert_eq!(state.data.roll, vec![3, 4]);
        assert_eq!(state.data.turn, "A");
        assert_eq!(state.data.players.len(), 2);
        assert!(!state.stale);
    }

    #[test]
    fn undecodable_frame_keeps_previous_snapshot() {
        let before = live();
        let (state, commands) = before
            .clone()
            .apply(SessionEvent::FrameReceived(br#"{"bots":[{"Na"#.to_vec()));
        assert!(matches!(state.ui, UiState::Degraded { .. }));
        assert_eq!(state.data, before.data);
        assert!(state.stale);
        assert_eq!(commands, vec![Command::AwaitChannels]);

        let (state, _) = state.apply(SessionEvent::FrameReceived(SAMPLE.to_vec()));
        assert_eq!(state.ui, UiState::GameLive);
        assert!(!state.stale);
    }

    #[test]
    fn empty_frame_only_rearms() {
        let before = live();
        let (state, commands) = before.clone().apply(SessionEvent::FrameReceived(vec![]));
        assert_eq!(state, before);
        assert_eq!(commands, vec![Command::AwaitChannels]);
    }

    #[test]
    fn roll_from_live_game() {
        let (state, commands) = live().apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Responding);
        assert_eq!(commands, vec![Command::Respond(Decision::Roll)]);

        let (state, commands) = state.apply(SessionEvent::ResponseSucceeded);
        assert_eq!(state.ui, UiState::SuccessfulResponse);
        assert!(commands.is_empty());
    }

    #[test]
    fn roll_ignored_before_connecting_and_while_responding() {
        let (state, commands) = ClientState::new().apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Welcome);
        assert!(commands.is_empty());

        let (state, _) = live().apply(SessionEvent::Input(UserInput::Roll));
        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Responding);
        assert!(commands.is_empty());
    }

    #[test]
    fn response_failure_is_reported() {
        let (state, _) = connected().apply(SessionEvent::Input(UserInput::Roll));
        let (state, commands) = state.apply(SessionEvent::ResponseFailed {
            reason: "broken pipe".to_string(),
        });
        assert_eq!(
            state.ui,
            UiState::FailedResponse {
                reason: "broken pipe".to_string()
            }
        );
        assert!(commands.is_empty());

        // Frames still land afterwards.
        let (state, _) = state.apply(SessionEvent::FrameReceived(SAMPLE.to_vec()));
        assert_eq!(state.ui, UiState::GameLive);
    }

    #[test]
    fn frame_during_response_wins() {
        let (state, _) = live().apply(SessionEvent::Input(UserInput::Roll));
        let (state, _) = state.apply(SessionEvent::FrameReceived(SAMPLE.to_vec()));
        let (state, _) = state.apply(SessionEvent::ResponseSucceeded);
        assert_eq!(state.ui, UiState::GameLive);
    }

    #[test]
    fn fatal_read_error_disconnects() {
        let error: ReadError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        let (state, commands) = live().apply(SessionEvent::ReadError(error));
        assert_eq!(state.ui, UiState::Disconnected);
        assert_eq!(commands, vec![Command::Close]);
        assert_eq!(state.notices.len(), 1);

        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::Connecting);
        assert_eq!(commands, vec![Command::Connect]);
    }

    #[test]
    fn transient_read_error_degrades() {
        let error: ReadError = io::Error::from(io::ErrorKind::TimedOut).into();
        let (state, commands) = live().apply(SessionEvent::ReadError(error));
        assert!(matches!(state.ui, UiState::Degraded { .. }));
        assert_eq!(commands, vec![Command::AwaitChannels]);
        assert_eq!(state.data.turn, "A");
    }

    #[test]
    fn channels_closed_disconnects() {
        let (state, commands) = live().apply(SessionEvent::ChannelsClosed);
        assert_eq!(state.ui, UiState::Disconnected);
        assert!(commands.is_empty());
        assert!(!state.reading);
        assert!(state.writable);
    }

    #[test]
    fn roll_after_server_hung_up_fails_on_write() {
        let (state, _) = live().apply(SessionEvent::ChannelsClosed);
        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Responding);
        assert_eq!(commands, vec![Command::Respond(Decision::Roll)]);

        // The first write can still land in the socket buffer.
        let (state, _) = state.apply(SessionEvent::ResponseSucceeded);
        assert_eq!(state.ui, UiState::SuccessfulResponse);
        assert!(state.can_connect());

        let (state, _) = state.apply(SessionEvent::Input(UserInput::Roll));
        let (state, commands) = state.apply(SessionEvent::ResponseFailed {
            reason: "broken pipe".to_string(),
        });
        assert_eq!(
            state.ui,
            UiState::FailedResponse {
                reason: "broken pipe".to_string()
            }
        );
        assert!(commands.is_empty());
        assert!(!state.writable);

        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Roll));
        assert!(matches!(state.ui, UiState::FailedResponse { .. }));
        assert!(commands.is_empty());

        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Connect));
        assert_eq!(state.ui, UiState::Connecting);
        assert_eq!(commands, vec![Command::Connect]);
    }

    #[test]
    fn roll_ignored_after_fatal_read_error() {
        let error: ReadError = io::Error::from(io::ErrorKind::ConnectionReset).into();
        let (state, _) = live().apply(SessionEvent::ReadError(error));
        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Disconnected);
        assert!(commands.is_empty());
    }

    #[test]
    fn failed_response_while_reading_can_be_retried() {
        let (state, _) = live().apply(SessionEvent::Input(UserInput::Roll));
        let (state, _) = state.apply(SessionEvent::ResponseFailed {
            reason: "timed out".to_string(),
        });
        assert!(!state.can_connect());
        let (state, commands) = state.apply(SessionEvent::Input(UserInput::Roll));
        assert_eq!(state.ui, UiState::Responding);
        assert_eq!(commands, vec![Command::Respond(Decision::Roll)]);
    }

    #[test]
    fn stale_completions_are_ignored() {
        let (state, commands) = ClientState::new().apply(SessionEvent::ConnectionSuccess);
        assert_eq!(state.ui, UiState::Welcome);
        assert!(commands.is_empty());

        let (state, _) = state.apply(SessionEvent::ResponseFailed {
            reason: "late".to_string(),
        });
        assert_eq!(state.ui, UiState::Welcome);
    }

    #[test]
    fn quit_from_anywhere() {
        for state in [ClientState::new(), connected(), live()] {
            let (_, commands) = state.apply(SessionEvent::Input(UserInput::Quit));
            assert_eq!(commands, vec![Command::Quit]);
        }
    }

    #[test]
    fn hub_events_track_lobby() {
        let state = ClientState::new();
        let (state, _) = state.apply(SessionEvent::Hub(HubEvent::ConnectionMessage("alice".into())));
        let (state, _) = state.apply(SessionEvent::Hub(HubEvent::ConnectionMessage("bob".into())));
        let (state, _) = state.apply(SessionEvent::Hub(HubEvent::ConnectionMessage("alice".into())));
        assert_eq!(state.lobby, vec![Username::new("alice"), Username::new("bob")]);

        let (state, commands) = state.apply(SessionEvent::Hub(HubEvent::PlayerLeft("alice".into())));
        assert_eq!(state.lobby, vec![Username::new("bob")]);
        assert!(commands.is_empty());
        assert_eq!(state.notices.back().map(String::as_str), Some("alice left"));
        assert_eq!(state.ui, UiState::Welcome);
    }

    #[test]
    fn notices_are_capped() {
        let mut state = ClientState::new();
        for i in 0..(MAX_NOTICES + 3) {
            (state, _) = state.apply(SessionEvent::Hub(HubEvent::Notice(format!("n{i}"))));
        }
        assert_eq!(state.notices.len(), MAX_NOTICES);
        assert_eq!(state.notices.front().map(String::as_str), Some("n3"));
        assert_eq!(state.notices_posted, MAX_NOTICES as u64 + 3);
    }
}
