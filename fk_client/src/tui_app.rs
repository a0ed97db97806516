//! TUI application for the local Farkle client.
//!
//! Hosts one interactive program directly against the game-logic process
//! and draws every state it publishes with ratatui. Nothing is logged to
//! the terminal; events worth seeing go to the history window instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use farkle::{
    ClientState, GameClient, SessionConfig, SessionDriver, UiState, UserInput, Username, view,
};
use ratatui::{
    DefaultTerminal, Frame,
    crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    layout::{Constraint, Flex, Layout, Margin, Rect},
    style::Stylize,
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Clear, List, ListDirection, ListItem, Padding, Paragraph, Scrollbar,
        ScrollbarOrientation, block,
    },
};
use std::{sync::Arc, time::Duration};

mod widgets;

use widgets::ScrollableList;

const HELP: &str = "\
c
        Connect to the game server. Also retries after a failed or lost
        connection.
1
        Roll. Starts the game while everyone is still joining.
Tab
        Show or hide this window.
Up / Down
        Scroll the history window.
q, Esc, Ctrl-C
        Quit.
";
const MAX_LOG_RECORDS: usize = 1024;
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Clone)]
enum RecordKind {
    Ack,
    Alert,
    Error,
    Game,
    You,
}

/// A timestamped terminal message with an importance label to help
/// direct user attention.
#[derive(Clone)]
struct Record {
    datetime: DateTime<Utc>,
    kind: RecordKind,
    content: String,
}

impl Record {
    fn new(kind: RecordKind, content: String) -> Self {
        Self {
            datetime: Utc::now(),
            kind,
            content,
        }
    }
}

impl From<Record> for ListItem<'_> {
    fn from(val: Record) -> Self {
        let repr = match val.kind {
            RecordKind::Ack => "ACK".light_blue(),
            RecordKind::Alert => "ALERT".light_magenta(),
            RecordKind::Error => "ERROR".light_red(),
            RecordKind::Game => "GAME".light_yellow(),
            RecordKind::You => "YOU".light_green(),
        };

        let msg = vec![
            format!("[{} ", val.datetime.format("%H:%M:%S")).into(),
            Span::styled(format!("{repr:5}"), repr.style),
            format!("]: {}", val.content).into(),
        ];

        ListItem::new(Line::from(msg))
    }
}

/// What a key press means to the app.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum KeyAction {
    Input(UserInput),
    ToggleHelp,
    ScrollUp,
    ScrollDown,
    ScrollTop,
    ScrollBottom,
}

fn map_key(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.modifiers {
        KeyModifiers::CONTROL => match key.code {
            KeyCode::Char('c') => Some(KeyAction::Input(UserInput::Quit)),
            KeyCode::Home => Some(KeyAction::ScrollTop),
            KeyCode::End => Some(KeyAction::ScrollBottom),
            _ => None,
        },
        KeyModifiers::NONE | KeyModifiers::SHIFT => match key.code {
            KeyCode::Char(c) => UserInput::from_key(c).map(KeyAction::Input),
            KeyCode::Esc => Some(KeyAction::Input(UserInput::Quit)),
            KeyCode::Tab => Some(KeyAction::ToggleHelp),
            KeyCode::Up => Some(KeyAction::ScrollUp),
            KeyCode::Down => Some(KeyAction::ScrollDown),
            _ => None,
        },
        _ => None,
    }
}

/// Notices in `new` posted after `old` was published. Ones that already
/// scrolled out of the window are lost.
fn fresh_notices<'a>(old: &ClientState, new: &'a ClientState) -> impl Iterator<Item = &'a String> {
    let posted = new.notices_posted.saturating_sub(old.notices_posted);
    let fresh = usize::try_from(posted).map_or(new.notices.len(), |n| n.min(new.notices.len()));
    new.notices.iter().skip(new.notices.len() - fresh)
}

/// TUI App state
pub struct TuiApp {
    username: Username,
    game_addr: String,
    /// Whether to display the help menu window
    show_help_menu: bool,
    /// Helps scroll through the help menu window if the terminal is small
    help_handle: ScrollableList,
    /// History of recorded messages
    log_handle: ScrollableList,
    /// Last state published by the program
    state: ClientState,
}

impl TuiApp {
    pub fn new(username: Username, game_addr: String) -> Self {
        // Fill help menu with help text lines, newest first
        let mut help_handle = ScrollableList::new(MAX_LOG_RECORDS);
        help_handle.push("".into());
        for line in HELP.lines() {
            help_handle.push(line.to_string().into());
        }
        help_handle.push("".into());
        help_handle.jump_to_first();

        Self {
            username,
            game_addr,
            show_help_menu: false,
            help_handle,
            log_handle: ScrollableList::new(MAX_LOG_RECORDS),
            state: ClientState::new(),
        }
    }

    /// Add log message
    fn add_log(&mut self, kind: RecordKind, content: String) {
        self.log_handle.push(Record::new(kind, content).into());
    }

    /// Records what changed between the last state and `next`, then keeps
    /// `next`.
    fn observe(&mut self, next: ClientState) {
        if next.ui != self.state.ui {
            match &next.ui {
                UiState::Welcome => {}
                UiState::Connecting => {
                    self.add_log(RecordKind::You, format!("connecting to {}", self.game_addr));
                }
                UiState::FailedConnection { reason } => {
                    self.add_log(RecordKind::Error, reason.clone());
                }
                UiState::SuccessfulConnection => {
                    self.add_log(RecordKind::Ack, "connected".to_string());
                }
                UiState::Responding => self.add_log(RecordKind::You, "roll".to_string()),
                UiState::SuccessfulResponse => {
                    self.add_log(RecordKind::Ack, "decision sent".to_string());
                }
                UiState::FailedResponse { reason } => {
                    self.add_log(RecordKind::Error, format!("{}: {reason}", view::FAILED_RESPONSE));
                }
                UiState::GameLive => {}
                UiState::Degraded { reason } => self.add_log(RecordKind::Alert, reason.clone()),
                UiState::Disconnected => {
                    self.add_log(RecordKind::Error, "disconnected from game server".to_string());
                }
            }
        }

        if next.data.turn != self.state.data.turn && !next.data.turn.is_empty() {
            if next.data.turn == self.username.as_str() {
                self.add_log(RecordKind::Alert, "It's your turn!".to_string());
            } else if !next.data.is_waiting_for_players() {
                self.add_log(RecordKind::Game, format!("{}'s turn", next.data.turn));
            }
        }

        let fresh: Vec<String> = fresh_notices(&self.state, &next)
            .cloned()
            .collect();
        for notice in fresh {
            self.add_log(RecordKind::Game, notice);
        }

        self.state = next;
    }

    /// Render the board
    fn draw_board(&self, frame: &mut Frame, area: Rect) {
        let board = Paragraph::new(view::render(&self.state.ui, &self.state.data)).block(
            Block::bordered()
                .padding(Padding::uniform(1))
                .title(format!(" farkle @ {}  ", self.game_addr)),
        );
        frame.render_widget(board, area);
    }

    /// Render the players attached to the same server
    fn draw_lobby(&self, frame: &mut Frame, area: Rect) {
        let lobby = List::new(self.state.lobby.iter().map(|name| {
            let item = ListItem::new(name.to_string());
            if *name == self.username {
                item.bold().white()
            } else {
                item
            }
        }))
        .block(
            Block::bordered()
                .padding(Padding::uniform(1))
                .title(" lobby  "),
        );
        frame.render_widget(lobby, area);
    }

    /// Render the log/history window with scrollbar
    fn draw_log(&mut self, frame: &mut Frame, area: Rect) {
        let log_records = self.log_handle.list_items.clone();
        let log_records = List::new(log_records)
            .direction(ListDirection::BottomToTop)
            .block(block::Block::bordered().title(" history  "));
        frame.render_stateful_widget(log_records, area, &mut self.log_handle.list_state);

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            area.inner(Margin {
                vertical: 1,
                horizontal: 1,
            }),
            &mut self.log_handle.scroll_state,
        );
    }

    /// Render the help/status bar at the bottom
    fn draw_help_bar(&self, frame: &mut Frame, area: Rect) {
        let status_indicator = if self.state.reading {
            "● Connected".green()
        } else {
            "● Disconnected".red()
        };

        let help_message = vec![
            status_indicator,
            format!(" | {} | press ", self.username).into(),
            "Tab".bold().white(),
            " to view help, press ".into(),
            "c".bold().white(),
            " to connect, ".into(),
            "1".bold().white(),
            " to roll, or ".into(),
            "Esc".bold().white(),
            " to exit".into(),
        ];
        frame.render_widget(Paragraph::new(Line::from(help_message)), area);
    }

    /// Render the help menu overlay
    fn draw_help_menu(&mut self, frame: &mut Frame) {
        let vertical = Layout::vertical([Constraint::Max(18)]).flex(Flex::Center);
        let horizontal = Layout::horizontal([Constraint::Max(80)]).flex(Flex::Center);
        let [help_menu_area] = vertical.areas(frame.area());
        let [help_menu_area] = horizontal.areas(help_menu_area);
        frame.render_widget(Clear, help_menu_area);

        let help_items = self.help_handle.list_items.clone();
        let help_items = List::new(help_items)
            .direction(ListDirection::BottomToTop)
            .block(block::Block::bordered().title(" keys  "));
        frame.render_stateful_widget(
            help_items,
            help_menu_area,
            &mut self.help_handle.list_state,
        );

        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .begin_symbol(None)
                .end_symbol(None),
            help_menu_area.inner(Margin {
                vertical: 1,
                horizontal: 1,
            }),
            &mut self.help_handle.scroll_state,
        );
    }

    /// Main draw function - orchestrates rendering of all UI components
    fn draw(&mut self, frame: &mut Frame) {
        let window = Layout::vertical([
            Constraint::Min(6),    // Board + lobby + log
            Constraint::Length(1), // Help bar
        ]);
        let [top_area, help_area] = window.areas(frame.area());

        let [view_area, log_area] =
            Layout::vertical([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(top_area);

        let [board_area, lobby_area] =
            Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
                .areas(view_area);

        self.draw_board(frame, board_area);
        self.draw_lobby(frame, lobby_area);
        self.draw_log(frame, log_area);
        self.draw_help_bar(frame, help_area);

        if self.show_help_menu {
            self.draw_help_menu(frame);
        }
    }

    /// Applies a non-program key. Returns the input to forward, if any.
    fn handle_key(&mut self, action: KeyAction) -> Option<UserInput> {
        match action {
            KeyAction::Input(input) => return Some(input),
            KeyAction::ToggleHelp => self.show_help_menu = !self.show_help_menu,
            KeyAction::ScrollUp if self.show_help_menu => self.help_handle.move_up(),
            KeyAction::ScrollUp => self.log_handle.move_up(),
            KeyAction::ScrollDown if self.show_help_menu => self.help_handle.move_down(),
            KeyAction::ScrollDown => self.log_handle.move_down(),
            KeyAction::ScrollTop => self.log_handle.jump_to_first(),
            KeyAction::ScrollBottom => self.log_handle.jump_to_last(),
        }
        None
    }

    /// Run the TUI application
    pub async fn run<C: GameClient>(
        mut self,
        client: Arc<C>,
        config: SessionConfig,
        mut terminal: DefaultTerminal,
    ) -> Result<()> {
        let (handle, mut driver) = SessionDriver::spawn(
            self.username.clone(),
            self.game_addr.clone(),
            client,
            &config,
        );
        let mut snapshots = handle.subscribe();
        self.add_log(
            RecordKind::Ack,
            format!("Welcome {}! Press c to connect.", self.username),
        );

        loop {
            terminal.draw(|frame| self.draw(frame))?;

            // Check for keyboard input
            if event::poll(POLL_TIMEOUT)?
                && let Event::Key(key) = event::read()?
                && let Some(action) = map_key(key)
                && let Some(input) = self.handle_key(action)
            {
                handle
                    .input(input)
                    .await
                    .context("Game session stopped unexpectedly")?;
                if input == UserInput::Quit {
                    break;
                }
            }

            // Check for new program states
            if snapshots.has_changed().unwrap_or(false) {
                let next = snapshots.borrow_and_update().clone();
                self.observe(next);
            }

            if driver.is_finished() {
                break;
            }
        }

        let _ = tokio::time::timeout(Duration::from_secs(2), &mut driver).await;
        Ok(())
    }
}
