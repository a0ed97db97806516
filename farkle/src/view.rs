//! Plain-text board renderer shared by the terminal server and the local
//! client.

use crate::{
    game::entities::{GameData, MAX_USERNAME_LENGTH},
    session::state_machine::UiState,
};

pub const WELCOME: &str = "Welcome, Press C To Connect";
pub const CONNECTING: &str = "Connecting to the game server...";
pub const FAILED_CONNECTION: &str = "Failed to connect, please try again by pressing c";
pub const SUCCESSFUL_CONNECTION: &str = "Great Success, Press 1 To Start!";
pub const FAILED_RESPONSE: &str = "responding to server failed";
pub const START_GAME: &str = "Press 1 To Start Game";
pub const DISCONNECTED: &str = "Lost the game server, press c to reconnect";

const RULE: &str = "------------------------------";

/// Renders what a program should show for `state`. Lines are separated by
/// `\n` only; terminals that need `\r\n` convert on write.
pub fn render(state: &UiState, data: &GameData) -> String {
    let has_data = *data != GameData::default();
    let mut lines: Vec<String> = Vec::new();

    match state {
        UiState::Welcome => lines.push(WELCOME.to_string()),
        UiState::Connecting => lines.push(CONNECTING.to_string()),
        UiState::FailedConnection { reason } => {
            lines.push(FAILED_CONNECTION.to_string());
            lines.push(String::new());
            lines.push(reason.clone());
        }
        UiState::SuccessfulConnection => lines.push(SUCCESSFUL_CONNECTION.to_string()),
        UiState::Responding | UiState::SuccessfulResponse if has_data => board(data, &mut lines),
        UiState::Responding => lines.push("Sending...".to_string()),
        UiState::SuccessfulResponse => lines.push("Sent, waiting for the game server".to_string()),
        UiState::FailedResponse { reason } => {
            if has_data {
                board(data, &mut lines);
                lines.push(String::new());
            }
            lines.push(format!("{FAILED_RESPONSE}: {reason}"));
        }
        UiState::GameLive => board(data, &mut lines),
        UiState::Degraded { reason } => {
            board(data, &mut lines);
            lines.push(String::new());
            lines.push(format!("(showing last good update) {reason}"));
        }
        UiState::Disconnected => lines.push(DISCONNECTED.to_string()),
    }

    lines.join("\n")
}

fn board(data: &GameData, lines: &mut Vec<String>) {
    lines.push("FARKLE".to_string());
    lines.push(RULE.to_string());
    if data.players.is_empty() {
        lines.push("  no players seated".to_string());
    }
    let current = data.current_player();
    for player in &data.players {
        let marker = if current.is_some_and(|current| current.name == player.name) {
            '>'
        } else {
            ' '
        };
        lines.push(format!(
            "{marker} {:<width$} {:>6}",
            player.name,
            player.score,
            width = MAX_USERNAME_LENGTH
        ));
    }
    lines.push(RULE.to_string());

    if data.is_waiting_for_players() {
        lines.push(START_GAME.to_string());
        return;
    }

    let dice = if data.roll.is_empty() {
        "-".to_string()
    } else {
        data.roll
            .iter()
            .map(|die| format!("[{die}]"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    lines.push(format!("Roll: {dice}"));
    lines.push(format!("Dice left: {}", data.num_dice));
    lines.push(format!("Round score: {}", data.round_score));
    if let Some(leader) = data.leader() {
        lines.push(format!("Leader: {} ({})", leader.name, leader.score));
    }
    if !data.turn.is_empty() {
        lines.push(format!("{}'s turn, Press 1 To Roll", data.turn));
    }
}
