//! Shared game data exchanged with the game-logic process.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Value of [`GameData::turn`] while the game-logic process is still
/// waiting for players to connect.
pub const WAITING_FOR_PLAYERS: &str = "waiting for connections";

/// Longest display name kept after sanitizing user input.
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Face value of a single die (1-6).
pub type Die = u8;

/// Points as counted by the game-logic process.
pub type Score = u32;

/// A display name. Whitespace is replaced so names stay on one line of
/// the board, and overly long names are truncated.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let username: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .take(MAX_USERNAME_LENGTH)
            .collect();
        Self(username)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// A seat at the table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    /// Banked score. Only grows during normal play.
    #[serde(rename = "Score", alias = "score", default)]
    pub score: Score,
}

impl Player {
    pub fn new(name: &str, score: Score) -> Self {
        Self {
            name: name.to_string(),
            score,
        }
    }
}

/// Snapshot of the shared game state pushed by the game-logic process.
///
/// Every field falls back to its zero value when absent or `null`, which is
/// how the game-logic process encodes empty lists.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GameData {
    /// Players in seating order.
    #[serde(rename = "bots", deserialize_with = "null_as_default")]
    pub players: Vec<Player>,
    /// Dice still in play for the active turn.
    pub num_dice: u32,
    /// Points accumulated in the current, not yet banked, turn.
    pub round_score: Score,
    /// Faces of the dice currently rolled.
    #[serde(deserialize_with = "null_as_default")]
    pub roll: Vec<Die>,
    /// Name of the player whose turn it is, or [`WAITING_FOR_PLAYERS`].
    #[serde(deserialize_with = "null_as_default")]
    pub turn: String,
}

impl GameData {
    pub fn is_waiting_for_players(&self) -> bool {
        self.turn == WAITING_FOR_PLAYERS
    }

    /// Returns the player whose turn it is, if they're seated.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.iter().find(|player| player.name == self.turn)
    }

    /// Leading player by banked score. Ties go to the earlier seat.
    pub fn leader(&self) -> Option<&Player> {
        self.players
            .iter()
            .rev()
            .max_by_key(|player| player.score)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
