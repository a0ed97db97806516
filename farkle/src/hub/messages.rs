//! Session hub message types.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{game::entities::Username, session::messages::SessionEvent};

/// Identifies one attached interactive program.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hub-level notification pushed into every attached program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HubEvent {
    /// A player attached to the server
    ConnectionMessage(Username),
    /// A player detached from the server
    PlayerLeft(Username),
    /// Free-form announcement
    Notice(String),
}

impl fmt::Display for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionMessage(name) => write!(f, "{name} joined"),
            Self::PlayerLeft(name) => write!(f, "{name} left"),
            Self::Notice(text) => write!(f, "{text}"),
        }
    }
}

/// Registry entry for an attached program.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub name: Username,
    pub attached_at: DateTime<Utc>,
    /// Dispatch handle into the program's event inbox. Keeps the inbox
    /// open until the record is unregistered or pruned.
    pub inbox: mpsc::Sender<SessionEvent>,
}

impl SessionRecord {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            name: self.name.clone(),
            attached_at: self.attached_at,
        }
    }
}

/// Registry entry without the dispatch handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub name: Username,
    pub attached_at: DateTime<Utc>,
}

/// Messages that can be sent to the hub actor
#[derive(Debug)]
pub enum HubMessage {
    /// Add a program to the registry
    Register { record: SessionRecord },

    /// Remove a program that detached
    Unregister { id: SessionId },

    /// Deliver an event to every registered program
    Broadcast { event: HubEvent },

    /// List registered programs
    ListSessions {
        response: oneshot::Sender<Vec<SessionSummary>>,
    },
}
