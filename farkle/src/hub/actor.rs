//! Session hub actor.
//!
//! The registry lives inside a single task; every registration and every
//! broadcast goes through its inbox, so mutation and iteration never race.
//! Each broadcast fans out into one delivery task per program, supervised
//! by a `JoinSet` so a failing delivery can't take the hub down.

use chrono::Utc;
use std::{collections::HashMap, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinError, JoinSet},
    time::timeout,
};

use super::{
    errors::{HubError, Result},
    messages::{HubEvent, HubMessage, SessionId, SessionRecord, SessionSummary},
};
use crate::{game::entities::Username, session::messages::SessionEvent};

/// How long a single delivery may wait on a full program inbox before the
/// event is dropped for that program.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one delivery task
#[derive(Debug)]
enum Delivery {
    Delivered,
    /// The program's inbox is gone
    Closed(SessionId),
    /// The program didn't make room in time
    TimedOut(SessionId),
}

/// Hub handle for registering programs and broadcasting to them
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::UnboundedSender<HubMessage>,
}

impl HubHandle {
    /// Registers a program's inbox under a fresh session ID.
    pub fn register(
        &self,
        name: Username,
        inbox: mpsc::Sender<SessionEvent>,
    ) -> Result<SessionId> {
        let record = SessionRecord {
            id: SessionId::new(),
            name,
            attached_at: Utc::now(),
            inbox,
        };
        let id = record.id;
        self.send(HubMessage::Register { record })?;
        Ok(id)
    }

    /// Removes a program that detached.
    pub fn unregister(&self, id: SessionId) -> Result<()> {
        self.send(HubMessage::Unregister { id })
    }

    /// Queues `event` for every registered program and returns immediately.
    ///
    /// Delivery is at most once per program, with no ordering guarantee
    /// relative to other broadcasts.
    pub fn broadcast(&self, event: HubEvent) -> Result<()> {
        self.send(HubMessage::Broadcast { event })
    }

    /// Lists registered programs, oldest first.
    pub async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        let (response, rx) = oneshot::channel();
        self.send(HubMessage::ListSessions { response })?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, message: HubMessage) -> Result<()> {
        self.sender.send(message).map_err(|_| HubError::Closed)
    }
}

/// Registry of attached programs
pub struct SessionHub {
    /// Message inbox
    inbox: mpsc::UnboundedReceiver<HubMessage>,

    /// Registered programs
    sessions: HashMap<SessionId, SessionRecord>,

    /// In-flight deliveries
    deliveries: JoinSet<Delivery>,
}

impl SessionHub {
    /// Create a new hub actor
    ///
    /// # Returns
    ///
    /// * `(SessionHub, HubHandle)` - Actor and handle for sending messages
    pub fn new() -> (Self, HubHandle) {
        let (sender, inbox) = mpsc::unbounded_channel();
        let hub = Self {
            inbox,
            sessions: HashMap::new(),
            deliveries: JoinSet::new(),
        };
        (hub, HubHandle { sender })
    }

    /// Create a hub actor and spawn it on the current runtime.
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new();
        tokio::spawn(hub.run());
        handle
    }

    /// Run the hub event loop until every handle is dropped
    pub async fn run(mut self) {
        log::info!("Session hub starting");

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },

                Some(result) = self.deliveries.join_next() => {
                    self.handle_delivery(result);
                }
            }
        }

        // Let in-flight deliveries finish so the last broadcast isn't lost.
        while let Some(result) = self.deliveries.join_next().await {
            self.handle_delivery(result);
        }

        log::info!("Session hub stopped");
    }

    fn handle_message(&mut self, message: HubMessage) {
        match message {
            HubMessage::Register { record } => {
                log::info!("Session {} ({}) registered", record.id, record.name);
                self.sessions.insert(record.id, record);
            }

            HubMessage::Unregister { id } => {
                if let Some(record) = self.sessions.remove(&id) {
                    log::info!("Session {} ({}) unregistered", id, record.name);
                }
            }

            HubMessage::Broadcast { event } => self.broadcast(event),

            HubMessage::ListSessions { response } => {
                let mut sessions: Vec<_> =
                    self.sessions.values().map(SessionRecord::summary).collect();
                sessions.sort_by_key(|summary| summary.attached_at);
                let _ = response.send(sessions);
            }
        }
    }

    /// Spawn one delivery per registered program
    fn broadcast(&mut self, event: HubEvent) {
        self.sessions.retain(|id, record| {
            if record.inbox.is_closed() {
                log::debug!("Session {id} is gone, pruning");
                false
            } else {
                true
            }
        });

        log::debug!(
            "Broadcasting '{}' to {} session(s)",
            event,
            self.sessions.len()
        );
        for (&id, record) in &self.sessions {
            let inbox = record.inbox.clone();
            let event = SessionEvent::Hub(event.clone());
            self.deliveries.spawn(async move {
                match timeout(DELIVERY_TIMEOUT, inbox.send(event)).await {
                    Ok(Ok(())) => Delivery::Delivered,
                    Ok(Err(_)) => Delivery::Closed(id),
                    Err(_) => Delivery::TimedOut(id),
                }
            });
        }
    }

    fn handle_delivery(&mut self, result: std::result::Result<Delivery, JoinError>) {
        match result {
            Ok(Delivery::Delivered) => {}
            Ok(Delivery::Closed(id)) => {
                if let Some(record) = self.sessions.remove(&id) {
                    log::debug!("Session {} ({}) disconnected, pruning", id, record.name);
                }
            }
            Ok(Delivery::TimedOut(id)) => {
                log::warn!("Session {id} inbox full, dropping hub event");
            }
            Err(error) if error.is_panic() => {
                log::error!("Hub delivery task panicked: {error}");
            }
            Err(_) => {}
        }
    }
}
