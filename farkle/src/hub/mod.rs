//! Server-side registry of attached interactive programs.
//!
//! This module implements:
//! - SessionHub: actor owning the registry
//! - HubHandle: cloneable handle for register/unregister/broadcast
//! - Lazy pruning of programs whose inbox has closed
//!
//! ## Example
//!
//! ```no_run
//! use farkle::hub::{HubEvent, SessionHub};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = SessionHub::spawn();
//!     let (inbox, _events) = mpsc::channel(64);
//!     hub.register("carol".into(), inbox).unwrap();
//!     hub.broadcast(HubEvent::ConnectionMessage("carol".into())).unwrap();
//! }
//! ```

pub mod actor;
pub mod errors;
pub mod messages;

pub use actor::{HubHandle, SessionHub};
pub use errors::HubError;
pub use messages::{HubEvent, SessionId, SessionRecord, SessionSummary};
