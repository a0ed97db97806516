//! Session hub error types.

use thiserror::Error;

/// Errors returned by a [`super::HubHandle`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum HubError {
    /// The hub actor has stopped and can't take requests.
    #[error("session hub is closed")]
    Closed,
}

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, HubError>;
