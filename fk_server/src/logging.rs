//! Structured logging configuration.
//!
//! The `farkle` library logs through the `log` facade; the subscriber set
//! up here picks those records up alongside the server's own `tracing`
//! events.

use farkle::SessionId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var and default to `info`.
///
/// # Example
///
/// ```no_run
/// use fk_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a terminal session lifecycle event with structured data
///
/// # Arguments
///
/// * `event_type` - What happened (`attach`, `detach`, `rejected`, ...)
/// * `session_id` - Hub session, once registered
/// * `name` - Display name, once known
/// * `message` - Free-form detail, usually the peer address
///
/// # Example
///
/// ```
/// use fk_server::logging::log_session_event;
///
/// log_session_event("rejected", None, None, "127.0.0.1:50000: server full");
/// ```
pub fn log_session_event(
    event_type: &str,
    session_id: Option<SessionId>,
    name: Option<&str>,
    message: &str,
) {
    let session_id = session_id.map(|id| id.to_string());
    tracing::info!(
        event_type = event_type,
        session_id = session_id.as_deref(),
        name = name,
        "SESSION: {}",
        message
    );
}
