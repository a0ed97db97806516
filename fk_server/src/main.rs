//! Farkle terminal-session server.
//!
//! Accepts remote terminals, attaches one interactive program per terminal
//! and relays decisions to the game-logic process.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use fk_server::{Server, ServerConfig, logging};
use log::{error, info};
use pico_args::Arguments;

const HELP: &str = "\
Run a Farkle terminal-session server

USAGE:
  fk_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT     Terminal socket bind address  [default: env SERVER_BIND or 127.0.0.1:6161]
  --game-addr     HOST:PORT   Game-logic process address    [default: env GAME_ADDR or localhost:4121]
  --max-sessions  N           Terminals attached at once     [default: env MAX_SESSIONS or 16]

FLAGS:
  -h, --help                  Print help information

ENVIRONMENT:
  SERVER_BIND                 Terminal socket bind address
  GAME_ADDR                   Game-logic process address
  MAX_SESSIONS                Terminals attached at once
  CONNECT_TIMEOUT_SECS        Seconds to wait when dialing the game-logic process
  CHANNEL_CAPACITY            Frames buffered per connection
  SESSION_INBOX_CAPACITY      Events buffered per player
  RUST_LOG                    Log filter (e.g. info, fk_server=debug)
  (A .env file in the working directory is loaded first)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs
        .opt_value_from_str("--bind")
        .context("Invalid --bind address")?;
    let game_addr: Option<String> = pargs
        .opt_value_from_str("--game-addr")
        .context("Invalid --game-addr")?;
    let max_sessions: Option<usize> = pargs
        .opt_value_from_str("--max-sessions")
        .context("Invalid --max-sessions")?;

    logging::init();

    let config = ServerConfig::from_env(bind, game_addr, max_sessions)
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let bind = config.bind;
    info!("Starting Farkle server at {bind}");
    let server = Server::bind(config)
        .await
        .with_context(|| format!("Failed to bind to {bind}"))?;

    info!("Server is running. Press Ctrl+C to stop.");
    server
        .run(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {error}");
        std::future::pending::<()>().await;
    }
}
