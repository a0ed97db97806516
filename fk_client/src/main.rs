//! A Farkle client TUI.
//!
//! The client dials the game-logic process directly and plays as a single
//! local player.

use anyhow::{Context, Result};
use farkle::{SessionConfig, TransportSession, Username};
use fk_client::tui_app::TuiApp;
use pico_args::Arguments;
use std::sync::Arc;

const HELP: &str = "\
Play Farkle from your terminal

USAGE:
  fk_client [OPTIONS]

OPTIONS:
  --game-addr HOST:PORT   Game-logic process address  [default: localhost:4121]
  --name NAME             Display name                [default: $USER]

FLAGS:
  -h, --help              Print help information
";

struct Args {
    game_addr: String,
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        game_addr: pargs
            .opt_value_from_str("--game-addr")
            .context("Invalid --game-addr")?
            .unwrap_or_else(|| "localhost:4121".to_string()),
        name: pargs
            .opt_value_from_str("--name")
            .context("Invalid --name")?
            .unwrap_or_else(whoami::username),
    };

    let username = Username::new(&args.name);
    let config = SessionConfig::default();
    let client = Arc::new(TransportSession::new(config.transport));

    let terminal = ratatui::init();
    let result = TuiApp::new(username, args.game_addr)
        .run(client, config, terminal)
        .await;
    ratatui::restore();
    result
}
