//! Accept loop for remote terminals.

use farkle::{HubHandle, SessionHub};
use log::{error, info, warn};
use std::{future::Future, io, net::SocketAddr, sync::Arc};
use tokio::{
    io::AsyncWriteExt,
    net::TcpListener,
    sync::Semaphore,
    task::JoinSet,
};

use crate::{config::ServerConfig, logging::log_session_event, terminal::handle_terminal};

pub const SERVER_FULL: &str = "Server is full, try again later\r\n";

/// A bound terminal server with its own session hub.
pub struct Server {
    listener: TcpListener,
    hub: HubHandle,
    config: Arc<ServerConfig>,
    /// One permit per attached terminal
    permits: Arc<Semaphore>,
}

impl Server {
    /// Binds the listener and starts the hub.
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind).await?;
        let permits = Arc::new(Semaphore::new(config.max_sessions));
        Ok(Self {
            listener,
            hub: SessionHub::spawn(),
            config: Arc::new(config),
            permits,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn hub(&self) -> HubHandle {
        self.hub.clone()
    }

    /// Accepts terminals until `shutdown` resolves, then drops every
    /// attached terminal.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        let mut shutdown = std::pin::pin!(shutdown);
        let mut terminals = JoinSet::new();
        let mut ordinal = 0usize;

        info!(
            "Accepting terminals on {} (game server at {})",
            self.local_addr()?,
            self.config.game_addr
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = self.listener.accept() => {
                    let (mut stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(error) => {
                            warn!("Failed to accept terminal: {error}");
                            continue;
                        }
                    };
                    ordinal += 1;

                    let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                        log_session_event("rejected", None, None, &format!("{peer}: server full"));
                        terminals.spawn(async move {
                            let _ = stream.write_all(SERVER_FULL.as_bytes()).await;
                            let _ = stream.shutdown().await;
                        });
                        continue;
                    };

                    let hub = self.hub.clone();
                    let config = Arc::clone(&self.config);
                    terminals.spawn(async move {
                        let _permit = permit;
                        if let Err(error) = handle_terminal(stream, peer, ordinal, hub, config).await {
                            warn!("Terminal {peer} failed: {error}");
                        }
                    });
                }

                Some(result) = terminals.join_next() => {
                    if let Err(error) = result {
                        if error.is_panic() {
                            error!("Terminal task panicked: {error}");
                        }
                    }
                }
            }
        }

        info!("Shutting down, dropping {} terminal(s)", terminals.len());
        terminals.shutdown().await;
        Ok(())
    }
}
