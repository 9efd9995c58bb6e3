use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::channel::LineChannel;
use crate::config::ServerConfig;
use crate::peer::SessionId;
use crate::registry::ClientRegistry;
use crate::session::ClientSession;

pub struct Server {
    listener: TcpListener,
    registry: ClientRegistry,
    config: Arc<ServerConfig>,
    next_id: AtomicU64,
}

impl Server {
    /// Binds the listener. A bind failure is fatal and is returned as is.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.listen))?;

        Ok(Self::with_registry(listener, ClientRegistry::new(), config))
    }

    /// Serves on an already bound listener with a caller-provided registry.
    pub fn with_registry(
        listener: TcpListener,
        registry: ClientRegistry,
        config: ServerConfig,
    ) -> Self {
        Self {
            listener,
            registry,
            config: Arc::new(config),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> ClientRegistry {
        self.registry.clone()
    }

    /// Accepts connections until `shutdown` completes. Sessions already
    /// running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(
                        connected = self.registry.len(),
                        nicknames = ?self.registry.nicknames(),
                        "server shutting down"
                    );
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => self.spawn_session(socket, peer),
                    Err(err) => warn!(error = %err, "failed to accept connection"),
                },
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to install ctrl-c handler");
            }
        })
        .await
    }

    fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn spawn_session(&self, socket: TcpStream, peer: SocketAddr) {
        let id = self.next_id();
        let session = ClientSession::new(
            id,
            LineChannel::from_tcp(socket, self.config.max_line_len),
            self.registry.clone(),
            self.config.outbox_capacity,
        );

        info!(session = id, %peer, "connection accepted");

        tokio::spawn(async move {
            match session.run().await {
                Ok(outcome) => info!(session = id, %peer, ?outcome, "disconnected"),
                Err(err) => warn!(session = id, %peer, error = %err, "connection error"),
            }
        });
    }
}
