use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, bail};

pub use crate::channel::DEFAULT_MAX_LINE_LEN;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8090";
pub const DEFAULT_OUTBOX_CAPACITY: usize = 512;
pub const DEFAULT_PROMPT_WAIT_MS: u64 = 500;

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8090))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to. Port 0 picks an ephemeral port.
    pub listen: SocketAddr,

    /// Lines a session may have queued before further broadcasts to it are
    /// dropped.
    pub outbox_capacity: usize,

    /// Longest line, in bytes, a client may send. A longer one ends its
    /// session.
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_addr(),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.outbox_capacity == 0 {
            bail!("outbox_capacity must be greater than 0");
        }
        if self.max_line_len == 0 {
            bail!("max_line_len must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,

    /// Sent as the nickname line; when unset the first input line is used.
    pub nickname: Option<String>,

    /// Upper bound on how long to wait for the server's prompt before
    /// sending the nickname anyway.
    pub prompt_wait: Duration,

    /// How long the receiver may keep draining after the send loop ends.
    pub shutdown_grace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_addr(),
            nickname: None,
            prompt_wait: Duration::from_millis(DEFAULT_PROMPT_WAIT_MS),
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(nick) = &self.nickname {
            if nick.trim().is_empty() {
                bail!("nickname cannot be empty");
            }
            if nick.contains('\n') {
                bail!("nickname cannot contain a newline");
            }
        }

        Ok(())
    }
}
