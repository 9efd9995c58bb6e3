//! Per-connection protocol.
//!
//! A session prompts for a nickname, registers it, relays chat lines to the
//! other sessions and cleans up after itself no matter how the connection
//! ends. Teardown runs on every exit path, including I/O errors, and the
//! leave announcement is only sent by the session whose removal actually
//! took the registry entry out.

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::broadcast;
use crate::channel::LineChannel;
use crate::peer::{SessionHandle, SessionId};
use crate::protocol::{self, Rejection};
use crate::registry::ClientRegistry;

/// Lifecycle of a session. States are declared in the only order a session
/// may pass through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Connected,
    AwaitingNickname,
    Active,
    Disconnected,
}

/// How a session ended when no I/O error was involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    ClosedBeforeNickname,
    Rejected(Rejection),
    Quit,
    PeerClosed,
}

pub struct ClientSession<R, W> {
    id: SessionId,
    channel: LineChannel<R, W>,
    registry: ClientRegistry,
    outbox_capacity: usize,
    nickname: Option<String>,
    state: SessionState,
}

impl<R, W> ClientSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        id: SessionId,
        channel: LineChannel<R, W>,
        registry: ClientRegistry,
        outbox_capacity: usize,
    ) -> Self {
        Self {
            id,
            channel,
            registry,
            outbox_capacity,
            nickname: None,
            state: SessionState::Connected,
        }
    }

    pub async fn run(mut self) -> Result<SessionOutcome> {
        self.enter(SessionState::AwaitingNickname);

        let result = self.serve().await;

        // Cleanup on every exit path
        self.teardown().await;

        result
    }

    fn enter(&mut self, next: SessionState) {
        debug_assert!(
            next > self.state,
            "session {} cannot go from {:?} to {:?}",
            self.id,
            self.state,
            next
        );
        debug!(session = self.id, from = ?self.state, to = ?next, "session state change");
        self.state = next;
    }

    async fn serve(&mut self) -> Result<SessionOutcome> {
        self.channel.write_line(protocol::NICKNAME_PROMPT).await?;

        let Some(candidate) = self.channel.read_line().await? else {
            debug!(session = self.id, "closed before sending a nickname");
            return Ok(SessionOutcome::ClosedBeforeNickname);
        };

        let nickname = match protocol::parse_nickname(&candidate) {
            Ok(name) => name.to_string(),
            Err(rejection) => return self.reject(rejection).await,
        };

        let (handle, outbox) = SessionHandle::new(self.id, self.outbox_capacity);
        if !self.registry.try_register(&nickname, handle) {
            return self.reject(Rejection::NicknameTaken).await;
        }

        self.nickname = Some(nickname.clone());
        self.enter(SessionState::Active);

        let connected = self.registry.len();
        info!(session = self.id, nickname = %nickname, connected, "client joined");
        broadcast(
            &self.registry,
            &protocol::joined_line(&nickname, connected),
            None,
        );

        self.relay(&nickname, outbox).await
    }

    async fn reject(&mut self, rejection: Rejection) -> Result<SessionOutcome> {
        info!(session = self.id, reason = ?rejection, "nickname rejected");
        self.channel.write_line(rejection.line()).await?;

        Ok(SessionOutcome::Rejected(rejection))
    }

    async fn relay(
        &mut self,
        nickname: &str,
        mut outbox: mpsc::Receiver<String>,
    ) -> Result<SessionOutcome> {
        let (reader, writer) = self.channel.halves();

        loop {
            tokio::select! {
                // Branch A: a broadcast queued for this session
                Some(line) = outbox.recv() => {
                    writer.write_line(&line).await?;
                }

                // Branch B: the client sent a line
                read = reader.read_line() => {
                    match read? {
                        Some(line) if protocol::is_quit(&line) => {
                            return Ok(SessionOutcome::Quit);
                        }

                        Some(line) => {
                            debug!(session = self.id, nickname, text = %line, "chat");
                            broadcast(
                                &self.registry,
                                &protocol::chat_line(nickname, &line),
                                Some(nickname),
                            );
                        }

                        None => return Ok(SessionOutcome::PeerClosed),
                    }
                }
            }
        }
    }

    async fn teardown(&mut self) {
        self.enter(SessionState::Disconnected);

        if let Err(err) = self.channel.close().await {
            debug!(session = self.id, error = %err, "channel close failed");
        }

        let Some(nickname) = self.nickname.take() else {
            return;
        };

        if let Some(handle) = self.registry.remove(&nickname) {
            debug_assert_eq!(handle.id(), self.id, "removed another session's entry");
            let connected = self.registry.len();
            info!(session = self.id, nickname = %nickname, connected, "client left");
            broadcast(&self.registry, &protocol::left_line(&nickname, connected), None);
        }
    }
}
