use tokio::sync::mpsc;
use tracing::debug;

pub type SessionId = u64;

/// What the registry holds for a session: its id and the sending side of
/// its outbox. The session itself drains the outbox into its channel.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: SessionId,
    outbox: mpsc::Sender<String>,
}

impl SessionHandle {
    pub fn new(id: SessionId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbox, rx) = mpsc::channel(capacity);

        (Self { id, outbox }, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues a line without waiting. Returns false if the line was dropped
    /// because the session is gone or too far behind.
    pub fn send<S: Into<String>>(&self, line: S) -> bool {
        match self.outbox.try_send(line.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(session = self.id, "outbox full, dropping line");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
