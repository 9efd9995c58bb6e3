//! Terminal client: a receiver task prints whatever the server sends while
//! the calling task forwards local input lines.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::channel::{DEFAULT_MAX_LINE_LEN, LineChannel, LineReader, LineWriter};
use crate::config::ClientConfig;
use crate::protocol;

/// Line-oriented output shared by the receiver task and the sender.
pub struct Console<O> {
    out: Arc<Mutex<O>>,
}

impl<O> Clone for Console<O> {
    fn clone(&self) -> Self {
        Self {
            out: Arc::clone(&self.out),
        }
    }
}

impl<O: AsyncWrite + Unpin> Console<O> {
    pub fn new(out: O) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    pub async fn print_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await
    }
}

/// Connects to `config.server` and chats over stdin/stdout.
pub async fn connect(config: ClientConfig) -> Result<()> {
    config.validate()?;

    let stream = TcpStream::connect(config.server)
        .await
        .with_context(|| format!("failed to connect to {}", config.server))?;

    let console = Console::new(tokio::io::stdout());
    console
        .print_line(&format!("connected to chat server at {}", config.server))
        .await?;

    run(
        LineChannel::from_tcp(stream, DEFAULT_MAX_LINE_LEN),
        read_stdin_lines(),
        console,
        &config,
    )
    .await
}

/// Forwards stdin lines from a plain thread. A blocking stdin read cannot be
/// cancelled, so it must not live on the runtime or it would hold up exit.
fn read_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    rx
}

/// Drives one chat session over `channel`, reading local lines from `input`.
///
/// Returns once the user quits, `input` closes, or the server goes away. The
/// receiver task gets `config.shutdown_grace` to drain after that and is
/// aborted if it is still running.
pub async fn run<R, W, O>(
    channel: LineChannel<R, W>,
    mut input: mpsc::Receiver<String>,
    console: Console<O>,
    config: &ClientConfig,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (reader, mut writer) = channel.into_split();
    let (prompt_tx, prompt_rx) = oneshot::channel();
    let mut receiver = tokio::spawn(receive(reader, console.clone(), prompt_tx));

    // Wait for the nickname prompt, but not forever
    if timeout(config.prompt_wait, prompt_rx).await.is_err() {
        debug!("no prompt from server yet, sending nickname anyway");
    }

    let result = converse(&mut writer, &mut input, &console, &mut receiver, config).await;
    let receiver_done = matches!(result, Ok(true));

    if let Err(err) = writer.close().await {
        debug!(error = %err, "closing connection failed");
    }

    if !receiver_done && timeout(config.shutdown_grace, &mut receiver).await.is_err() {
        debug!("receiver still running after shutdown grace, aborting");
        receiver.abort();
    }

    console.print_line("chat ended").await?;

    result.map(|_| ())
}

/// The send side. `Ok(true)` means it stopped because the receiver finished.
async fn converse<W, O>(
    writer: &mut LineWriter<W>,
    input: &mut mpsc::Receiver<String>,
    console: &Console<O>,
    receiver: &mut JoinHandle<()>,
    config: &ClientConfig,
) -> Result<bool>
where
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    let nickname = match &config.nickname {
        Some(nickname) => nickname.clone(),
        None => tokio::select! {
            _ = &mut *receiver => return Ok(true),
            line = input.recv() => match line {
                Some(line) => line,
                None => return Ok(false),
            },
        },
    };

    if let Err(err) = writer.write_line(&nickname).await {
        warn!(error = %err, "failed to send nickname");
        return Ok(false);
    }

    console
        .print_line(&format!(
            "chat started (type {} to leave)",
            protocol::QUIT_KEYWORD
        ))
        .await?;
    console.print_line(&"-".repeat(50)).await?;

    loop {
        tokio::select! {
            _ = &mut *receiver => return Ok(true),

            line = input.recv() => match line {
                Some(line) if protocol::is_quit(&line) => {
                    if let Err(err) = writer.write_line(protocol::QUIT_KEYWORD).await {
                        debug!(error = %err, "failed to send quit");
                    }
                    return Ok(false);
                }

                Some(line) if line.trim().is_empty() => continue,

                Some(line) => {
                    if let Err(err) = writer.write_line(&line).await {
                        warn!(error = %err, "failed to send line");
                        return Ok(false);
                    }
                }

                None => return Ok(false),
            },
        }
    }
}

async fn receive<R, O>(mut reader: LineReader<R>, console: Console<O>, prompt: oneshot::Sender<()>)
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut prompt = Some(prompt);

    loop {
        match reader.read_line().await {
            Ok(Some(line)) => {
                if let Err(err) = console.print_line(&line).await {
                    warn!(error = %err, "failed to print server line");
                    break;
                }
                if let Some(tx) = prompt.take() {
                    let _ = tx.send(());
                }
            }

            Ok(None) => break,

            Err(err) => {
                debug!(error = %err, "read from server failed");
                break;
            }
        }
    }

    let _ = console.print_line("disconnected from server").await;
}
