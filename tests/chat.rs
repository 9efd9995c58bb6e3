use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, anyhow};
use multichat::channel::{DEFAULT_MAX_LINE_LEN, LineChannel, LineReader, LineWriter};
use multichat::config::ServerConfig;
use multichat::protocol::{NICKNAME_PROMPT, Rejection};
use multichat::registry::ClientRegistry;
use multichat::server::Server;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(200);

struct TestServer {
    addr: SocketAddr,
    registry: ClientRegistry,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Result<Self> {
        let config = ServerConfig {
            listen: "127.0.0.1:0".parse()?,
            ..ServerConfig::default()
        };
        let server = Server::bind(config).await?;
        let addr = server.local_addr()?;
        let registry = server.registry();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = server.run_until(shutdown).await;
        });

        Ok(Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

struct Participant {
    lines: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
}

impl Participant {
    async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (lines, writer) = LineChannel::from_tcp(stream, DEFAULT_MAX_LINE_LEN).into_split();
        let mut participant = Self { lines, writer };

        let prompt = participant.read_line("waiting for prompt").await?;
        assert_eq!(prompt, NICKNAME_PROMPT);
        Ok(participant)
    }

    async fn join(addr: SocketAddr, nickname: &str) -> Result<Self> {
        let mut participant = Self::connect(addr).await?;
        participant.send(nickname).await?;

        let joined = participant.read_line("waiting for own join").await?;
        if !joined.starts_with(&format!("{nickname} has joined")) {
            return Err(anyhow!("unexpected join line for {nickname}: {joined}"));
        }
        Ok(participant)
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        self.writer.write_line(line).await?;
        Ok(())
    }

    async fn next(&mut self, description: &str) -> Result<Option<String>> {
        match timeout(READ_TIMEOUT, self.lines.read_line()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(anyhow!("{description}: timed out")),
        }
    }

    async fn read_line(&mut self, description: &str) -> Result<String> {
        self.next(description)
            .await?
            .ok_or_else(|| anyhow!("{description}: stream closed"))
    }

    async fn assert_quiet(&mut self) {
        assert!(
            timeout(QUIET, self.lines.read_line()).await.is_err(),
            "expected no further lines"
        );
    }
}

#[tokio::test]
async fn alice_and_bob_chat_and_part() -> Result<()> {
    let server = TestServer::start().await?;

    let mut alice = Participant::join(server.addr, "alice").await?;
    let mut bob = Participant::join(server.addr, "bob").await?;
    assert_eq!(
        alice.read_line("alice sees bob join").await?,
        "bob has joined — now 2 connected"
    );

    alice.send("hi").await?;
    assert_eq!(bob.read_line("bob hears alice").await?, "[alice] hi");

    // A duplicate alice is turned away while the first one stays registered.
    let mut impostor = Participant::connect(server.addr).await?;
    impostor.send("alice").await?;
    assert_eq!(
        impostor.read_line("impostor rejection").await?,
        Rejection::NicknameTaken.line()
    );
    assert_eq!(impostor.next("impostor close").await?, None);
    assert_eq!(server.registry.len(), 2);
    assert!(server.registry.contains("alice"));

    // Alice never got her own line back, nor anything about the impostor.
    bob.send("hey").await?;
    assert_eq!(alice.read_line("alice hears bob").await?, "[bob] hey");

    bob.send("/quit").await?;
    assert_eq!(bob.next("bob closed").await?, None);
    assert_eq!(
        alice.read_line("alice sees bob leave").await?,
        "bob has left — now 1 connected"
    );
    assert!(!server.registry.contains("bob"));

    alice.send("still here").await?;
    alice.assert_quiet().await;

    server.stop().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_nickname_claims_have_one_winner() -> Result<()> {
    const CLAIMANTS: usize = 12;
    let server = TestServer::start().await?;

    let mut claimants = Vec::new();
    for _ in 0..CLAIMANTS {
        claimants.push(Participant::connect(server.addr).await?);
    }

    let attempts: Vec<_> = claimants
        .into_iter()
        .map(|mut claimant| {
            tokio::spawn(async move {
                claimant.send("zed").await?;
                let reply = claimant.read_line("claim reply").await?;
                Ok::<_, anyhow::Error>((reply, claimant))
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut rejected = 0;
    for attempt in attempts {
        let (reply, claimant) = attempt.await??;
        if reply == Rejection::NicknameTaken.line() {
            rejected += 1;
        } else {
            assert_eq!(reply, "zed has joined — now 1 connected");
            winners.push(claimant);
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(rejected, CLAIMANTS - 1);
    assert_eq!(server.registry.nicknames(), vec!["zed"]);

    winners[0].assert_quiet().await;

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn abrupt_disconnect_is_announced_once() -> Result<()> {
    let server = TestServer::start().await?;

    let mut alice = Participant::join(server.addr, "alice").await?;
    let bob = Participant::join(server.addr, "bob").await?;
    alice.read_line("alice sees bob join").await?;

    drop(bob);

    assert_eq!(
        alice.read_line("alice sees bob leave").await?,
        "bob has left — now 1 connected"
    );
    alice.assert_quiet().await;
    assert_eq!(server.registry.nicknames(), vec!["alice"]);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn silent_connection_leaves_no_trace() -> Result<()> {
    let server = TestServer::start().await?;

    let mut alice = Participant::join(server.addr, "alice").await?;
    let lurker = Participant::connect(server.addr).await?;
    drop(lurker);

    alice.assert_quiet().await;
    assert_eq!(server.registry.len(), 1);

    server.stop().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_sender_keeps_its_order() -> Result<()> {
    const LINES: usize = 25;
    let server = TestServer::start().await?;

    let mut carol = Participant::join(server.addr, "carol").await?;
    let alice = Participant::join(server.addr, "alice").await?;
    let bob = Participant::join(server.addr, "bob").await?;
    carol.read_line("carol sees alice join").await?;
    carol.read_line("carol sees bob join").await?;

    let senders: Vec<_> = [("alice", alice), ("bob", bob)]
        .into_iter()
        .map(|(name, mut sender)| {
            tokio::spawn(async move {
                for i in 0..LINES {
                    sender.send(&format!("{name} {i}")).await?;
                }
                Ok::<_, anyhow::Error>(sender)
            })
        })
        .collect();

    let mut next_alice = 0;
    let mut next_bob = 0;
    for _ in 0..(2 * LINES) {
        let line = carol.read_line("carol reads chat").await?;
        if line.starts_with("[alice]") {
            assert_eq!(line, format!("[alice] alice {next_alice}"));
            next_alice += 1;
        } else {
            assert_eq!(line, format!("[bob] bob {next_bob}"));
            next_bob += 1;
        }
    }

    assert_eq!((next_alice, next_bob), (LINES, LINES));

    // Keep the senders connected until every line has been checked.
    for sender in senders {
        sender.await??;
    }

    server.stop().await;
    Ok(())
}
