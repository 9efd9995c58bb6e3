use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    ClientConfig, DEFAULT_ADDR, DEFAULT_MAX_LINE_LEN, DEFAULT_OUTBOX_CAPACITY,
    DEFAULT_PROMPT_WAIT_MS, ServerConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat server.
    Server(ServerArgs),
    /// Connect to a chat server from this terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Socket address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub listen: SocketAddr,

    /// Lines queued per client before broadcasts to it start being dropped.
    #[arg(long, default_value_t = DEFAULT_OUTBOX_CAPACITY)]
    pub outbox_capacity: usize,

    /// Longest line in bytes a client may send before it is disconnected.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    pub max_line_len: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the chat server.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub server: SocketAddr,

    /// Nickname to register with. Read from the first input line if omitted.
    #[arg(long)]
    pub nickname: Option<String>,

    /// Longest wait for the server's nickname prompt, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_PROMPT_WAIT_MS)]
    pub prompt_wait_ms: u64,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            listen: args.listen,
            outbox_capacity: args.outbox_capacity,
            max_line_len: args.max_line_len,
        }
    }
}

impl From<ClientArgs> for ClientConfig {
    fn from(args: ClientArgs) -> Self {
        Self {
            server: args.server,
            nickname: args.nickname,
            prompt_wait: Duration::from_millis(args.prompt_wait_ms),
            ..ClientConfig::default()
        }
    }
}
