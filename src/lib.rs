//! Line-oriented multi-user chat over TCP.
//!
//! - [`channel`] frames a byte stream into newline-terminated UTF-8 lines.
//! - [`registry`] maps nicknames to live sessions; [`broadcast`] fans a line
//!   out over it.
//! - [`session`] runs the per-connection protocol: prompt, register, relay,
//!   tear down.
//! - [`server`] accepts connections and spawns a session task for each.
//! - [`client`] is the terminal companion: one task prints server lines while
//!   the caller forwards local input.

pub mod broadcast;
pub mod channel;
pub mod cli;
pub mod client;
pub mod config;
pub mod logging;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
