#![warn(missing_docs)]
//! # RouterOS-rs
//!
//! `routeros-rs` is an asynchronous Rust client for the MikroTik RouterOS API.
//! Many commands can be in flight at once on a single connection; each one gets its own
//! channel of replies.
//!
//! ## Features
//! - Plain TCP (port 8728) and TLS (port 8729) transports
//! - Both the current plain login and the pre-6.43 challenge-response login
//! - Tag-based multiplexing of concurrent commands over one session
//! - Cancellation of streaming commands by dropping their receiver
//! - Word-level debug trace through [`tracing`]
//! - Conversion of API words into CLI command lines
//!
//! ## Examples
//!
//! Basic usage:
//!
//! ```rust,no_run
//! use routeros_rs::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::dial("192.168.88.1:8728").await?;
//!     client.login("admin", "password").await?;
//!
//!     let mut replies = client
//!         .send_command("/interface/print", ["?type=ether", "=.proplist=name,mtu"])
//!         .await?;
//!     while let Some(reply) = replies.recv().await {
//!         let reply = reply.into_result()?;
//!         println!("{:?}", reply.data);
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Note
//!
//! This library requires the `tokio` runtime.

#[cfg(target_pointer_width = "16")]
compile_error!("This library supports 32-bit architectures or higher.");

mod actor;
/// Login handshake and challenge-response hashing.
pub mod auth;
mod client;
/// Session settings.
pub mod config;
/// Errors returned by client operations.
pub mod error;
/// Wire format of the RouterOS API: framing, words, sentences and replies.
pub mod protocol;
/// Session lifecycle.
pub mod session;
/// Debug trace of the words on the wire.
pub mod trace;
mod transport;

pub use client::Client;
pub use config::SessionConfig;
pub use error::{ClientError, ClientResult};
pub use protocol::normalize::normalize_to_command_line;
pub use protocol::{Reply, ReplyKind};
pub use session::SessionStatus;
