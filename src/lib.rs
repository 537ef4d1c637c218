//! A small Redis-compatible, single-node, in-memory key-value store: RESP
//! wire codec, an actor-style executor owning the key space, and an
//! append-only file for durability.

pub mod config;
pub mod metrics;
pub mod server;

mod aof;
mod cmd;
mod connection;
mod error;
mod executor;
mod frame;
mod parse;
mod shutdown;
mod store;
mod utils;

pub use connection::Connection;
pub use frame::Frame;

use cmd::Command;

use parse::{Parse, ParseError};
use shutdown::Shutdown;

/// Default port the server listens on if none is configured.
pub const DEFAULT_PORT: &str = "6379";

/// Error returned by most fallible functions in this crate.
///
/// A boxed `std::error::Error` is sufficient here: most errors are either
/// protocol-level parse failures or I/O errors, and none of them are on a
/// path hot enough to justify avoiding the allocation.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
