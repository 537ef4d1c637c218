//! Error taxonomy for the store and its command handlers.
//!
//! Handlers return `Result<Frame, StoreError>`; the top-level dispatch
//! flattens the error branch into a `Frame::Error` with the appropriate
//! `ERR `/`WRONGTYPE `/`SYNTAX ` prefix already baked into the message.

use crate::Frame;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("{0}")]
    String(&'static str),
    #[error("{0}")]
    Owned(String),
}

impl StoreError {
    pub fn owned<T: Into<String>>(s: T) -> Self {
        StoreError::Owned(s.into())
    }
}

impl From<StoreError> for Frame {
    fn from(e: StoreError) -> Frame {
        Frame::Error(e.to_string())
    }
}

pub const WRONG_TYPE: StoreError =
    StoreError::String("WRONGTYPE Operation against a key holding the wrong kind of value");
pub const INVALID_EXPIRE_TIME: StoreError = StoreError::String("ERR invalid expire time");
