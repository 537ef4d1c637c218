use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse, ParseError};

/// Get the values of all the given keys.
///
/// Replies with a multi-bulk array; each missing key is represented by a
/// nil element rather than failing the whole command.
#[derive(Debug)]
pub(crate) struct Mget {
    keys: Vec<String>,
    valid: bool,
}

impl Mget {
    /// Format: `MGET key [key ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Mget> {
        let mut keys = vec![parse.next_string()?];
        loop {
            match parse.next_string() {
                Ok(s) => keys.push(s),
                Err(ParseError::EndOfStream) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Mget { keys, valid: true })
    }

    fn keys_bytes(&self) -> Vec<Bytes> {
        self.keys.iter().cloned().map(Bytes::from).collect()
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.mget(self.keys_bytes()).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store.cmd_mget(&self.keys_bytes()).unwrap_or_else(Into::into)
    }
}

impl Invalid for Mget {
    fn new_invalid() -> Mget {
        Mget { keys: Vec::new(), valid: false }
    }
}
