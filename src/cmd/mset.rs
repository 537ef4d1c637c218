use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse, ParseError};

/// Set multiple `key value` pairs in a single call.
#[derive(Debug)]
pub(crate) struct Mset {
    pairs: Vec<Bytes>,
    valid: bool,
}

impl Mset {
    /// Format: `MSET key value [key value ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Mset> {
        let mut pairs = Vec::new();
        loop {
            match parse.next_bytes() {
                Ok(b) => pairs.push(b),
                Err(ParseError::EndOfStream) => break,
                Err(e) => return Err(e.into()),
            }
        }
        if pairs.is_empty() || pairs.len() % 2 != 0 {
            return Ok(Mset::new_invalid());
        }
        Ok(Mset { pairs, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.mset(self.pairs).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store.cmd_mset(&self.pairs).unwrap_or_else(Into::into)
    }
}

impl Invalid for Mset {
    fn new_invalid() -> Mset {
        Mset { pairs: Vec::new(), valid: false }
    }
}
