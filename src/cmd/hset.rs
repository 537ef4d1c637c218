use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Set one or more `field value` pairs in the hash at `key`, creating it if
/// it doesn't exist.
#[derive(Debug)]
pub(crate) struct Hset {
    key: String,
    pairs: Vec<Bytes>,
    valid: bool,
}

impl Hset {
    /// Format: `HSET key field value [field value ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hset> {
        let key = parse.next_string()?;
        let mut pairs = Vec::new();
        while let Ok(field) = parse.next_bytes() {
            let value = parse.next_bytes()?;
            pairs.push(field);
            pairs.push(value);
        }
        if pairs.is_empty() {
            return Ok(Hset::new_invalid());
        }
        Ok(Hset { key, pairs, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.hset(Bytes::from(self.key), self.pairs).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_hset(Bytes::from(self.key), &self.pairs)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Hset {
    fn new_invalid() -> Hset {
        Hset { key: String::new(), pairs: Vec::new(), valid: false }
    }
}
