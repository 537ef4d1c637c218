use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Add one or more `score member` pairs to a sorted set, creating it if it
/// doesn't exist. Replies with the count of submitted pairs, not just the
/// count of newly-added members.
#[derive(Debug)]
pub(crate) struct Zadd {
    key: String,
    pairs: Vec<(f64, Bytes)>,
    valid: bool,
}

impl Zadd {
    /// Format: `ZADD key score member [score member ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Zadd> {
        let key = parse.next_string()?;
        let mut pairs = Vec::new();
        loop {
            let score = match parse.next_float() {
                Ok(s) => s,
                Err(_) => break,
            };
            let member = parse.next_bytes()?;
            pairs.push((score, member));
        }
        if pairs.is_empty() {
            return Ok(Zadd::new_invalid());
        }
        Ok(Zadd { key, pairs, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.zadd(Bytes::from(self.key), self.pairs).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_zadd(Bytes::from(self.key), &self.pairs)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Zadd {
    fn new_invalid() -> Zadd {
        Zadd { key: String::new(), pairs: Vec::new(), valid: false }
    }
}
