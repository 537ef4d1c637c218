use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Push one or more values onto a list, from either end.
#[derive(Debug)]
pub(crate) struct Push {
    key: String,
    values: Vec<Bytes>,
    left: bool,
    valid: bool,
}

impl Push {
    /// Format: `LPUSH key value [value ...]` / `RPUSH key value [value ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse, left: bool) -> crate::Result<Push> {
        let key = parse.next_string()?;
        let mut values = Vec::new();
        while let Ok(v) = parse.next_bytes() {
            values.push(v);
        }
        if values.is_empty() {
            return Ok(Push::new_invalid());
        }
        Ok(Push { key, values, left, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.push(Bytes::from(self.key), self.values, self.left).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_push(Bytes::from(self.key), &self.values, self.left)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Push {
    fn new_invalid() -> Push {
        Push { key: String::new(), values: Vec::new(), left: true, valid: false }
    }
}
