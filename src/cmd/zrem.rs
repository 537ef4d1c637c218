use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Remove one or more members from a sorted set.
#[derive(Debug)]
pub(crate) struct Zrem {
    key: String,
    members: Vec<Bytes>,
    valid: bool,
}

impl Zrem {
    /// Format: `ZREM key member [member ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Zrem> {
        let key = parse.next_string()?;
        let mut members = Vec::new();
        while let Ok(m) = parse.next_bytes() {
            members.push(m);
        }
        if members.is_empty() {
            return Ok(Zrem::new_invalid());
        }
        Ok(Zrem { key, members, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.zrem(Bytes::from(self.key), self.members).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_zrem(&Bytes::from(self.key), &self.members)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Zrem {
    fn new_invalid() -> Zrem {
        Zrem { key: String::new(), members: Vec::new(), valid: false }
    }
}
