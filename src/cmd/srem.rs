use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Remove one or more members from a set.
#[derive(Debug)]
pub(crate) struct Srem {
    key: String,
    members: Vec<Bytes>,
    valid: bool,
}

impl Srem {
    /// Format: `SREM key member [member ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Srem> {
        let key = parse.next_string()?;
        let mut members = Vec::new();
        while let Ok(m) = parse.next_bytes() {
            members.push(m);
        }
        if members.is_empty() {
            return Ok(Srem::new_invalid());
        }
        Ok(Srem { key, members, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.srem(Bytes::from(self.key), self.members).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_srem(&Bytes::from(self.key), &self.members)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Srem {
    fn new_invalid() -> Srem {
        Srem { key: String::new(), members: Vec::new(), valid: false }
    }
}
