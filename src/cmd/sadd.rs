use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Add one or more members to a set, creating it if it doesn't exist.
#[derive(Debug)]
pub(crate) struct Sadd {
    key: String,
    members: Vec<Bytes>,
    valid: bool,
}

impl Sadd {
    /// Format: `SADD key member [member ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Sadd> {
        let key = parse.next_string()?;
        let mut members = Vec::new();
        while let Ok(m) = parse.next_bytes() {
            members.push(m);
        }
        if members.is_empty() {
            return Ok(Sadd::new_invalid());
        }
        Ok(Sadd { key, members, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.sadd(Bytes::from(self.key), self.members).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_sadd(Bytes::from(self.key), &self.members)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Sadd {
    fn new_invalid() -> Sadd {
        Sadd { key: String::new(), members: Vec::new(), valid: false }
    }
}
