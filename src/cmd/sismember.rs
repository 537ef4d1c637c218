use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Test whether `member` belongs to the set at `key`.
#[derive(Debug)]
pub(crate) struct Sismember {
    key: String,
    member: Bytes,
    valid: bool,
}

impl Sismember {
    /// Format: `SISMEMBER key member`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Sismember> {
        let key = parse.next_string()?;
        let member = parse.next_bytes()?;
        Ok(Sismember { key, member, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.sismember(Bytes::from(self.key), self.member).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_sismember(&Bytes::from(self.key), &self.member)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Sismember {
    fn new_invalid() -> Sismember {
        Sismember { key: String::new(), member: Bytes::new(), valid: false }
    }
}
