use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Get the value of a single field in a hash.
#[derive(Debug)]
pub(crate) struct Hget {
    key: String,
    field: Bytes,
    valid: bool,
}

impl Hget {
    /// Format: `HGET key field`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hget> {
        let key = parse.next_string()?;
        let field = parse.next_bytes()?;
        Ok(Hget { key, field, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.hget(Bytes::from(self.key), self.field).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_hget(&Bytes::from(self.key), &self.field)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Hget {
    fn new_invalid() -> Hget {
        Hget { key: String::new(), field: Bytes::new(), valid: false }
    }
}
