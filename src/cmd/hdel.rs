use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Remove one or more fields from a hash.
#[derive(Debug)]
pub(crate) struct Hdel {
    key: String,
    fields: Vec<Bytes>,
    valid: bool,
}

impl Hdel {
    /// Format: `HDEL key field [field ...]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hdel> {
        let key = parse.next_string()?;
        let mut fields = Vec::new();
        while let Ok(f) = parse.next_bytes() {
            fields.push(f);
        }
        if fields.is_empty() {
            return Ok(Hdel::new_invalid());
        }
        Ok(Hdel { key, fields, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.hdel(Bytes::from(self.key), self.fields).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_hdel(&Bytes::from(self.key), &self.fields)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Hdel {
    fn new_invalid() -> Hdel {
        Hdel { key: String::new(), fields: Vec::new(), valid: false }
    }
}
