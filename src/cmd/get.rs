use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Get the value of key.
///
/// If the key does not exist the special value nil is returned. An error is
/// returned if the value stored at key is not a string.
#[derive(Debug)]
pub(crate) struct Get {
    key: String,
    valid: bool,
}

impl Get {
    /// Format: `GET key`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Get> {
        let key = parse.next_string()?;
        Ok(Get { key, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.get(Bytes::from(self.key)).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_get(&[Bytes::from(self.key)])
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Get {
    fn new_invalid() -> Get {
        Get { key: String::new(), valid: false }
    }
}
