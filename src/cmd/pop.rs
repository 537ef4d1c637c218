use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Pop one or more values off a list, from either end.
///
/// With no count, replies with a single bulk value (or nil if the list is
/// empty or missing). With an explicit count, always replies with an array
/// (nil if fewer elements are available than requested).
#[derive(Debug)]
pub(crate) struct Pop {
    key: String,
    count: Option<i64>,
    left: bool,
    valid: bool,
}

impl Pop {
    /// Format: `LPOP key [count]` / `RPOP key [count]`.
    pub(crate) fn parse_frames(parse: &mut Parse, left: bool) -> crate::Result<Pop> {
        let key = parse.next_string()?;
        let count = match parse.next_int() {
            Ok(n) => Some(n),
            Err(_) => None,
        };
        Ok(Pop { key, count, left, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.pop(Bytes::from(self.key), self.count, self.left).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_pop(&Bytes::from(self.key), self.count, self.left)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Pop {
    fn new_invalid() -> Pop {
        Pop { key: String::new(), count: None, left: true, valid: false }
    }
}
