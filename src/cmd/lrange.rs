use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Return the elements of a list between `start` and `stop`, inclusive.
///
/// Negative indices count from the end of the list, `-1` being the last
/// element.
#[derive(Debug)]
pub(crate) struct Lrange {
    key: String,
    start: i64,
    stop: i64,
    valid: bool,
}

impl Lrange {
    /// Format: `LRANGE key start stop`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Lrange> {
        let key = parse.next_string()?;
        let start = parse.next_int()?;
        let stop = parse.next_int()?;
        Ok(Lrange { key, start, stop, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.lrange(Bytes::from(self.key), self.start, self.stop).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_lrange(&Bytes::from(self.key), self.start, self.stop)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Lrange {
    fn new_invalid() -> Lrange {
        Lrange { key: String::new(), start: 0, stop: 0, valid: false }
    }
}
