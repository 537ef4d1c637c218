use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::Store;
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Return the members of a sorted set whose score falls within
/// `[min, max]`, ordered by score ascending.
#[derive(Debug)]
pub(crate) struct Zrangebyscore {
    key: String,
    min: f64,
    max: f64,
    valid: bool,
}

impl Zrangebyscore {
    /// Format: `ZRANGEBYSCORE key min max`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Zrangebyscore> {
        let key = parse.next_string()?;
        let min = parse.next_float()?;
        let max = parse.next_float()?;
        Ok(Zrangebyscore { key, min, max, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.zrangebyscore(Bytes::from(self.key), self.min, self.max).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_zrangebyscore(&Bytes::from(self.key), self.min, self.max)
            .unwrap_or_else(Into::into)
    }
}

impl Invalid for Zrangebyscore {
    fn new_invalid() -> Zrangebyscore {
        Zrangebyscore { key: String::new(), min: 0.0, max: 0.0, valid: false }
    }
}
