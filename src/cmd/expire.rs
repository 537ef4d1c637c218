use bytes::Bytes;

use crate::cmd::Invalid;
use crate::executor::ExecutorHandle;
use crate::store::{now_unix, Store};
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Set a key's time to live. Backs both `EXPIRE` (relative seconds) and
/// `EXPIREAT` (absolute unix timestamp).
#[derive(Debug)]
pub(crate) struct Expire {
    key: String,
    at: i64,
    valid: bool,
}

impl Expire {
    /// Format: `EXPIRE key seconds`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Expire> {
        let key = parse.next_string()?;
        let seconds = parse.next_int()?;
        Ok(Expire { key, at: now_unix() + seconds, valid: true })
    }

    /// Format: `EXPIREAT key unix_timestamp`.
    pub(crate) fn parse_frames_at(parse: &mut Parse) -> crate::Result<Expire> {
        let key = parse.next_string()?;
        let at = parse.next_int()?;
        Ok(Expire { key, at, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.expire(Bytes::from(self.key), self.at).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_expire(&Bytes::from(self.key), self.at)
            .unwrap_or_else(Into::into)
    }

    /// `self.at` is already the absolute unix timestamp this command
    /// installs, whether it arrived as `EXPIRE key seconds` (resolved at
    /// parse time in `parse_frames`) or `EXPIREAT key unix-seconds`. The
    /// AOF always logs the `EXPIREAT` form so replay doesn't re-resolve a
    /// relative `EXPIRE` against the replay-time clock.
    pub(crate) fn aof_frame(&self) -> Frame {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from_static(b"EXPIREAT"));
        frame.push_bulk(Bytes::from(self.key.clone()));
        frame.push_bulk(Bytes::from(self.at.to_string()));
        frame
    }
}

impl Invalid for Expire {
    fn new_invalid() -> Expire {
        Expire { key: String::new(), at: 0, valid: false }
    }
}
