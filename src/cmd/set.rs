use bytes::Bytes;

use crate::cmd::{AofTemplate, Invalid, ParseError};
use crate::executor::ExecutorHandle;
use crate::store::{now_unix, Store};
use crate::utils::resp_invalid_arguments;
use crate::{Frame, Parse};

/// Set `key` to hold the string `value`.
///
/// If `key` already holds a value, it is overwritten, regardless of its
/// type, and any previous TTL is discarded.
///
/// # Options
///
/// * `NX` -- only set the key if it does not already exist.
/// * `EX seconds` -- set the specified expire time, in seconds.
#[derive(Debug)]
pub(crate) struct Set {
    key: String,
    value: Bytes,
    nx: bool,
    /// `EX seconds` resolved to an absolute unix timestamp at the moment
    /// this command was parsed, not a relative duration. Relative seconds
    /// would mean something different depending on when they're replayed;
    /// resolving once here, and reusing the same value for both the live
    /// apply and the AOF log entry (see `aof_template`), is what lets
    /// `EXPIREAT` in the persisted log restore the exact original instant.
    expire_at: Option<i64>,
    valid: bool,
}

impl Set {
    /// Format: `SET key value [NX] [EX seconds]`.
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Set> {
        use ParseError::EndOfStream;

        let key = parse.next_string()?;
        let value = parse.next_bytes()?;

        let mut nx = false;
        let mut ex_secs = None;

        loop {
            match parse.next_string() {
                Ok(s) if s.eq_ignore_ascii_case("NX") => nx = true,
                Ok(s) if s.eq_ignore_ascii_case("EX") => {
                    ex_secs = Some(parse.next_int()?);
                }
                Ok(_) => return Err("SYNTAX only NX and EX are supported by SET".into()),
                Err(EndOfStream) => break,
                Err(e) => return Err(e.into()),
            }
        }

        let expire_at = ex_secs.map(|secs| now_unix() + secs);

        Ok(Set { key, value, nx, expire_at, valid: true })
    }

    pub(crate) async fn apply(self, exec: &ExecutorHandle) -> crate::Result<Frame> {
        if !self.valid {
            return Ok(resp_invalid_arguments());
        }
        exec.set(Bytes::from(self.key), self.value, self.nx, self.expire_at).await
    }

    pub(crate) fn apply_direct(self, store: &mut Store) -> Frame {
        if !self.valid {
            return resp_invalid_arguments();
        }
        store
            .cmd_set(Bytes::from(self.key), self.value, self.nx, self.expire_at)
            .unwrap_or_else(Into::into)
    }

    /// Builds the AOF entries for this command: a plain `SET key value [NX]`
    /// (the `EX seconds` clause is stripped, since replaying it later would
    /// re-resolve against the replay-time clock) plus, if this command
    /// carried an expiry, a candidate `EXPIREAT key <absolute>` to append
    /// only when the set actually took effect. `NX` is preserved verbatim
    /// so a no-op replays as a no-op against the same pre-existing key.
    pub(crate) fn aof_template(&self) -> AofTemplate {
        let mut set_frame = Frame::array();
        set_frame.push_bulk(Bytes::from_static(b"SET"));
        set_frame.push_bulk(Bytes::from(self.key.clone()));
        set_frame.push_bulk(self.value.clone());
        if self.nx {
            set_frame.push_bulk(Bytes::from_static(b"NX"));
        }

        let expireat_frame = self.expire_at.map(|at| {
            let mut frame = Frame::array();
            frame.push_bulk(Bytes::from_static(b"EXPIREAT"));
            frame.push_bulk(Bytes::from(self.key.clone()));
            frame.push_bulk(Bytes::from(at.to_string()));
            frame
        });

        AofTemplate::SetWithExpire { set_frame, expireat_frame }
    }
}

impl Invalid for Set {
    fn new_invalid() -> Set {
        Set {
            key: String::new(),
            value: Bytes::new(),
            nx: false,
            expire_at: None,
            valid: false,
        }
    }
}
