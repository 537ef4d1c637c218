//! The in-memory key space: the tagged value map, the expiry index, and one
//! handler per supported command.
//!
//! `Store` is only ever driven from the executor task (see `crate::executor`)
//! so every method below takes `&mut self` freely, with no internal locking.

mod expiry;
mod hash;
mod list;
mod set;
mod zset;

use bytes::Bytes;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{StoreError, INVALID_EXPIRE_TIME, WRONG_TYPE};
use crate::frame::Frame;
use expiry::ExpiryIndex;
use hash::Hash;
use list::List;
use set::Set;
use zset::ZSet;

/// A stored value, tagged by the Redis data type it represents.
#[derive(Debug)]
pub(crate) enum Value {
    String(Bytes),
    List(List),
    Set(Set),
    Hash(Hash),
    ZSet(ZSet),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
            Value::ZSet(_) => "zset",
        }
    }

    fn to_cmd(&self, key: &Bytes) -> Frame {
        match self {
            Value::String(v) => {
                let mut frame = Frame::array();
                frame.push_bulk(Bytes::from_static(b"SET"));
                frame.push_bulk(key.clone());
                frame.push_bulk(v.clone());
                frame
            }
            Value::List(l) => l.to_cmd(key),
            Value::Set(s) => s.to_cmd(key),
            Value::Hash(h) => h.to_cmd(key),
            Value::ZSet(z) => z.to_cmd(key),
        }
    }
}

pub(crate) fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    data: HashMap<Bytes, Value>,
    expires: HashMap<Bytes, i64>,
    expiry_index: ExpiryIndex,
}

type Reply = Result<Frame, StoreError>;

impl Store {
    pub(crate) fn new() -> Store {
        Store::default()
    }

    /// If `key` has an expiry that has elapsed, purge it (key, expiry entry,
    /// time-wheel membership) so every command observes a "no dead keys"
    /// view. Called before any command that references a key.
    pub(crate) fn expire_preprocess(&mut self, key: &Bytes) {
        if let Some(&ts) = self.expires.get(key) {
            if ts <= now_unix() {
                self.purge(key, ts);
            }
        }
    }

    fn purge(&mut self, key: &Bytes, ts: i64) {
        self.data.remove(key);
        self.expires.remove(key);
        self.expiry_index.remove(ts, key);
    }

    /// Periodic sweep: reclaim every key expired at or before `now`.
    pub(crate) fn gc(&mut self) {
        let now = now_unix();
        let mut reclaimed = 0i64;
        for key in self.expiry_index.range(i64::MIN, now) {
            if let Some(&ts) = self.expires.get(&key) {
                self.purge(&key, ts);
                reclaimed += 1;
            }
        }
        if reclaimed > 0 {
            crate::metrics::REMOVED_EXPIRED_KEY_COUNTER.inc_by(reclaimed as u64);
        }
    }

    /// Drops any existing TTL on `key`, used whenever a command overwrites a
    /// key's value wholesale and must not let a stale expiry survive onto
    /// the new value.
    fn clear_expiry(&mut self, key: &Bytes) {
        if let Some(ts) = self.expires.remove(key) {
            self.expiry_index.remove(ts, key);
        }
    }

    fn set_expire_at(&mut self, key: &Bytes, ts: i64) {
        if !self.data.contains_key(key) {
            return;
        }
        if let Some(&old) = self.expires.get(key) {
            self.expiry_index.remove(old, key);
        }
        self.expires.insert(key.clone(), ts);
        self.expiry_index.add(ts, key.clone());
    }

    fn get_as_list(&mut self, key: &Bytes) -> Result<Option<&mut List>, StoreError> {
        match self.data.get_mut(key) {
            Some(Value::List(l)) => Ok(Some(l)),
            Some(_) => Err(WRONG_TYPE),
            None => Ok(None),
        }
    }

    fn get_as_set(&mut self, key: &Bytes) -> Result<Option<&mut Set>, StoreError> {
        match self.data.get_mut(key) {
            Some(Value::Set(s)) => Ok(Some(s)),
            Some(_) => Err(WRONG_TYPE),
            None => Ok(None),
        }
    }

    fn get_as_hash(&mut self, key: &Bytes) -> Result<Option<&mut Hash>, StoreError> {
        match self.data.get_mut(key) {
            Some(Value::Hash(h)) => Ok(Some(h)),
            Some(_) => Err(WRONG_TYPE),
            None => Ok(None),
        }
    }

    fn get_as_zset(&mut self, key: &Bytes) -> Result<Option<&mut ZSet>, StoreError> {
        match self.data.get_mut(key) {
            Some(Value::ZSet(z)) => Ok(Some(z)),
            Some(_) => Err(WRONG_TYPE),
            None => Ok(None),
        }
    }

    fn get_as_string(&self, key: &Bytes) -> Result<Option<&Bytes>, StoreError> {
        match self.data.get(key) {
            Some(Value::String(v)) => Ok(Some(v)),
            Some(_) => Err(WRONG_TYPE),
            None => Ok(None),
        }
    }

    // -- commands --------------------------------------------------------

    pub(crate) fn cmd_get(&self, args: &[Bytes]) -> Reply {
        match self.get_as_string(&args[0])? {
            Some(v) => Ok(Frame::Bulk(v.clone())),
            None => Ok(Frame::Null),
        }
    }

    pub(crate) fn cmd_mget(&mut self, args: &[Bytes]) -> Reply {
        let mut frame = Frame::array();
        for key in args {
            self.expire_preprocess(key);
            match self.get_as_string(key) {
                Ok(Some(v)) => frame.push_bulk(v.clone()),
                Ok(None) => frame = push_null(frame),
                Err(_) => frame = push_null(frame),
            }
        }
        Ok(frame)
    }

    /// `SET key value [NX] [EX seconds]`. `expire_at`, if present, is
    /// already resolved to an absolute unix timestamp by the caller (see
    /// `cmd::Set`) rather than a relative duration, so it means the same
    /// instant whether it's applied now or replayed from the AOF later.
    pub(crate) fn cmd_set(
        &mut self,
        key: Bytes,
        value: Bytes,
        nx: bool,
        expire_at: Option<i64>,
    ) -> Reply {
        if let Some(at) = expire_at {
            if at <= now_unix() {
                return Err(INVALID_EXPIRE_TIME);
            }
        }

        if nx && self.data.contains_key(&key) {
            return Ok(Frame::Null);
        }

        self.data.insert(key.clone(), Value::String(value));
        self.clear_expiry(&key);
        if let Some(at) = expire_at {
            self.set_expire_at(&key, at);
        }

        Ok(Frame::Integer(1))
    }

    pub(crate) fn cmd_mset(&mut self, pairs: &[Bytes]) -> Reply {
        if pairs.len() % 2 != 0 {
            return Err(StoreError::owned("SYNTAX wrong number of arguments for 'mset' command"));
        }
        for chunk in pairs.chunks(2) {
            self.data
                .insert(chunk[0].clone(), Value::String(chunk[1].clone()));
            self.clear_expiry(&chunk[0]);
        }
        Ok(Frame::Integer((pairs.len() / 2) as i64))
    }

    pub(crate) fn cmd_push(&mut self, key: Bytes, values: &[Bytes], left: bool) -> Reply {
        if self.get_as_list(&key)?.is_none() {
            self.data.insert(key.clone(), Value::List(List::new()));
        }
        let list = match self.data.get_mut(&key) {
            Some(Value::List(l)) => l,
            _ => unreachable!("just inserted a List"),
        };
        if left {
            list.push_left(values.iter().cloned());
        } else {
            list.push_right(values.iter().cloned());
        }
        Ok(Frame::Integer(list.len() as i64))
    }

    pub(crate) fn cmd_pop(&mut self, key: &Bytes, count: Option<i64>, left: bool) -> Reply {
        let with_explicit_count = count.is_some();
        let count = match count {
            Some(c) if c < 1 => {
                return Err(StoreError::owned("SYNTAX value is out of range, must be positive"))
            }
            Some(c) => c as usize,
            None => 1,
        };

        let list = match self.get_as_list(key)? {
            Some(l) => l,
            None => return Ok(Frame::Null),
        };

        let popped = if left { list.pop_left(count) } else { list.pop_right(count) };
        let popped = match popped {
            Some(p) => p,
            None => return Ok(Frame::Null),
        };

        if list.is_empty() {
            self.data.remove(key);
        }

        if !with_explicit_count {
            return Ok(Frame::Bulk(popped.into_iter().next().unwrap()));
        }

        Ok(bulk_array(popped))
    }

    pub(crate) fn cmd_lrange(&mut self, key: &Bytes, start: i64, stop: i64) -> Reply {
        let list = match self.get_as_list(key)? {
            Some(l) => l,
            None => return Ok(Frame::NullArray),
        };
        Ok(bulk_array(list.range(start, stop)))
    }

    pub(crate) fn cmd_sadd(&mut self, key: Bytes, members: &[Bytes]) -> Reply {
        if self.get_as_set(&key)?.is_none() {
            self.data.insert(key.clone(), Value::Set(Set::new()));
        }
        let set = match self.data.get_mut(&key) {
            Some(Value::Set(s)) => s,
            _ => unreachable!("just inserted a Set"),
        };
        Ok(Frame::Integer(set.add(members.iter().cloned()) as i64))
    }

    pub(crate) fn cmd_sismember(&mut self, key: &Bytes, member: &Bytes) -> Reply {
        match self.get_as_set(key)? {
            Some(s) => Ok(Frame::Integer(s.is_member(member) as i64)),
            None => Ok(Frame::Integer(0)),
        }
    }

    pub(crate) fn cmd_srem(&mut self, key: &Bytes, members: &[Bytes]) -> Reply {
        let set = match self.get_as_set(key)? {
            Some(s) => s,
            None => return Ok(Frame::Integer(0)),
        };
        let removed = set.remove(members.iter());
        if set.is_empty() {
            self.data.remove(key);
        }
        Ok(Frame::Integer(removed as i64))
    }

    pub(crate) fn cmd_hset(&mut self, key: Bytes, pairs: &[Bytes]) -> Reply {
        if pairs.len() % 2 != 0 {
            return Err(StoreError::owned("SYNTAX wrong number of arguments for 'hset' command"));
        }
        if self.get_as_hash(&key)?.is_none() {
            self.data.insert(key.clone(), Value::Hash(Hash::new()));
        }
        let hash = match self.data.get_mut(&key) {
            Some(Value::Hash(h)) => h,
            _ => unreachable!("just inserted a Hash"),
        };
        let written = hash.put(
            pairs
                .chunks(2)
                .map(|c| (c[0].clone(), c[1].clone())),
        );
        Ok(Frame::Integer(written as i64))
    }

    pub(crate) fn cmd_hget(&mut self, key: &Bytes, field: &Bytes) -> Reply {
        match self.get_as_hash(key)? {
            Some(h) => match h.get(field) {
                Some(v) => Ok(Frame::Bulk(v.clone())),
                None => Ok(Frame::Null),
            },
            None => Ok(Frame::Null),
        }
    }

    pub(crate) fn cmd_hdel(&mut self, key: &Bytes, fields: &[Bytes]) -> Reply {
        let hash = match self.get_as_hash(key)? {
            Some(h) => h,
            None => return Ok(Frame::Integer(0)),
        };
        let removed = hash.remove(fields.iter());
        if hash.is_empty() {
            self.data.remove(key);
        }
        Ok(Frame::Integer(removed as i64))
    }

    pub(crate) fn cmd_zadd(&mut self, key: Bytes, pairs: &[(f64, Bytes)]) -> Reply {
        if self.get_as_zset(&key)?.is_none() {
            self.data.insert(key.clone(), Value::ZSet(ZSet::new()));
        }
        let zset = match self.data.get_mut(&key) {
            Some(Value::ZSet(z)) => z,
            _ => unreachable!("just inserted a ZSet"),
        };
        for (score, member) in pairs {
            zset.insert(member.clone(), *score);
        }
        Ok(Frame::Integer(pairs.len() as i64))
    }

    pub(crate) fn cmd_zrangebyscore(&mut self, key: &Bytes, min: f64, max: f64) -> Reply {
        let zset = match self.get_as_zset(key)? {
            Some(z) => z,
            None => return Ok(Frame::NullArray),
        };
        let members: Vec<Bytes> = zset
            .range_by_score(min, max)
            .into_iter()
            .map(|(_, m)| m)
            .collect();
        if members.is_empty() {
            return Ok(Frame::NullArray);
        }
        Ok(bulk_array(members))
    }

    pub(crate) fn cmd_zrem(&mut self, key: &Bytes, members: &[Bytes]) -> Reply {
        let zset = match self.get_as_zset(key)? {
            Some(z) => z,
            None => return Ok(Frame::Integer(0)),
        };
        let mut removed = 0;
        for m in members {
            if zset.remove(m) {
                removed += 1;
            }
        }
        if zset.is_empty() {
            self.data.remove(key);
        }
        Ok(Frame::Integer(removed))
    }

    pub(crate) fn cmd_expire(&mut self, key: &Bytes, at: i64) -> Reply {
        if !self.data.contains_key(key) {
            return Ok(Frame::Integer(0));
        }
        self.set_expire_at(key, at);
        Ok(Frame::Integer(1))
    }

    /// All keys currently present in the forked/live store, for AOF rewrite.
    /// Each yielded item is the reconstruction command for one key, plus an
    /// `EXPIREAT` if the key carries an expiry that has not already elapsed.
    pub(crate) fn for_each_cmd(&self, now: i64, mut f: impl FnMut(Frame)) {
        for (key, value) in &self.data {
            if let Some(&ts) = self.expires.get(key) {
                if ts <= now {
                    continue;
                }
            }
            f(value.to_cmd(key));
            if let Some(&ts) = self.expires.get(key) {
                let mut frame = Frame::array();
                frame.push_bulk(Bytes::from_static(b"EXPIREAT"));
                frame.push_bulk(key.clone());
                frame.push_bulk(Bytes::from(ts.to_string()));
                f(frame);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn type_name_for_test(&self, key: &Bytes) -> Option<&'static str> {
        self.data.get(key).map(Value::type_name)
    }
}

fn bulk_array(items: Vec<Bytes>) -> Frame {
    let mut frame = Frame::array();
    for item in items {
        frame.push_bulk(item);
    }
    frame
}

fn push_null(mut frame: Frame) -> Frame {
    if let Frame::Array(ref mut vec) = frame {
        vec.push(Frame::Null);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, None).unwrap();
        assert!(matches!(store.cmd_get(&[b("a")]).unwrap(), Frame::Bulk(v) if v == b("1")));
    }

    #[test]
    fn set_nx_on_existing_key_returns_nil() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, None).unwrap();
        let reply = store.cmd_set(b("a"), b("2"), true, None).unwrap();
        assert!(matches!(reply, Frame::Null));
        assert!(matches!(store.cmd_get(&[b("a")]).unwrap(), Frame::Bulk(v) if v == b("1")));
    }

    #[test]
    fn set_rejects_an_expire_at_in_the_past() {
        let mut store = Store::new();
        assert!(store.cmd_set(b("a"), b("1"), false, Some(now_unix() - 1)).is_err());
    }

    #[test]
    fn set_with_future_expire_at_installs_it_verbatim() {
        let mut store = Store::new();
        let at = now_unix() + 1000;
        store.cmd_set(b("a"), b("1"), false, Some(at)).unwrap();
        assert_eq!(store.expires.get(&b("a")), Some(&at));
    }

    #[test]
    fn mset_clears_a_preexisting_expiry() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, Some(now_unix() + 1000)).unwrap();
        store.cmd_mset(&[b("a"), b("2")]).unwrap();
        assert_eq!(store.expires.get(&b("a")), None);
        assert!(matches!(store.cmd_get(&[b("a")]).unwrap(), Frame::Bulk(v) if v == b("2")));
    }

    #[test]
    fn wrong_type_on_list_op_against_string() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, None).unwrap();
        let err = store.cmd_push(b("a"), &[b("x")], true).unwrap_err();
        assert_eq!(err.to_string(), WRONG_TYPE.to_string());
    }

    #[test]
    fn lpop_fewer_than_count_is_nil() {
        let mut store = Store::new();
        store.cmd_push(b("l"), &[b("z"), b("y"), b("x")], true).unwrap();
        let reply = store.cmd_pop(&b("l"), Some(10), true).unwrap();
        assert!(matches!(reply, Frame::Null));
    }

    #[test]
    fn expire_preprocess_purges_dead_key() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, None).unwrap();
        store.set_expire_at(&b("a"), now_unix() - 1);
        store.expire_preprocess(&b("a"));
        assert!(matches!(store.cmd_get(&[b("a")]).unwrap(), Frame::Null));
    }

    #[test]
    fn gc_sweeps_every_expired_key() {
        let mut store = Store::new();
        store.cmd_set(b("a"), b("1"), false, None).unwrap();
        store.cmd_set(b("b"), b("1"), false, None).unwrap();
        store.set_expire_at(&b("a"), now_unix() - 10);
        store.gc();
        assert!(store.type_name_for_test(&b("a")).is_none());
        assert!(store.type_name_for_test(&b("b")).is_some());
    }
}
