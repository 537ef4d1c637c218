//! Time-bucketed expiry index.
//!
//! Maps expiry second to the set of keys due to expire at or before that
//! second. Backed by a `BTreeMap` so a sweep only has to range-scan the
//! populated buckets instead of walking every key in the store.

use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct ExpiryIndex {
    buckets: BTreeMap<i64, HashSet<Bytes>>,
}

impl ExpiryIndex {
    pub(crate) fn new() -> ExpiryIndex {
        ExpiryIndex::default()
    }

    /// Record that `key` expires at `ts` (unix seconds).
    pub(crate) fn add(&mut self, ts: i64, key: Bytes) {
        self.buckets.entry(ts).or_default().insert(key);
    }

    /// Remove `key` from the bucket it was filed under.
    pub(crate) fn remove(&mut self, ts: i64, key: &Bytes) {
        if let Some(bucket) = self.buckets.get_mut(&ts) {
            bucket.remove(key);
            if bucket.is_empty() {
                self.buckets.remove(&ts);
            }
        }
    }

    /// Keys filed in buckets `lo..=hi`. Returns an owned snapshot so callers
    /// may purge the store and this index without fighting iterator
    /// invalidation.
    pub(crate) fn range(&self, lo: i64, hi: i64) -> Vec<Bytes> {
        self.buckets
            .range(lo..=hi)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_returns_keys_at_or_before_bound() {
        let mut idx = ExpiryIndex::new();
        idx.add(10, Bytes::from_static(b"a"));
        idx.add(20, Bytes::from_static(b"b"));
        idx.add(30, Bytes::from_static(b"c"));

        let mut due = idx.range(0, 20);
        due.sort();
        assert_eq!(due, vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
    }

    #[test]
    fn remove_drops_empty_bucket() {
        let mut idx = ExpiryIndex::new();
        idx.add(10, Bytes::from_static(b"a"));
        idx.remove(10, &Bytes::from_static(b"a"));
        assert!(idx.buckets.is_empty());
    }
}
