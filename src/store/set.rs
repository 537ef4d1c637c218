//! Set entity: an unordered collection of distinct byte strings.

use bytes::Bytes;
use std::collections::HashSet;

use crate::frame::Frame;

#[derive(Debug, Default)]
pub(crate) struct Set {
    members: HashSet<Bytes>,
}

impl Set {
    pub(crate) fn new() -> Set {
        Set::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the number of members that were not already present.
    pub(crate) fn add(&mut self, values: impl IntoIterator<Item = Bytes>) -> usize {
        let mut added = 0;
        for v in values {
            if self.members.insert(v) {
                added += 1;
            }
        }
        added
    }

    pub(crate) fn is_member(&self, value: &Bytes) -> bool {
        self.members.contains(value)
    }

    /// Returns the number of members actually removed.
    pub(crate) fn remove<'a>(&mut self, values: impl IntoIterator<Item = &'a Bytes>) -> usize {
        let mut removed = 0;
        for v in values {
            if self.members.remove(v) {
                removed += 1;
            }
        }
        removed
    }

    /// Reconstruction command: `SADD key m1 m2 ...`.
    pub(crate) fn to_cmd(&self, key: &Bytes) -> Frame {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from_static(b"SADD"));
        frame.push_bulk(key.clone());
        for m in &self.members {
            frame.push_bulk(m.clone());
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_dedupes() {
        let mut s = Set::new();
        let added = s.add([Bytes::from_static(b"a"), Bytes::from_static(b"b"), Bytes::from_static(b"a")]);
        assert_eq!(added, 2);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn remove_counts_only_present_members() {
        let mut s = Set::new();
        s.add([Bytes::from_static(b"a")]);
        let a = Bytes::from_static(b"a");
        let b = Bytes::from_static(b"b");
        assert_eq!(s.remove([&a, &b]), 1);
        assert!(!s.is_member(&a));
    }
}
