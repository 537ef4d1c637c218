//! Hash entity: a field → value mapping.

use bytes::Bytes;
use std::collections::HashMap;

use crate::frame::Frame;

#[derive(Debug, Default)]
pub(crate) struct Hash {
    fields: HashMap<Bytes, Bytes>,
}

impl Hash {
    pub(crate) fn new() -> Hash {
        Hash::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sets `field, value` pairs. Returns the number of pairs written.
    pub(crate) fn put(&mut self, pairs: impl IntoIterator<Item = (Bytes, Bytes)>) -> usize {
        let mut written = 0;
        for (field, value) in pairs {
            self.fields.insert(field, value);
            written += 1;
        }
        written
    }

    pub(crate) fn get(&self, field: &Bytes) -> Option<&Bytes> {
        self.fields.get(field)
    }

    /// Returns the number of fields actually removed.
    pub(crate) fn remove<'a>(&mut self, fields: impl IntoIterator<Item = &'a Bytes>) -> usize {
        let mut removed = 0;
        for f in fields {
            if self.fields.remove(f).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Reconstruction command: `HSET key f1 v1 f2 v2 ...`.
    pub(crate) fn to_cmd(&self, key: &Bytes) -> Frame {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from_static(b"HSET"));
        frame.push_bulk(key.clone());
        for (field, value) in &self.fields {
            frame.push_bulk(field.clone());
            frame.push_bulk(value.clone());
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_existing_field() {
        let mut h = Hash::new();
        h.put([(Bytes::from_static(b"f"), Bytes::from_static(b"1"))]);
        h.put([(Bytes::from_static(b"f"), Bytes::from_static(b"2"))]);
        assert_eq!(h.get(&Bytes::from_static(b"f")), Some(&Bytes::from_static(b"2")));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn remove_counts_only_present_fields() {
        let mut h = Hash::new();
        h.put([(Bytes::from_static(b"f"), Bytes::from_static(b"1"))]);
        let f = Bytes::from_static(b"f");
        let g = Bytes::from_static(b"g");
        assert_eq!(h.remove([&f, &g]), 1);
    }
}
