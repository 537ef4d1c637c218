//! List entity backed by a `VecDeque`, giving O(1) push/pop from either end.

use bytes::Bytes;
use std::collections::VecDeque;

use crate::frame::Frame;

#[derive(Debug, Default)]
pub(crate) struct List {
    items: VecDeque<Bytes>,
}

impl List {
    pub(crate) fn new() -> List {
        List::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn push_left(&mut self, values: impl IntoIterator<Item = Bytes>) {
        for v in values {
            self.items.push_front(v);
        }
    }

    pub(crate) fn push_right(&mut self, values: impl IntoIterator<Item = Bytes>) {
        for v in values {
            self.items.push_back(v);
        }
    }

    pub(crate) fn pop_left(&mut self, count: usize) -> Option<Vec<Bytes>> {
        if self.items.len() < count {
            return None;
        }
        Some(self.items.drain(..count).collect())
    }

    pub(crate) fn pop_right(&mut self, count: usize) -> Option<Vec<Bytes>> {
        if self.items.len() < count {
            return None;
        }
        let start = self.items.len() - count;
        let mut popped: Vec<Bytes> = self.items.drain(start..).collect();
        popped.reverse();
        Some(popped)
    }

    /// `[start, stop]` inclusive, zero-based, negative indices count from
    /// the end (`-1` is the last element). Out-of-range bounds clamp rather
    /// than error; a fully out-of-range window returns an empty `Vec`.
    pub(crate) fn range(&self, start: i64, stop: i64) -> Vec<Bytes> {
        let len = self.items.len() as i64;
        if len == 0 {
            return Vec::new();
        }

        let norm = |i: i64| -> i64 {
            if i < 0 {
                (len + i).max(0)
            } else {
                i
            }
        };

        let start = norm(start).min(len - 1).max(0);
        let stop = norm(stop).min(len - 1);

        if stop < start {
            return Vec::new();
        }

        self.items
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect()
    }

    /// Reconstruction command: `RPUSH key e1 e2 ...` in list order.
    pub(crate) fn to_cmd(&self, key: &Bytes) -> Frame {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from_static(b"RPUSH"));
        frame.push_bulk(key.clone());
        for item in &self.items {
            frame.push_bulk(item.clone());
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_right_then_range_full() {
        let mut l = List::new();
        l.push_right([Bytes::from_static(b"x"), Bytes::from_static(b"y"), Bytes::from_static(b"z")]);
        assert_eq!(
            l.range(0, -1),
            vec![Bytes::from_static(b"x"), Bytes::from_static(b"y"), Bytes::from_static(b"z")]
        );
    }

    #[test]
    fn pop_left_fewer_than_count_returns_none() {
        let mut l = List::new();
        l.push_right([Bytes::from_static(b"x")]);
        assert_eq!(l.pop_left(2), None);
    }

    #[test]
    fn pop_right_returns_tail_first() {
        let mut l = List::new();
        l.push_right([Bytes::from_static(b"x"), Bytes::from_static(b"y"), Bytes::from_static(b"z")]);
        assert_eq!(
            l.pop_right(2),
            Some(vec![Bytes::from_static(b"z"), Bytes::from_static(b"y")])
        );
    }

    #[test]
    fn range_out_of_bounds_is_empty() {
        let mut l = List::new();
        l.push_right([Bytes::from_static(b"x")]);
        assert_eq!(l.range(5, 10), Vec::<Bytes>::new());
    }
}
