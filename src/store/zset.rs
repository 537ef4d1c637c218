//! Sorted-set entity: a probabilistic skip list ordered by `(score, member)`.
//!
//! Classic skip list shape (p=1/4, max level 32) but addressed as an arena of
//! nodes (`Vec<Node>`, forward pointers are `Option<usize>` indices) rather
//! than a graph of `Rc<RefCell<_>>`/`Arc<RwLock<_>>` nodes. The store is only
//! ever touched from the single executor task that owns it, so there is no
//! shared-ownership problem to solve here.

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::frame::Frame;

const MAX_LEVEL: usize = 32;
const P: f64 = 0.25;

#[derive(Debug)]
struct Node {
    score: f64,
    member: Bytes,
    forward: Vec<Option<usize>>,
}

/// Sorted set: skip list ordered by `(score asc, member asc)`, plus a
/// member → score index for O(1) score lookup and dedup on re-insert.
#[derive(Debug)]
pub(crate) struct ZSet {
    arena: Vec<Node>,
    head: Vec<Option<usize>>,
    level: usize,
    scores: HashMap<Bytes, f64>,
    rng: SmallRng,
}

impl Default for ZSet {
    fn default() -> ZSet {
        ZSet::new()
    }
}

impl ZSet {
    pub(crate) fn new() -> ZSet {
        ZSet {
            arena: Vec::new(),
            head: vec![None; MAX_LEVEL],
            level: 1,
            scores: HashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.scores.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn random_level(&mut self) -> usize {
        let mut lvl = 1;
        while lvl < MAX_LEVEL && self.rng.gen::<f64>() < P {
            lvl += 1;
        }
        lvl
    }

    fn less(&self, a_score: f64, a_member: &Bytes, b_score: f64, b_member: &Bytes) -> bool {
        (a_score, a_member) < (b_score, b_member)
    }

    /// Insert or update `member` with `score`. Returns `true` if this created
    /// a new member, `false` if it replaced an existing member's score.
    pub(crate) fn insert(&mut self, member: Bytes, score: f64) -> bool {
        if let Some(&old_score) = self.scores.get(&member) {
            if old_score == score {
                return false;
            }
            self.remove_node(&member, old_score);
            self.insert_node(member.clone(), score);
            self.scores.insert(member, score);
            return false;
        }

        self.insert_node(member.clone(), score);
        self.scores.insert(member, score);
        true
    }

    fn insert_node(&mut self, member: Bytes, score: f64) {
        let mut update: Vec<Option<usize>> = vec![None; MAX_LEVEL];
        let mut cur_idx: Option<usize> = None;
        for i in (0..self.level).rev() {
            let mut node = cur_idx.and_then(|c| self.arena[c].forward[i]).or(if cur_idx.is_none() { self.head[i] } else { None });
            loop {
                let next = match node {
                    Some(n) => n,
                    None => break,
                };
                let nref = &self.arena[next];
                if self.less(nref.score, &nref.member, score, &member) {
                    node = nref.forward[i];
                    cur_idx = Some(next);
                } else {
                    break;
                }
            }
            update[i] = cur_idx;
        }

        let new_level = self.random_level();
        if new_level > self.level {
            self.level = new_level;
        }

        let idx = self.arena.len();
        self.arena.push(Node {
            score,
            member,
            forward: vec![None; new_level],
        });

        for i in 0..new_level {
            match update[i] {
                Some(prev) => {
                    self.arena[idx].forward[i] = self.arena[prev].forward[i];
                    self.arena[prev].forward[i] = Some(idx);
                }
                None => {
                    self.arena[idx].forward[i] = self.head[i];
                    self.head[i] = Some(idx);
                }
            }
        }
    }

    fn remove_node(&mut self, member: &Bytes, score: f64) {
        let mut update: Vec<Option<usize>> = vec![None; MAX_LEVEL];
        let mut cur_idx: Option<usize> = None;

        for i in (0..self.level).rev() {
            let mut node = cur_idx.and_then(|c| self.arena[c].forward[i]).or(if cur_idx.is_none() { self.head[i] } else { None });
            loop {
                let next = match node {
                    Some(n) => n,
                    None => break,
                };
                let nref = &self.arena[next];
                if self.less(nref.score, &nref.member, score, member) {
                    node = nref.forward[i];
                    cur_idx = Some(next);
                } else {
                    break;
                }
            }
            update[i] = cur_idx;
        }

        let target = match cur_idx.and_then(|c| self.arena[c].forward[0]).or(self.head[0]) {
            Some(t) if &self.arena[t].member == member && self.arena[t].score == score => t,
            _ => return,
        };

        let target_levels = self.arena[target].forward.len();
        for i in 0..target_levels {
            match update[i] {
                Some(prev) => {
                    self.arena[prev].forward[i] = self.arena[target].forward[i];
                }
                None => {
                    self.head[i] = self.arena[target].forward[i];
                }
            }
        }

        while self.level > 1 && self.head[self.level - 1].is_none() {
            self.level -= 1;
        }
        // `target` is left as a tombstone in the arena; it is unreachable
        // from `head`/`forward` chains and carries no further cost beyond
        // the `Vec` slot, a deliberate trade against implementing a free
        // list for a structure the executor rebuilds wholesale on AOF
        // replay far more often than it mutates in place.
    }

    /// Remove `member`. Returns `true` if it was present.
    pub(crate) fn remove(&mut self, member: &Bytes) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.remove_node(member, score);
                true
            }
            None => false,
        }
    }

    pub(crate) fn score(&self, member: &Bytes) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Members with `min <= score <= max`, ascending `(score, member)`.
    pub(crate) fn range_by_score(&self, min: f64, max: f64) -> Vec<(f64, Bytes)> {
        let mut out = Vec::new();
        let mut node = self.head[0];
        while let Some(idx) = node {
            let n = &self.arena[idx];
            if n.score > max {
                break;
            }
            if n.score >= min {
                out.push((n.score, n.member.clone()));
            }
            node = n.forward[0];
        }
        out
    }

    /// Reconstruction command: `ZADD key score1 member1 score2 member2 ...`
    /// in ascending `(score, member)` order.
    pub(crate) fn to_cmd(&self, key: &Bytes) -> Frame {
        let mut frame = Frame::array();
        frame.push_bulk(Bytes::from_static(b"ZADD"));
        frame.push_bulk(key.clone());

        let mut node = self.head[0];
        while let Some(idx) = node {
            let n = &self.arena[idx];
            frame.push_bulk(Bytes::from(format!("{}", n.score)));
            frame.push_bulk(n.member.clone());
            node = n.forward[0];
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_orders_by_score_then_member() {
        let mut z = ZSet::new();
        assert!(z.insert(Bytes::from_static(b"c"), 3.0));
        assert!(z.insert(Bytes::from_static(b"a"), 1.0));
        assert!(z.insert(Bytes::from_static(b"b"), 2.0));

        let all = z.range_by_score(f64::MIN, f64::MAX);
        assert_eq!(
            all,
            vec![
                (1.0, Bytes::from_static(b"a")),
                (2.0, Bytes::from_static(b"b")),
                (3.0, Bytes::from_static(b"c")),
            ]
        );
    }

    #[test]
    fn reinsert_updates_score_without_duplicating() {
        let mut z = ZSet::new();
        assert!(z.insert(Bytes::from_static(b"a"), 1.0));
        assert!(!z.insert(Bytes::from_static(b"a"), 5.0));
        assert_eq!(z.len(), 1);
        assert_eq!(z.score(&Bytes::from_static(b"a")), Some(5.0));
    }

    #[test]
    fn remove_drops_member() {
        let mut z = ZSet::new();
        z.insert(Bytes::from_static(b"a"), 1.0);
        z.insert(Bytes::from_static(b"b"), 2.0);
        assert!(z.remove(&Bytes::from_static(b"a")));
        assert!(!z.remove(&Bytes::from_static(b"a")));
        assert_eq!(z.range_by_score(f64::MIN, f64::MAX), vec![(2.0, Bytes::from_static(b"b"))]);
    }

    #[test]
    fn range_by_score_is_inclusive() {
        let mut z = ZSet::new();
        z.insert(Bytes::from_static(b"a"), 1.0);
        z.insert(Bytes::from_static(b"b"), 2.0);
        z.insert(Bytes::from_static(b"c"), 3.0);
        assert_eq!(
            z.range_by_score(1.0, 2.0),
            vec![(1.0, Bytes::from_static(b"a")), (2.0, Bytes::from_static(b"b"))]
        );
    }
}
