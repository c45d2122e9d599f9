//! Sliding-window retention filter.
//!
//! While one sample's heterozygous calls stream past, [`EvidenceWindow`]
//! keeps every call that satisfies a predicate together with up to `W/2`
//! neighbours on each side, without buffering more than `W` calls.
//!
//! Boundaries are centred: a call is evaluated as soon as `W/2` calls have
//! arrived after it, so the first calls of a stream are evaluated against
//! a window that is truncated on the left. Calls in the last `W/2`
//! positions are never centred; [`EvidenceWindow::finalize`] evaluates them
//! and keeps their left context plus everything after them.

use crate::genotype::GenotypeRecord;
use std::collections::VecDeque;

/// Decides whether an item is worth keeping with its context.
pub trait Retain<T> {
    fn retain(&self, item: &T) -> bool;
}

/// Keeps records whose score is present and below the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowScore(pub f32);

impl Retain<GenotypeRecord> for LowScore {
    #[inline]
    fn retain(&self, item: &GenotypeRecord) -> bool {
        item.is_low_score(self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    kept: bool,
}

/// Windowed retention filter over one ordered stream.
#[derive(Debug, Clone)]
pub struct EvidenceWindow<T, P> {
    size: usize,
    mid: usize,
    queue: VecDeque<Slot<T>>,
    arrivals: usize,
    hits: usize,
    finalized: bool,
    kept: Vec<T>,
    predicate: P,
}

impl<T: Clone, P: Retain<T>> EvidenceWindow<T, P> {
    /// Create a window of `size` items; even sizes are rounded up.
    pub fn new(size: usize, predicate: P) -> Self {
        let size = size.max(1) | 1;
        Self {
            size,
            mid: size / 2,
            queue: VecDeque::with_capacity(size + 1),
            arrivals: 0,
            hits: 0,
            finalized: false,
            kept: Vec::new(),
            predicate,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Items pushed so far.
    #[inline]
    pub fn arrivals(&self) -> usize {
        self.arrivals
    }

    /// Number of items that satisfied the predicate.
    #[inline]
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Retained items, in arrival order.
    #[inline]
    pub fn kept(&self) -> &[T] {
        &self.kept
    }

    pub fn push(&mut self, item: T) {
        debug_assert!(!self.finalized, "push after finalize");
        self.queue.push_back(Slot { item, kept: false });
        if self.queue.len() > self.size {
            self.queue.pop_front();
        }
        self.arrivals += 1;

        if self.arrivals > self.mid {
            let center = self.queue.len() - 1 - self.mid;
            if self.predicate.retain(&self.queue[center].item) {
                self.hits += 1;
                self.keep_from(0);
            }
        }
    }

    /// Evaluate the trailing items that never reached the centre.
    ///
    /// Calling it more than once has no further effect.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        let tail = self.mid.min(self.arrivals);
        let first = self.queue.len() - tail;
        for c in first..self.queue.len() {
            if self.predicate.retain(&self.queue[c].item) {
                self.hits += 1;
                self.keep_from(c.saturating_sub(self.mid));
            }
        }
    }

    /// Finalize and hand over the retained items.
    pub fn into_kept(mut self) -> Vec<T> {
        self.finalize();
        self.kept
    }

    fn keep_from(&mut self, start: usize) {
        for slot in self.queue.iter_mut().skip(start) {
            if !slot.kept {
                slot.kept = true;
                self.kept.push(slot.item.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Site indices stand in for records; hits are listed explicitly.
    struct Hits(Vec<u32>);

    impl Retain<u32> for Hits {
        fn retain(&self, item: &u32) -> bool {
            self.0.contains(item)
        }
    }

    fn run(n: u32, size: usize, hits: &[u32]) -> Vec<u32> {
        let mut w = EvidenceWindow::new(size, Hits(hits.to_vec()));
        for i in 0..n {
            w.push(i);
        }
        w.into_kept()
    }

    #[test]
    fn test_interior_hit_keeps_two_each_side() {
        assert_eq!(run(9, 5, &[4]), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_first_site_hit() {
        assert_eq!(run(9, 5, &[0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_second_site_hit() {
        assert_eq!(run(9, 5, &[1]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_trailing_hits_use_finalize() {
        assert_eq!(run(9, 5, &[7]), vec![5, 6, 7, 8]);
        assert_eq!(run(9, 5, &[8]), vec![6, 7, 8]);
        // Last centred position is 6
        assert_eq!(run(9, 5, &[6]), vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_overlapping_hits_keep_once() {
        let kept = run(9, 5, &[3, 4, 5]);
        assert_eq!(kept, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_no_hits() {
        assert!(run(9, 5, &[]).is_empty());
    }

    #[test]
    fn test_stream_shorter_than_half_window() {
        // Nothing is ever centred with mid = 2 and two items
        assert_eq!(run(2, 5, &[1]), vec![0, 1]);
        assert_eq!(run(2, 5, &[0]), vec![0, 1]);
        assert!(run(0, 5, &[0]).is_empty());
    }

    #[test]
    fn test_stream_shorter_than_window() {
        // Items 0..=1 are centred while filling, 2..=3 are trailing
        assert_eq!(run(4, 5, &[3]), vec![1, 2, 3]);
        assert_eq!(run(4, 5, &[1]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_even_size_rounded_up() {
        let w: EvidenceWindow<u32, Hits> = EvidenceWindow::new(4, Hits(vec![]));
        assert_eq!(w.size(), 5);
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut w = EvidenceWindow::new(3, Hits(vec![4]));
        for i in 0..5 {
            w.push(i);
        }
        w.finalize();
        w.finalize();
        assert_eq!(w.kept(), &[3, 4]);
        assert_eq!(w.hits(), 1);
    }

    #[test]
    fn test_low_score_predicate() {
        let mut w = EvidenceWindow::new(3, LowScore(0.99));
        for (i, pp) in [f32::NAN, 0.5, 1.0, f32::NAN].into_iter().enumerate() {
            w.push(GenotypeRecord::new(i as u32, 2, 5, pp));
        }
        let kept: Vec<u32> = w.into_kept().iter().map(|r| r.site_index).collect();
        assert_eq!(kept, vec![0, 1, 2]);
    }
}
