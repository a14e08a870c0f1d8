//! Capped best-of-k result set.
//!
//! Results are ordered by distance, then by a tie-break index (the document
//! id unless the caller supplies another), so two documents at the same
//! distance never collapse into one entry. The set never holds more than its
//! cap, and its worst entry can be evicted in `O(log k)`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use crate::error::{ImagoError, Result};
use crate::types::DocId;

/// One ranked hit.
///
/// Equality is by document alone; ordering lives in the ranking set.
#[derive(Copy, Clone, Debug)]
pub struct SimpleResult {
    pub distance: f64,
    pub doc: DocId,
    pub tiebreak: u64,
}

impl PartialEq for SimpleResult {
    fn eq(&self, other: &Self) -> bool {
        self.doc == other.doc
    }
}
impl Eq for SimpleResult {}

#[derive(Copy, Clone, Debug)]
struct RankKey {
    distance: f64,
    tiebreak: u64,
    doc: DocId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.tiebreak.cmp(&other.tiebreak))
            .then(self.doc.cmp(&other.doc))
    }
}
impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for RankKey {}

impl From<RankKey> for SimpleResult {
    fn from(k: RankKey) -> Self {
        SimpleResult {
            distance: k.distance,
            doc: k.doc,
            tiebreak: k.tiebreak,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BoundedRankingSet {
    cap: usize,
    entries: BTreeSet<RankKey>,
    docs: HashSet<DocId>,
}

impl BoundedRankingSet {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: BTreeSet::new(),
            docs: HashSet::with_capacity(cap.min(1024)),
        }
    }

    /// Offer a hit, using the document id as tie-break.
    pub fn offer(&mut self, distance: f64, doc: DocId) -> Result<bool> {
        self.offer_with_tiebreak(distance, doc, u64::from(doc))
    }

    /// Offer a hit; returns whether it was kept.
    ///
    /// A document already held is not offered twice. Once the set is full a
    /// hit replaces the worst entry only if it orders strictly before it.
    pub fn offer_with_tiebreak(&mut self, distance: f64, doc: DocId, tiebreak: u64) -> Result<bool> {
        if distance.is_nan() || distance < 0.0 {
            return Err(ImagoError::CorruptVector { doc, distance });
        }
        if self.cap == 0 || self.docs.contains(&doc) {
            return Ok(false);
        }
        let key = RankKey {
            // Folds -0.0 into +0.0.
            distance: distance + 0.0,
            tiebreak,
            doc,
        };
        if self.entries.len() >= self.cap {
            match self.entries.last() {
                Some(worst) if key < *worst => {
                    if let Some(evicted) = self.entries.pop_last() {
                        self.docs.remove(&evicted.doc);
                    }
                }
                _ => return Ok(false),
            }
        }
        self.docs.insert(doc);
        self.entries.insert(key);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.contains(&doc)
    }

    /// Distance of the worst surviving entry.
    pub fn max_distance(&self) -> Option<f64> {
        self.entries.last().map(|k| k.distance)
    }

    /// Entries in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SimpleResult> + '_ {
        self.entries.iter().map(|&k| k.into())
    }

    pub fn into_sorted_vec(self) -> Vec<SimpleResult> {
        self.entries.into_iter().map(Into::into).collect()
    }

    /// Merge partial sets into one capped at `cap`.
    ///
    /// Repeatedly takes the smallest head among the parts; the result does
    /// not depend on how hits were spread across parts.
    pub fn merge(parts: impl IntoIterator<Item = BoundedRankingSet>, cap: usize) -> Self {
        let mut iters: Vec<_> = parts.into_iter().map(|p| p.entries.into_iter()).collect();
        let mut heads = BinaryHeap::with_capacity(iters.len());
        for (i, it) in iters.iter_mut().enumerate() {
            if let Some(k) = it.next() {
                heads.push(Reverse((k, i)));
            }
        }

        let mut out = BoundedRankingSet::new(cap);
        while out.len() < cap {
            let Some(Reverse((key, i))) = heads.pop() else {
                break;
            };
            if out.docs.insert(key.doc) {
                out.entries.insert(key);
            }
            if let Some(next) = iters[i].next() {
                heads.push(Reverse((next, i)));
            }
        }
        out
    }
}
