//! Exact distance scans feeding a [`BoundedRankingSet`].
//! * Linear mode walks every live ordinal, split into contiguous shards.
//! * Each shard ranks into its own set; the sets are merged at the end.
//! * Candidate mode ranks only the ids the hash retriever returned.
use std::borrow::Cow;
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::warn;

use crate::cache::FeatureCache;
use crate::codec;
use crate::db::DocumentStore;
use crate::distances::distance;
use crate::error::{ImagoError, Result};
use crate::ranking::BoundedRankingSet;
use crate::types::{DocId, Feature, FeatureKind};

#[cfg(feature = "parallel")]
const PAR_THRESHOLD: usize = 2_000; // below this the shards run serially

/// Counters collected while ranking.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Live documents whose distance was attempted.
    pub scanned: usize,
    /// Candidates returned by the hash retriever (0 in linear mode).
    pub candidates: usize,
    /// Live documents skipped because their feature was missing or unreadable.
    pub unavailable: usize,
}

impl SearchStats {
    fn add(mut self, other: SearchStats) -> Self {
        self.scanned += other.scanned;
        self.candidates += other.candidates;
        self.unavailable += other.unavailable;
        self
    }
}

/// Where stored vectors come from during a scan.
pub(crate) struct FeatureSource<'a, S: ?Sized> {
    pub store: &'a S,
    pub field: &'a str,
    pub kind: FeatureKind,
    pub cache: Option<&'a FeatureCache>,
}

impl<S: DocumentStore + ?Sized> FeatureSource<'_, S> {
    pub fn load(&self, doc: DocId) -> Result<Cow<'_, Feature>> {
        let missing = || ImagoError::MissingFeature {
            doc,
            field: self.field.to_string(),
        };
        if let Some(cache) = self.cache {
            return cache.get(doc).map(Cow::Borrowed).ok_or_else(missing);
        }
        let bytes = self.store.stored_field(doc, self.field).ok_or_else(missing)?;
        codec::decode(self.kind, &bytes)
            .map(Cow::Owned)
            .map_err(|e| {
                warn!(doc, field = self.field, error = %e, "stored feature does not decode");
                missing()
            })
    }

    /// Offer one document; a missing feature is counted, not fatal.
    fn rank_one(
        &self,
        query: &Feature,
        doc: DocId,
        set: &mut BoundedRankingSet,
        stats: &mut SearchStats,
    ) -> Result<()> {
        if !self.store.is_live(doc) {
            return Ok(());
        }
        stats.scanned += 1;
        match self.load(doc) {
            Ok(feature) => {
                let d = distance(query, &feature)?;
                set.offer(d, doc)?;
            }
            Err(ImagoError::MissingFeature { doc, field }) => {
                warn!(doc, field = %field, "document has no feature, skipped");
                stats.unavailable += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn scan_range(
        &self,
        query: &Feature,
        range: Range<usize>,
        max_hits: usize,
    ) -> Result<(BoundedRankingSet, SearchStats)> {
        let mut set = BoundedRankingSet::new(max_hits);
        let mut stats = SearchStats::default();
        for doc in range {
            self.rank_one(query, doc as DocId, &mut set, &mut stats)?;
        }
        Ok((set, stats))
    }
}

/// Split `0..n` into `shards` contiguous, disjoint, exhaustive ranges.
pub(crate) fn shard_ranges(n: usize, shards: usize) -> Vec<Range<usize>> {
    let shards = shards.clamp(1, n.max(1));
    let base = n / shards;
    let extra = n % shards;
    let mut start = 0;
    (0..shards)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let r = start..start + len;
            start += len;
            r
        })
        .collect()
}

/// Rank every live document.
pub(crate) fn linear_scan<S: DocumentStore + Sync + ?Sized>(
    source: &FeatureSource<'_, S>,
    query: &Feature,
    max_hits: usize,
    shards: usize,
) -> Result<(BoundedRankingSet, SearchStats)> {
    let n = source.store.num_documents();
    let ranges = shard_ranges(n, shards);

    #[cfg(feature = "parallel")]
    let parts: Vec<(BoundedRankingSet, SearchStats)> = if ranges.len() > 1 && n >= PAR_THRESHOLD {
        ranges
            .into_par_iter()
            .map(|r| source.scan_range(query, r, max_hits))
            .collect::<Result<_>>()?
    } else {
        ranges
            .into_iter()
            .map(|r| source.scan_range(query, r, max_hits))
            .collect::<Result<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let parts: Vec<(BoundedRankingSet, SearchStats)> = ranges
        .into_iter()
        .map(|r| source.scan_range(query, r, max_hits))
        .collect::<Result<_>>()?;

    let stats = parts
        .iter()
        .fold(SearchStats::default(), |acc, (_, s)| acc.add(*s));
    let set = BoundedRankingSet::merge(parts.into_iter().map(|(set, _)| set), max_hits);
    Ok((set, stats))
}

/// Rank a candidate list from the hash retriever.
pub(crate) fn rank_candidates<S: DocumentStore + ?Sized>(
    source: &FeatureSource<'_, S>,
    query: &Feature,
    candidates: &[DocId],
    max_hits: usize,
) -> Result<(BoundedRankingSet, SearchStats)> {
    let mut set = BoundedRankingSet::new(max_hits);
    let mut stats = SearchStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    for &doc in candidates {
        source.rank_one(query, doc, &mut set, &mut stats)?;
    }
    Ok((set, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shards_cover_everything_once() {
        for n in [0usize, 1, 7, 10, 64] {
            for shards in [1usize, 2, 3, 8, 100] {
                let ranges = shard_ranges(n, shards);
                let flat: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(flat, (0..n).collect::<Vec<_>>(), "n={n} shards={shards}");
                assert!(ranges.len() <= shards.max(1));
            }
        }
    }
}
