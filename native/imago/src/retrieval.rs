//! Candidate generation: boolean OR over hash-term postings.

use std::collections::HashMap;

use rand::{Rng, RngCore};
use tracing::debug;

use crate::db::DocumentStore;
use crate::types::{DocId, HashTerm};

/// Fetches documents sharing at least one hash term with a query.
#[derive(Clone, Debug)]
pub struct CandidateRetriever {
    hash_field: String,
    limit: usize,
}

impl CandidateRetriever {
    pub fn new(hash_field: impl Into<String>, limit: usize) -> Self {
        Self {
            hash_field: hash_field.into(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Live documents matching any `(bundle, value)` term, capped at `limit`.
    ///
    /// Documents matching more terms come first; equal counts keep posting
    /// order. With `partial` set, each bundle survives a fair coin flip.
    pub fn fetch<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        terms: &[HashTerm],
        partial: Option<&mut dyn RngCore>,
    ) -> Vec<DocId> {
        if self.limit == 0 || terms.is_empty() {
            return Vec::new();
        }
        let selected = match partial {
            Some(rng) => select_bundles(terms, rng),
            None => terms.to_vec(),
        };

        // `None` marks a document already found to be deleted.
        let mut matches: HashMap<DocId, Option<u32>> = HashMap::new();
        let mut order = Vec::new();
        for term in &selected {
            for doc in store.candidates_for_term(&self.hash_field, *term) {
                let slot = matches.entry(doc).or_insert_with(|| {
                    if store.is_live(doc) {
                        order.push(doc);
                        Some(0)
                    } else {
                        None
                    }
                });
                if let Some(count) = slot {
                    *count += 1;
                }
            }
        }

        order.sort_by_key(|doc| std::cmp::Reverse(matches[doc].unwrap_or(0)));
        order.truncate(self.limit);
        debug!(
            field = %self.hash_field,
            terms = selected.len(),
            candidates = order.len(),
            "fetched candidates"
        );
        order
    }
}

/// Keep roughly half of the bundles, never none of them.
fn select_bundles(terms: &[HashTerm], rng: &mut dyn RngCore) -> Vec<HashTerm> {
    let mut bundles: Vec<u32> = terms.iter().map(|t| t.bundle).collect();
    bundles.sort_unstable();
    bundles.dedup();

    let mut kept: Vec<u32> = bundles
        .iter()
        .copied()
        .filter(|_| rng.random_bool(0.5))
        .collect();
    if kept.is_empty() {
        kept.push(bundles[rng.random_range(0..bundles.len())]);
    }
    terms
        .iter()
        .copied()
        .filter(|t| kept.binary_search(&t.bundle).is_ok())
        .collect()
}
