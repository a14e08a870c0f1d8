use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::debug;

use crate::cache::FeatureCache;
use crate::db::DocumentStore;
use crate::distances::normalized_score;
use crate::error::{ImagoError, Result};
use crate::hashing::HashFamily;
use crate::indexer::hash_field_name;
use crate::ranking::BoundedRankingSet;
use crate::retrieval::CandidateRetriever;
use crate::similarity::{linear_scan, rank_candidates, FeatureSource, SearchStats};
use crate::types::{DocId, Feature, FeatureKind};

/// How candidates are produced before exact re-ranking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Compute the distance to every live document.
    Linear,
    /// Fetch up to `candidate_limit` documents by hash terms, then re-rank.
    Hashed {
        candidate_limit: usize,
        /// Drop about half of the bundles per query.
        partial_hashes: bool,
    },
}

#[derive(Clone, Debug)]
pub struct SearcherConfig {
    /// Stored field holding the encoded vectors.
    pub field: String,
    pub kind: FeatureKind,
    pub max_hits: usize,
    pub mode: SearchMode,
    /// Attach `1 - d / max_d` scores to hits.
    pub similarity_scoring: bool,
    /// Partitions of the linear scan; results do not depend on it.
    pub shards: usize,
    /// Field holding the hash terms; `None` means `{field}_hash`.
    pub hash_field: Option<String>,
    /// Seed for partial-hash bundle selection; `None` draws from the thread rng.
    pub partial_hash_seed: Option<u64>,
}

impl SearcherConfig {
    pub fn new(kind: FeatureKind) -> Self {
        Self {
            field: kind.name().to_string(),
            kind,
            max_hits: 50,
            mode: SearchMode::Linear,
            similarity_scoring: false,
            shards: 1,
            hash_field: None,
            partial_hash_seed: None,
        }
    }

    pub fn hash_field(&self) -> String {
        self.hash_field
            .clone()
            .unwrap_or_else(|| hash_field_name(&self.field))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub doc: DocId,
    pub identifier: Option<String>,
    pub distance: f64,
    pub score: Option<f64>,
}

/// Ranked hits, nearest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
    /// Largest distance among the returned hits.
    pub max_distance: f64,
    pub stats: SearchStats,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn docs(&self) -> Vec<DocId> {
        self.hits.iter().map(|h| h.doc).collect()
    }
}

/// Query front end shared by every field, cache and hashing combination.
pub struct ImageSearcher {
    config: SearcherConfig,
    family: Option<Arc<dyn HashFamily>>,
    cache: Option<Arc<FeatureCache>>,
}

impl ImageSearcher {
    pub fn new(config: SearcherConfig) -> Self {
        Self {
            config,
            family: None,
            cache: None,
        }
    }

    /// Hash parameters the indexed terms were generated with.
    pub fn with_family(mut self, family: Arc<dyn HashFamily>) -> Self {
        self.family = Some(family);
        self
    }

    /// Serve vectors from a preloaded cache instead of decoding stored fields.
    pub fn with_cache(mut self, cache: Arc<FeatureCache>) -> Result<Self> {
        if cache.field() != self.config.field || cache.kind() != self.config.kind {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "cache holds {} '{}', searcher wants {} '{}'",
                cache.kind(),
                cache.field(),
                self.config.kind,
                self.config.field
            )));
        }
        self.cache = Some(cache);
        Ok(self)
    }

    pub fn config(&self) -> &SearcherConfig {
        &self.config
    }

    fn source<'a, S: DocumentStore + ?Sized>(&'a self, store: &'a S) -> FeatureSource<'a, S> {
        FeatureSource {
            store,
            field: &self.config.field,
            kind: self.config.kind,
            cache: self.cache.as_deref(),
        }
    }

    pub fn search<S: DocumentStore + Sync + ?Sized>(
        &self,
        query: &Feature,
        store: &S,
    ) -> Result<SearchHits> {
        if query.kind() != self.config.kind {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "query is {}, field '{}' holds {}",
                query.kind(),
                self.config.field,
                self.config.kind
            )));
        }
        let source = self.source(store);
        let (set, stats) = match self.config.mode {
            SearchMode::Linear => {
                linear_scan(&source, query, self.config.max_hits, self.config.shards)?
            }
            SearchMode::Hashed {
                candidate_limit,
                partial_hashes,
            } => {
                let family = self.family.as_ref().ok_or_else(|| {
                    ImagoError::ConfigurationMismatch(
                        "hashed search needs the index's hash parameters".to_string(),
                    )
                })?;
                let terms = family.hash_feature(query)?;
                let retriever = CandidateRetriever::new(self.config.hash_field(), candidate_limit);
                let candidates = if partial_hashes {
                    let mut rng: Box<dyn RngCore> = match self.config.partial_hash_seed {
                        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
                        None => Box::new(rand::rng()),
                    };
                    retriever.fetch(store, &terms, Some(rng.as_mut()))
                } else {
                    retriever.fetch(store, &terms, None)
                };
                rank_candidates(&source, query, &candidates, self.config.max_hits)?
            }
        };
        debug!(
            field = %self.config.field,
            mode = ?self.config.mode,
            scanned = stats.scanned,
            unavailable = stats.unavailable,
            hits = set.len(),
            "search finished"
        );
        Ok(self.collect_hits(set, stats, store))
    }

    /// Search with the stored feature of an indexed document.
    pub fn search_document<S: DocumentStore + Sync + ?Sized>(
        &self,
        doc: DocId,
        store: &S,
    ) -> Result<SearchHits> {
        if !store.is_live(doc) {
            return Err(ImagoError::DocumentNotFound(doc));
        }
        let query = self.source(store).load(doc)?.into_owned();
        self.search(&query, store)
    }

    fn collect_hits<S: DocumentStore + ?Sized>(
        &self,
        set: BoundedRankingSet,
        stats: SearchStats,
        store: &S,
    ) -> SearchHits {
        let max_distance = set.max_distance().unwrap_or(0.0);
        let hits = set
            .into_sorted_vec()
            .into_iter()
            .map(|r| SearchHit {
                doc: r.doc,
                identifier: store.identifier(r.doc),
                distance: r.distance,
                score: self
                    .config
                    .similarity_scoring
                    .then(|| normalized_score(r.distance, max_distance)),
            })
            .collect();
        SearchHits {
            hits,
            max_distance,
            stats,
        }
    }
}
