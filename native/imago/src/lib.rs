//! imago: the retrieval core of a content-based image search engine.
//!
//! Feature vectors extracted elsewhere are stored as encoded fields of
//! documents, optionally alongside hash terms. Queries either scan every
//! document or fetch hash candidates, then re-rank by exact distance into a
//! capped best-of-k set.
//!
//! - [`hashing`]: bit sampling, LSH and metric-space reference points
//! - [`ranking`]: the bounded ranking set and its merge
//! - [`retrieval`]: boolean-OR candidate generation
//! - [`searcher`]: the re-ranking pipeline, linear or hashed, sharded or not
//! - [`duplicates`]: anchor-based duplicate grouping

pub mod cache;
pub mod codec;
pub mod db;
pub mod distances;
pub mod duplicates;
pub mod error;
pub mod hashing;
pub mod indexer;
pub mod ranking;
pub mod retrieval;
pub mod searcher;
pub mod similarity;
mod simd_utils;
pub mod types;

#[cfg(feature = "nif")]
mod nifs;

pub use cache::FeatureCache;
pub use db::{DocumentStore, MemoryStore, StoredDocument};
pub use duplicates::{find_duplicates, DuplicateConfig, DuplicateGroup, GroupingMode};
pub use error::{ImagoError, Result};
pub use hashing::{DimensionPolicy, HashFamily};
pub use indexer::{FieldSpec, Indexer};
pub use ranking::{BoundedRankingSet, SimpleResult};
pub use searcher::{ImageSearcher, SearchHit, SearchHits, SearchMode, SearcherConfig};
pub use similarity::SearchStats;
pub use types::{DocId, Feature, FeatureKind, HashTerm};
