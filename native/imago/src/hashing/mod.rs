//! Hash families that turn a feature vector into a handful of discrete terms.
//!
//! Near vectors collide on many terms with high probability, so a boolean OR
//! over the terms of a query finds candidates without scanning the index.
//! Randomness is confined to parameter generation: once generated (or read
//! back from a parameter file) a family is an immutable value and
//! [`HashFamily::hashes`] is a pure function of its input.
//!
//! Three families are provided:
//!
//! - [`BitSampling`]: random hyperplanes, `bits` sign bits packed per bundle
//! - [`Lsh`]: Gaussian projections quantised into bins of width `w`
//! - [`MetricSpaces`]: ids of the nearest reference points
//!
//! # References
//!
//! - Charikar (2002). "Similarity estimation techniques from rounding algorithms"
//! - Datar et al. (2004). "Locality-sensitive hashing scheme based on p-stable distributions"
//! - Amato & Savino (2008). "Approximate similarity search in metric spaces using inverted files"

mod bit_sampling;
mod lsh;
mod metric_spaces;
mod params;

use std::io::Write;

use smallvec::SmallVec;

use crate::error::{ImagoError, Result};
use crate::types::{Feature, HashTerm};

pub use bit_sampling::{BitSampling, BitSamplingConfig};
pub use lsh::{Lsh, LshConfig};
pub use metric_spaces::{MetricSpaces, MetricSpacesConfig};

/// Terms produced for one vector, one per bundle for the projection families.
pub type HashTerms = SmallVec<[HashTerm; 32]>;

/// What to do when a vector's length differs from the parameter dimensionality.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DimensionPolicy {
    /// Reject the vector with [`ImagoError::ConfigurationMismatch`].
    #[default]
    Strict,
    /// Hash over the first `min(len, dimensions)` components only.
    ///
    /// Indexes written by older tooling relied on this; new indexes should
    /// not.
    Truncate,
}

impl DimensionPolicy {
    pub(crate) fn apply<'a>(self, dimensions: usize, vector: &'a [f64]) -> Result<&'a [f64]> {
        match self {
            DimensionPolicy::Strict if vector.len() != dimensions => {
                Err(ImagoError::ConfigurationMismatch(format!(
                    "hash parameters cover {} dimensions, vector has {}",
                    dimensions,
                    vector.len()
                )))
            }
            DimensionPolicy::Strict => Ok(vector),
            DimensionPolicy::Truncate => Ok(&vector[..vector.len().min(dimensions)]),
        }
    }
}

/// A loaded, immutable set of hash functions.
pub trait HashFamily: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Number of independent bundles.
    fn bundles(&self) -> usize;

    /// Dimensionality the parameters were generated for.
    fn dimensions(&self) -> usize;

    /// Hash one vector.
    fn hashes(&self, vector: &[f64]) -> Result<HashTerms>;

    /// Hash a feature, widening byte components to `f64`.
    fn hash_feature(&self, feature: &Feature) -> Result<HashTerms> {
        self.hashes(&feature.to_f64())
    }

    /// Persist the parameters in the binary parameter format.
    fn write_params(&self, writer: &mut dyn Write) -> Result<()>;
}
