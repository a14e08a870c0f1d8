use std::f64::consts::PI;
use std::io::{Read, Write};

use rand::Rng;
use tracing::debug;

use super::params::{
    check_width, checked_len, expect_end, quantize, read_f32s, read_header, write_f32s, write_header,
};
use super::{DimensionPolicy, HashFamily, HashTerms};
use crate::error::{ImagoError, Result};
use crate::simd_utils::dot;
use crate::types::HashTerm;

/// Parameters for generating an [`Lsh`] family.
#[derive(Clone, Debug)]
pub struct LshConfig {
    pub dimensions: usize,
    pub bundles: usize,
    /// Bin width `w`; larger bins collide more often.
    pub width: f64,
    pub policy: DimensionPolicy,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self {
            dimensions: 144,
            bundles: 100,
            width: 10.0,
            policy: DimensionPolicy::Strict,
        }
    }
}

/// p-stable projection hashing approximating L2 distance.
///
/// Bundle `i` hashes to `floor((a_i · v + b_i) / w)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lsh {
    dimensions: usize,
    bundles: usize,
    width: f64,
    offsets: Vec<f64>,
    /// `bundles × dimensions`, row-major.
    projections: Vec<f64>,
    policy: DimensionPolicy,
}

/// One standard normal sample via the Box–Muller transform.
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps ln away from zero.
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

impl Lsh {
    pub fn generate<R: Rng + ?Sized>(config: &LshConfig, rng: &mut R) -> Result<Self> {
        if config.dimensions == 0 || config.bundles == 0 {
            return Err(ImagoError::InvalidParameter(
                "dimensions and bundles must be non-zero".to_string(),
            ));
        }
        check_width(config.width)?;
        let offsets = (0..config.bundles)
            .map(|_| {
                // f32 rounding may land exactly on w; fold it back into the bin.
                let b = quantize(rng.random_range(0.0..config.width));
                if b >= config.width {
                    0.0
                } else {
                    b
                }
            })
            .collect();
        let n = checked_len(&[config.bundles, config.dimensions])?;
        let projections = (0..n).map(|_| quantize(gaussian(rng))).collect();
        debug!(
            dimensions = config.dimensions,
            bundles = config.bundles,
            width = config.width,
            "generated LSH parameters"
        );
        Ok(Self {
            dimensions: config.dimensions,
            bundles: config.bundles,
            width: config.width,
            offsets,
            projections,
            policy: config.policy,
        })
    }

    /// Read parameters written by [`HashFamily::write_params`].
    ///
    /// The bin width is not part of the stream; offsets outside `[0, width)`
    /// reveal a width that differs from the one used at generation time.
    pub fn read_params(reader: &mut dyn Read, width: f64, policy: DimensionPolicy) -> Result<Self> {
        check_width(width)?;
        let [dims_a, dimensions, bundles] = read_header(reader)?;
        if dims_a != dimensions {
            return Err(ImagoError::Codec(format!(
                "LSH header disagrees on dimensions: {dims_a} vs {dimensions}"
            )));
        }
        let offsets = read_f32s(reader, bundles)?;
        let projections = read_f32s(reader, checked_len(&[bundles, dimensions])?)?;
        expect_end(reader)?;
        if let Some(b) = offsets.iter().find(|&&b| !(0.0..width).contains(&b)) {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "offset {b} lies outside [0, {width}); parameters were generated with another bin width"
            )));
        }
        Ok(Self {
            dimensions,
            bundles,
            width,
            offsets,
            projections,
            policy,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

impl HashFamily for Lsh {
    fn name(&self) -> &'static str {
        "lsh"
    }

    fn bundles(&self) -> usize {
        self.bundles
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn hashes(&self, vector: &[f64]) -> Result<HashTerms> {
        let v = self.policy.apply(self.dimensions, vector)?;
        let terms = self
            .projections
            .chunks_exact(self.dimensions)
            .zip(&self.offsets)
            .enumerate()
            .map(|(i, (a, b))| {
                let bin = ((dot(v, a) + b) / self.width).floor();
                HashTerm::new(i as u32, bin as i32)
            })
            .collect();
        Ok(terms)
    }

    fn write_params(&self, writer: &mut dyn Write) -> Result<()> {
        write_header(writer, [self.dimensions, self.dimensions, self.bundles])?;
        write_f32s(writer, self.offsets.iter().copied())?;
        write_f32s(writer, self.projections.iter().copied())
    }
}
