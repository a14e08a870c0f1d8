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

/// Parameters for generating a [`BitSampling`] family.
#[derive(Clone, Debug)]
pub struct BitSamplingConfig {
    /// Sign bits packed into each bundle value (at most 31).
    pub bits: usize,
    pub dimensions: usize,
    pub bundles: usize,
    /// Hyperplane coefficients are drawn from `[-width/2, width/2]`.
    pub width: f64,
    pub policy: DimensionPolicy,
}

impl Default for BitSamplingConfig {
    fn default() -> Self {
        Self {
            bits: 12,
            dimensions: 144,
            bundles: 100,
            width: 4.0,
            policy: DimensionPolicy::Strict,
        }
    }
}

impl BitSamplingConfig {
    fn validate(&self) -> Result<()> {
        if self.bits == 0 || self.bits > 31 {
            return Err(ImagoError::InvalidParameter(format!(
                "bits must be in 1..=31, got {}",
                self.bits
            )));
        }
        if self.dimensions == 0 || self.bundles == 0 {
            return Err(ImagoError::InvalidParameter(
                "dimensions and bundles must be non-zero".to_string(),
            ));
        }
        check_width(self.width)
    }
}

/// Random-hyperplane bit sampling.
///
/// Bundle `i` projects the vector onto `bits` hyperplanes and packs the sign
/// of each projection with weight `2^j`.
#[derive(Clone, Debug, PartialEq)]
pub struct BitSampling {
    bits: usize,
    dimensions: usize,
    bundles: usize,
    /// `bundles × bits × dimensions`, row-major.
    planes: Vec<f64>,
    policy: DimensionPolicy,
}

impl BitSampling {
    pub fn generate<R: Rng + ?Sized>(config: &BitSamplingConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let n = checked_len(&[config.bundles, config.bits, config.dimensions])?;
        let half = config.width / 2.0;
        let planes = (0..n)
            .map(|_| quantize(rng.random_range(-half..=half)))
            .collect();
        debug!(
            bits = config.bits,
            dimensions = config.dimensions,
            bundles = config.bundles,
            "generated bit sampling parameters"
        );
        Ok(Self {
            bits: config.bits,
            dimensions: config.dimensions,
            bundles: config.bundles,
            planes,
            policy: config.policy,
        })
    }

    /// Read parameters written by [`HashFamily::write_params`].
    pub fn read_params(reader: &mut dyn Read, policy: DimensionPolicy) -> Result<Self> {
        let [bits, dimensions, bundles] = read_header(reader)?;
        if bits > 31 {
            return Err(ImagoError::Codec(format!(
                "bit sampling header claims {bits} bits per bundle"
            )));
        }
        let planes = read_f32s(reader, checked_len(&[bundles, bits, dimensions])?)?;
        expect_end(reader)?;
        Ok(Self {
            bits,
            dimensions,
            bundles,
            planes,
            policy,
        })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    fn plane(&self, bundle: usize, bit: usize) -> &[f64] {
        let start = (bundle * self.bits + bit) * self.dimensions;
        &self.planes[start..start + self.dimensions]
    }
}

impl HashFamily for BitSampling {
    fn name(&self) -> &'static str {
        "bit_sampling"
    }

    fn bundles(&self) -> usize {
        self.bundles
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn hashes(&self, vector: &[f64]) -> Result<HashTerms> {
        let v = self.policy.apply(self.dimensions, vector)?;
        let mut out = HashTerms::with_capacity(self.bundles);
        for bundle in 0..self.bundles {
            let mut value = 0i32;
            for bit in 0..self.bits {
                if dot(v, self.plane(bundle, bit)) > 0.0 {
                    value |= 1 << bit;
                }
            }
            out.push(HashTerm::new(bundle as u32, value));
        }
        Ok(out)
    }

    fn write_params(&self, writer: &mut dyn Write) -> Result<()> {
        write_header(writer, [self.bits, self.dimensions, self.bundles])?;
        write_f32s(writer, self.planes.iter().copied())
    }
}
