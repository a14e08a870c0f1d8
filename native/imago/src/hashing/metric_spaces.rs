use std::io::{Read, Write};

use rand::Rng;
use tracing::debug;

use super::params::{checked_len, expect_end, quantize, read_f32s, read_header, write_f32s, write_header};
use super::{DimensionPolicy, HashFamily, HashTerms};
use crate::distances::metric_distance;
use crate::error::{ImagoError, Result};
use crate::types::{Feature, FeatureKind, HashTerm, Metric};

#[derive(Clone, Debug)]
pub struct MetricSpacesConfig {
    /// Reference points sampled from the pool.
    pub references: usize,
    /// Nearest references emitted per vector.
    pub terms_per_doc: usize,
    pub policy: DimensionPolicy,
}

impl Default for MetricSpacesConfig {
    fn default() -> Self {
        Self {
            references: 1000,
            terms_per_doc: 50,
            policy: DimensionPolicy::Strict,
        }
    }
}

/// Reference-point hashing for arbitrary metrics.
///
/// A vector is described by the ids of its `terms_per_doc` nearest reference
/// points, nearest first. All terms share bundle `0`: two vectors are
/// candidates for each other when their neighbourhoods of references overlap.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSpaces {
    dimensions: usize,
    terms_per_doc: usize,
    metric: Metric,
    /// `references × dimensions`, row-major.
    references: Vec<f64>,
    policy: DimensionPolicy,
}

impl MetricSpaces {
    /// Sample reference points from `pool` without replacement.
    pub fn generate<R: Rng + ?Sized>(
        config: &MetricSpacesConfig,
        kind: FeatureKind,
        pool: &[Feature],
        rng: &mut R,
    ) -> Result<Self> {
        if config.references == 0 || config.terms_per_doc == 0 {
            return Err(ImagoError::InvalidParameter(
                "references and terms_per_doc must be non-zero".to_string(),
            ));
        }
        if config.terms_per_doc > config.references {
            return Err(ImagoError::InvalidParameter(format!(
                "{} terms per document but only {} references",
                config.terms_per_doc, config.references
            )));
        }
        if pool.len() < config.references {
            return Err(ImagoError::InvalidParameter(format!(
                "pool of {} vectors cannot supply {} references",
                pool.len(),
                config.references
            )));
        }
        let dimensions = pool[0].len();
        if dimensions == 0 {
            return Err(ImagoError::InvalidParameter(
                "reference points must have at least one dimension".to_string(),
            ));
        }
        let mut references = Vec::with_capacity(config.references * dimensions);
        for idx in rand::seq::index::sample(rng, pool.len(), config.references) {
            let f = &pool[idx];
            if f.kind() != kind || f.len() != dimensions {
                return Err(ImagoError::ConfigurationMismatch(format!(
                    "reference pool mixes {} [{}] with {} [{}]",
                    kind,
                    dimensions,
                    f.kind(),
                    f.len()
                )));
            }
            references.extend(f.to_f64().into_iter().map(quantize));
        }
        debug!(
            references = config.references,
            dimensions,
            kind = %kind,
            "sampled metric space reference points"
        );
        Ok(Self {
            dimensions,
            terms_per_doc: config.terms_per_doc,
            metric: kind.metric(),
            references,
            policy: config.policy,
        })
    }

    pub fn read_params(
        reader: &mut dyn Read,
        kind: FeatureKind,
        policy: DimensionPolicy,
    ) -> Result<Self> {
        let [count, dimensions, terms_per_doc] = read_header(reader)?;
        if terms_per_doc > count {
            return Err(ImagoError::Codec(format!(
                "{terms_per_doc} terms per document but only {count} references"
            )));
        }
        let references = read_f32s(reader, checked_len(&[count, dimensions])?)?;
        expect_end(reader)?;
        Ok(Self {
            dimensions,
            terms_per_doc,
            metric: kind.metric(),
            references,
            policy,
        })
    }

    pub fn reference_count(&self) -> usize {
        self.references.len() / self.dimensions
    }
}

impl HashFamily for MetricSpaces {
    fn name(&self) -> &'static str {
        "metric_spaces"
    }

    fn bundles(&self) -> usize {
        1
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn hashes(&self, vector: &[f64]) -> Result<HashTerms> {
        let v = self.policy.apply(self.dimensions, vector)?;
        let mut ranked: Vec<(f64, usize)> = self
            .references
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(i, r)| (metric_distance(self.metric, v, &r[..v.len()]), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(ranked
            .into_iter()
            .take(self.terms_per_doc)
            .map(|(_, i)| HashTerm::new(0, i as i32))
            .collect())
    }

    fn write_params(&self, writer: &mut dyn Write) -> Result<()> {
        write_header(
            writer,
            [self.reference_count(), self.dimensions, self.terms_per_doc],
        )?;
        write_f32s(writer, self.references.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool() -> Vec<Feature> {
        (0..10)
            .map(|i| {
                Feature::from_doubles(FeatureKind::DoubleHistogram, vec![i as f64, 0.0, 1.0])
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn nearest_reference_comes_first() {
        let config = MetricSpacesConfig {
            references: 10,
            terms_per_doc: 3,
            policy: DimensionPolicy::Strict,
        };
        let ms = MetricSpaces::generate(
            &config,
            FeatureKind::DoubleHistogram,
            &pool(),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        let terms = ms.hashes(&[4.0, 0.0, 1.0]).unwrap();
        assert_eq!(terms.len(), 3);
        // The reference equal to the query is at distance zero.
        let first = terms[0].value as usize;
        let r = &ms.references[first * 3..first * 3 + 3];
        assert_eq!(r, &[4.0, 0.0, 1.0]);
        assert!(terms.iter().all(|t| t.bundle == 0));
    }

    #[test]
    fn pool_too_small() {
        let config = MetricSpacesConfig {
            references: 20,
            terms_per_doc: 3,
            policy: DimensionPolicy::Strict,
        };
        assert!(MetricSpaces::generate(
            &config,
            FeatureKind::DoubleHistogram,
            &pool(),
            &mut StdRng::seed_from_u64(5)
        )
        .is_err());
    }

    #[test]
    fn empty_reference_points_rejected() {
        let empty: Vec<Feature> = (0..3)
            .map(|_| Feature::from_doubles(FeatureKind::DoubleHistogram, Vec::new()).unwrap())
            .collect();
        let config = MetricSpacesConfig {
            references: 2,
            terms_per_doc: 1,
            policy: DimensionPolicy::Strict,
        };
        assert!(matches!(
            MetricSpaces::generate(
                &config,
                FeatureKind::DoubleHistogram,
                &empty,
                &mut StdRng::seed_from_u64(5)
            ),
            Err(ImagoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn params_round_trip() {
        let config = MetricSpacesConfig {
            references: 4,
            terms_per_doc: 2,
            policy: DimensionPolicy::Strict,
        };
        let ms = MetricSpaces::generate(
            &config,
            FeatureKind::DoubleHistogram,
            &pool(),
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();
        let mut buf = Vec::new();
        ms.write_params(&mut buf).unwrap();
        let back = MetricSpaces::read_params(
            &mut buf.as_slice(),
            FeatureKind::DoubleHistogram,
            DimensionPolicy::Strict,
        )
        .unwrap();
        assert_eq!(back, ms);
    }
}
