//! Binary encoding of feature vectors for stored fields and the feature cache.
//!
//! Byte-quantised kinds are stored verbatim, one byte per component. Double
//! kinds are stored as big-endian IEEE-754 `f64`, eight bytes per component,
//! so decoding reproduces the exact bit pattern.

use crate::error::{ImagoError, Result};
use crate::types::{Components, Feature, FeatureKind, Storage};

pub fn encode(feature: &Feature) -> Vec<u8> {
    match feature.components() {
        Components::Bytes(v) => v.clone(),
        Components::Doubles(v) => {
            let mut out = Vec::with_capacity(v.len() * 8);
            for x in v {
                out.extend_from_slice(&x.to_be_bytes());
            }
            out
        }
    }
}

pub fn decode(kind: FeatureKind, bytes: &[u8]) -> Result<Feature> {
    match kind.storage() {
        Storage::Bytes => Feature::from_bytes(kind, bytes.to_vec()),
        Storage::Doubles => {
            if bytes.len() % 8 != 0 {
                return Err(ImagoError::Codec(format!(
                    "{kind}: {} bytes is not a whole number of doubles",
                    bytes.len()
                )));
            }
            let values = bytes
                .chunks_exact(8)
                .map(|c| {
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(c);
                    f64::from_be_bytes(buf)
                })
                .collect();
            Feature::from_doubles(kind, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_keep_their_bits() {
        let values = vec![0.0, -0.0, 1.5, f64::MIN_POSITIVE, 1e300];
        let f = Feature::from_doubles(FeatureKind::DoubleHistogram, values.clone()).unwrap();
        let bytes = encode(&f);
        assert_eq!(bytes.len(), 40);
        let back = decode(FeatureKind::DoubleHistogram, &bytes).unwrap();
        match back.components() {
            Components::Doubles(d) => {
                for (x, y) in d.iter().zip(&values) {
                    assert_eq!(x.to_bits(), y.to_bits());
                }
            }
            Components::Bytes(_) => panic!("expected doubles"),
        }
    }

    #[test]
    fn ragged_doubles_are_rejected() {
        assert!(matches!(
            decode(FeatureKind::ColorHistogram, &[0u8; 9]),
            Err(ImagoError::Codec(_))
        ));
    }

    #[test]
    fn fixed_length_checked_on_decode() {
        assert!(decode(FeatureKind::EdgeHistogram, &[0u8; 79]).is_err());
        assert!(decode(FeatureKind::EdgeHistogram, &[0u8; 80]).is_ok());
    }
}
