use crate::error::{ImagoError, Result};
use crate::simd_utils::{load_f64x4, load_u8_as_f64x4};
use crate::types::{Components, Feature, Metric};

/// Clamp a float into the inclusive range `[0, 1]`.
pub fn clamp_0_1(val: f64) -> f64 {
    if val < 0.0 {
        0.0
    } else if val > 1.0 {
        1.0
    } else {
        val
    }
}

/// SIMD Manhattan distance (L1).
pub fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let mut i = 0;
    let mut sum = 0.0;
    while i + 4 <= len {
        let va = load_f64x4(a, i);
        let vb = load_f64x4(b, i);
        sum += (va - vb).abs().reduce_add();
        i += 4;
    }
    while i < len {
        sum += (a[i] - b[i]).abs();
        i += 1;
    }
    sum
}

/// SIMD Euclidean distance (L2).
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let mut i = 0;
    let mut sum_squares = 0.0;
    while i + 4 <= len {
        let va = load_f64x4(a, i);
        let vb = load_f64x4(b, i);
        sum_squares += ((va - vb) * (va - vb)).reduce_add();
        i += 4;
    }
    while i < len {
        let d = a[i] - b[i];
        sum_squares += d * d;
        i += 1;
    }
    sum_squares.sqrt()
}

pub fn l1_distance_bytes(a: &[u8], b: &[u8]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x.abs_diff(y)))
        .sum()
}

pub fn l2_distance_bytes(a: &[u8], b: &[u8]) -> f64 {
    let len = a.len().min(b.len());
    let mut i = 0;
    let mut sum_squares = 0.0;
    while i + 4 <= len {
        let va = load_u8_as_f64x4(a, i);
        let vb = load_u8_as_f64x4(b, i);
        sum_squares += ((va - vb) * (va - vb)).reduce_add();
        i += 4;
    }
    while i < len {
        let d = f64::from(a[i]) - f64::from(b[i]);
        sum_squares += d * d;
        i += 1;
    }
    sum_squares.sqrt()
}

/// Tanimoto distance scaled to `[0, 100]`.
///
/// Two empty histograms are identical; exactly one empty histogram is as far
/// away as possible.
pub fn tanimoto<T: Copy + Into<f64>>(a: &[T], b: &[T]) -> f64 {
    let sum_a: f64 = a.iter().map(|&x| x.into()).sum();
    let sum_b: f64 = b.iter().map(|&x| x.into()).sum();
    if sum_a == 0.0 && sum_b == 0.0 {
        return 0.0;
    }
    if sum_a == 0.0 || sum_b == 0.0 {
        return 100.0;
    }

    let (mut ab, mut aa, mut bb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y): (f64, f64) = (x.into(), y.into());
        ab += x * y;
        aa += x * x;
        bb += y * y;
    }
    // aa + bb is commutative, so the result stays symmetric.
    let d = 100.0 - 100.0 * (ab / (aa + bb - ab));
    d.max(0.0)
}

/// Exact distance between two features of the same kind.
pub fn distance(a: &Feature, b: &Feature) -> Result<f64> {
    if a.kind() != b.kind() {
        return Err(ImagoError::ConfigurationMismatch(format!(
            "cannot compare {} with {}",
            a.kind(),
            b.kind()
        )));
    }
    if a.len() != b.len() {
        return Err(ImagoError::ConfigurationMismatch(format!(
            "{} vectors of length {} and {}",
            a.kind(),
            a.len(),
            b.len()
        )));
    }

    let d = match (a.components(), b.components(), a.kind().metric()) {
        (Components::Doubles(x), Components::Doubles(y), Metric::L1) => l1_distance(x, y),
        (Components::Doubles(x), Components::Doubles(y), Metric::L2) => l2_distance(x, y),
        (Components::Doubles(x), Components::Doubles(y), Metric::Tanimoto) => tanimoto(x, y),
        (Components::Bytes(x), Components::Bytes(y), Metric::L1) => l1_distance_bytes(x, y),
        (Components::Bytes(x), Components::Bytes(y), Metric::L2) => l2_distance_bytes(x, y),
        (Components::Bytes(x), Components::Bytes(y), Metric::Tanimoto) => tanimoto(x, y),
        _ => {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "{} features with mixed storage",
                a.kind()
            )))
        }
    };
    Ok(d)
}

/// Distance between raw `f64` slices under a metric; used by reference-point hashing.
pub fn metric_distance(metric: Metric, a: &[f64], b: &[f64]) -> f64 {
    match metric {
        Metric::L1 => l1_distance(a, b),
        Metric::L2 => l2_distance(a, b),
        Metric::Tanimoto => tanimoto(a, b),
    }
}

/// Map a distance to a `[0, 1]` similarity against the worst distance kept.
pub fn normalized_score(distance: f64, max_distance: f64) -> f64 {
    if max_distance <= 0.0 {
        return 1.0;
    }
    clamp_0_1(1.0 - distance / max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureKind;

    #[test]
    fn l2_matches_scalar() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 2.0, 1.0, 4.0, 9.0];
        let expected = (1.0f64 + 0.0 + 4.0 + 0.0 + 16.0).sqrt();
        assert!((l2_distance(&a, &b) - expected).abs() < 1e-12);
        assert!((l2_distance_bytes(&[1, 2, 3, 4, 5], &[2, 2, 1, 4, 9]) - expected).abs() < 1e-12);
    }

    #[test]
    fn l1_matches_scalar() {
        let a = [0.5, 1.0, -2.0, 4.0, 1.0, 1.0];
        let b = [1.0, 1.0, 2.0, 3.0, 0.0, 1.0];
        assert!((l1_distance(&a, &b) - 6.5).abs() < 1e-12);
        assert_eq!(l1_distance_bytes(&[5, 0, 3], &[0, 5, 3]), 10.0);
    }

    #[test]
    fn tanimoto_edge_cases() {
        assert_eq!(tanimoto::<u8>(&[0, 0], &[0, 0]), 0.0);
        assert_eq!(tanimoto::<u8>(&[0, 0], &[1, 0]), 100.0);
        assert_eq!(tanimoto::<u8>(&[3, 1, 7], &[3, 1, 7]), 0.0);
        let d = tanimoto::<u8>(&[1, 0], &[0, 1]);
        assert!((d - 100.0).abs() < 1e-12);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let a = Feature::from_doubles(FeatureKind::DoubleHistogram, vec![1.0]).unwrap();
        let b = Feature::from_doubles(FeatureKind::ColorHistogram, vec![1.0]).unwrap();
        assert!(matches!(
            distance(&a, &b),
            Err(ImagoError::ConfigurationMismatch(_))
        ));
    }

    #[test]
    fn score_is_one_when_everything_matches() {
        assert_eq!(normalized_score(0.0, 0.0), 1.0);
        assert_eq!(normalized_score(2.0, 4.0), 0.5);
        assert_eq!(normalized_score(4.0, 4.0), 0.0);
    }
}
