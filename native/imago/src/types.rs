use std::fmt;
use std::str::FromStr;

use crate::error::{ImagoError, Result};

/// Ordinal of a document inside a store.
pub type DocId = u32;

/// Distance metric a feature kind is compared with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Metric {
    L1,
    L2,
    Tanimoto,
}

/// How a feature kind keeps its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    /// One quantised byte per component.
    Bytes,
    /// One `f64` per component.
    Doubles,
}

/// The closed set of descriptors the core understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Color and edge directivity descriptor, 144 quantised bins.
    Cedd,
    /// Fuzzy color and texture histogram, 192 quantised bins.
    Fcth,
    /// MPEG-7 edge histogram, 80 bins.
    EdgeHistogram,
    /// Plain color histogram of arbitrary size.
    ColorHistogram,
    /// Generic double histogram compared with L2.
    DoubleHistogram,
    /// Generic byte histogram compared with L2.
    ByteHistogram,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 6] = [
        FeatureKind::Cedd,
        FeatureKind::Fcth,
        FeatureKind::EdgeHistogram,
        FeatureKind::ColorHistogram,
        FeatureKind::DoubleHistogram,
        FeatureKind::ByteHistogram,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Cedd => "CEDD",
            FeatureKind::Fcth => "FCTH",
            FeatureKind::EdgeHistogram => "EdgeHistogram",
            FeatureKind::ColorHistogram => "ColorHistogram",
            FeatureKind::DoubleHistogram => "DoubleHistogram",
            FeatureKind::ByteHistogram => "ByteHistogram",
        }
    }

    pub fn storage(self) -> Storage {
        match self {
            FeatureKind::Cedd
            | FeatureKind::Fcth
            | FeatureKind::EdgeHistogram
            | FeatureKind::ByteHistogram => Storage::Bytes,
            FeatureKind::ColorHistogram | FeatureKind::DoubleHistogram => Storage::Doubles,
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            FeatureKind::Cedd | FeatureKind::Fcth => Metric::Tanimoto,
            FeatureKind::EdgeHistogram | FeatureKind::ColorHistogram => Metric::L1,
            FeatureKind::DoubleHistogram | FeatureKind::ByteHistogram => Metric::L2,
        }
    }

    /// Component count for descriptors with a fixed layout.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            FeatureKind::Cedd => Some(144),
            FeatureKind::Fcth => Some(192),
            FeatureKind::EdgeHistogram => Some(80),
            _ => None,
        }
    }

    fn check_len(self, len: usize) -> Result<()> {
        match self.fixed_len() {
            Some(expected) if expected != len => Err(ImagoError::ConfigurationMismatch(format!(
                "{} expects {} components, got {}",
                self.name(),
                expected,
                len
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = ImagoError;

    fn from_str(s: &str) -> Result<Self> {
        FeatureKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ImagoError::UnknownFeatureKind(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Components {
    Bytes(Vec<u8>),
    Doubles(Vec<f64>),
}

/// An extracted feature vector, tagged with its kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    kind: FeatureKind,
    components: Components,
}

impl Feature {
    pub fn from_bytes(kind: FeatureKind, values: Vec<u8>) -> Result<Self> {
        if kind.storage() != Storage::Bytes {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "{kind} stores doubles, not bytes"
            )));
        }
        kind.check_len(values.len())?;
        Ok(Self {
            kind,
            components: Components::Bytes(values),
        })
    }

    pub fn from_doubles(kind: FeatureKind, values: Vec<f64>) -> Result<Self> {
        if kind.storage() != Storage::Doubles {
            return Err(ImagoError::ConfigurationMismatch(format!(
                "{kind} stores bytes, not doubles"
            )));
        }
        kind.check_len(values.len())?;
        Ok(Self {
            kind,
            components: Components::Doubles(values),
        })
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn len(&self) -> usize {
        match &self.components {
            Components::Bytes(v) => v.len(),
            Components::Doubles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Components widened to `f64`, as the hash families consume them.
    pub fn to_f64(&self) -> Vec<f64> {
        match &self.components {
            Components::Bytes(v) => v.iter().map(|&b| f64::from(b)).collect(),
            Components::Doubles(v) => v.clone(),
        }
    }
}

/// One hash token: the bundle it came from and the value it hashed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashTerm {
    pub bundle: u32,
    pub value: i32,
}

impl HashTerm {
    pub fn new(bundle: u32, value: i32) -> Self {
        Self { bundle, value }
    }
}

impl fmt::Display for HashTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bundle, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_resolve_by_name() {
        for kind in FeatureKind::ALL {
            assert_eq!(kind.name().parse::<FeatureKind>().unwrap(), kind);
        }
        assert_eq!("cedd".parse::<FeatureKind>().unwrap(), FeatureKind::Cedd);
        assert!(matches!(
            "SIFT".parse::<FeatureKind>(),
            Err(ImagoError::UnknownFeatureKind(_))
        ));
    }

    #[test]
    fn fixed_length_is_enforced() {
        assert!(Feature::from_bytes(FeatureKind::Cedd, vec![0; 144]).is_ok());
        assert!(matches!(
            Feature::from_bytes(FeatureKind::Cedd, vec![0; 10]),
            Err(ImagoError::ConfigurationMismatch(_))
        ));
    }

    #[test]
    fn storage_is_enforced() {
        assert!(Feature::from_doubles(FeatureKind::Fcth, vec![0.0; 192]).is_err());
        assert!(Feature::from_bytes(FeatureKind::ColorHistogram, vec![1, 2]).is_err());
    }
}
