//! Error types for indexing and retrieval.

use thiserror::Error;

use crate::types::DocId;

/// Errors that can occur while hashing, indexing or searching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImagoError {
    /// Hash parameters, field kind or vector length do not agree.
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// A stored document lacks the requested feature, or it failed to decode.
    #[error("document {doc} has no usable '{field}' feature")]
    MissingFeature { doc: DocId, field: String },

    /// A distance came out NaN or negative.
    #[error("corrupt feature vector for document {doc}: distance {distance}")]
    CorruptVector { doc: DocId, distance: f64 },

    /// Encoded bytes could not be turned back into a vector.
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown feature kind '{0}'")]
    UnknownFeatureKind(String),

    #[error("document {0} not found")]
    DocumentNotFound(DocId),

    /// I/O error while reading or writing hash parameters.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ImagoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImagoError>;
