//! Envelope carrier errors.

use thiserror::Error;

/// Failure to read or write the `x-md-operator` envelope.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Carrier has no entries at all
    #[error("no metadata in carrier")]
    NoMetadata,

    /// Envelope header absent or empty
    #[error("no operator header in metadata")]
    NoOperatorHeader,

    /// Envelope could not be decoded or encoded
    #[error("invalid operator envelope: {reason}")]
    InvalidOperator {
        /// Which step failed
        reason: &'static str,
    },

    /// Decode was handed an empty string
    #[error("empty operator string")]
    EmptyOperatorString,
}
