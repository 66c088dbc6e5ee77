//! Error types for TSS operations

use crate::types::ShareId;
use thiserror::Error;

/// Result type alias for TSS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while keying, rekeying or signing
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid directory or protocol configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Threshold requirements not met
    #[error("Threshold not met: required {required}, got {actual}")]
    ThresholdNotMet { required: usize, actual: usize },

    /// Share id not known to the directory or claims
    #[error("Invalid share ID: {0}")]
    InvalidShareId(ShareId),

    /// Interpolation input without any element
    #[error("At least one {0} is required")]
    EmptyAggregation(&'static str),

    /// Interpolation input with a repeated x-coordinate
    #[error("Share IDs must be distinct, {0} appears more than once")]
    DuplicateShareId(ShareId),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),
}

