//! Error types for ga4-serverside

use thiserror::Error;

/// Main error type for the ga4-serverside library
///
/// Only configuration problems are fatal and surface as errors; runtime
/// failures (delivery, payload serialization) are logged where they
/// happen and never cross the pipeline boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (missing credentials, bad exclusion pattern)
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for ga4-serverside
pub type Result<T> = std::result::Result<T, Error>;
