//! Error types for the scorecard pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::scorecard::format::RawReadings;

/// Errors that end a single scorecard run.
///
/// A catalog miss is not an error: identification returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum ScorecardError {
    /// The source bytes are not a decodable image.
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Neither the modern nor the legacy layout validated.
    #[error("Unrecognized score format: {0}")]
    UnrecognizedFormat(RawReadings),

    /// The recognition engine failed.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// A recognition call did not answer in time.
    #[error("recognition timed out after {0:?}")]
    RecognitionTimeout(Duration),

    /// The recognizer pool has shut down.
    #[error("recognizer pool is closed")]
    PoolClosed,

    /// The catalog or one of its reference bitmaps could not be read.
    #[error("catalog unavailable: {0}")]
    Catalog(String),
}

impl ScorecardError {
    /// Creates a recognition error from any displayable cause.
    #[must_use]
    pub fn recognition(cause: impl std::fmt::Display) -> Self {
        Self::Recognition(cause.to_string())
    }

    /// Creates a catalog error from any displayable cause.
    #[must_use]
    pub fn catalog(cause: impl std::fmt::Display) -> Self {
        Self::Catalog(cause.to_string())
    }
}

/// Result alias used across the pipeline stages.
pub type ScorecardResult<T> = Result<T, ScorecardError>;
