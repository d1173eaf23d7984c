//! Error types for BOM construction and resolution.

use thiserror::Error;

use crate::part::PartError;

/// Errors that abort building or resolving a bill of materials.
///
/// Part refresh failures are not represented here: they stay on the part and
/// surface through [`Bom::is_valid`](super::Bom::is_valid).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BomError {
    /// Adding another distinct part would exceed the configured maximum.
    #[error(
        "maximum part limit exceeded: {maximum}\n  Suggestion: Raise the limit with --max-parts, or use 0 for unlimited"
    )]
    LimitExceeded {
        /// The configured maximum number of distinct parts.
        maximum: usize,
    },

    /// The root part could not be created.
    #[error("cannot create root part: {0}")]
    Part(#[from] PartError),
}

impl BomError {
    /// Creates a `LimitExceeded` error.
    #[must_use]
    pub fn limit_exceeded(maximum: usize) -> Self {
        Self::LimitExceeded { maximum }
    }
}
