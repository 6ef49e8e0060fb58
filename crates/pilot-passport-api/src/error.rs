use std::path::PathBuf;

use pilot_passport_core::LineageError;
use thiserror::Error;

/// Failure of one passport request.
///
/// Absent resources, columns and fields are never errors; they resolve to
/// defaults inside the request.
#[derive(Debug, Error)]
pub enum PassportError {
    /// The career database is not configured, missing, or unreadable. Callers
    /// should ask for a corrected game path and retry.
    #[error("career database unavailable at {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("no pilot matches descriptor `{0}`")]
    NotFound(String),
    #[error(transparent)]
    Lineage(#[from] LineageError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PassportError {
    /// Stable machine-readable code used by the transports.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Lineage(_) => "lineage_corrupt",
            Self::Store(_) => "store_error",
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
