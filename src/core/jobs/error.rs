//! Job-level errors

use thiserror::Error;

use super::outcome::FailureKind;
use crate::core::llm::GenerationError;
use crate::database::StorageError;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("AI enrichment consent not granted")]
    ConsentDenied,

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Cancelled")]
    Cancelled,
}

impl EnrichmentError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EnrichmentError::ConsentDenied => FailureKind::ConsentDenied,
            EnrichmentError::ProfileNotFound(_) => FailureKind::ProfileNotFound,
            EnrichmentError::Generation(e) => match e {
                GenerationError::Unauthorized => FailureKind::Unauthorized,
                GenerationError::RateLimited { .. } => FailureKind::RateLimited,
                GenerationError::Unreachable(_) => FailureKind::Unreachable,
                GenerationError::InvalidResponse(_) => FailureKind::InvalidResponse,
                GenerationError::Timeout => FailureKind::Timeout,
                GenerationError::NoProviderAvailable => FailureKind::NoProviderAvailable,
            },
            EnrichmentError::Storage(_) => FailureKind::Storage,
            EnrichmentError::Cancelled => FailureKind::Cancelled,
        }
    }

    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            EnrichmentError::Generation(e) => e.retry_after(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
