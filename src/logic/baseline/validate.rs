use thiserror::Error;

use super::layout::{validate_layout, LayoutMismatch};
use super::storage::{checksum, PersistedModel};

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization Error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Baseline Layout Mismatch: Expected v{expected_version} ({expected_hash:08x}), Got v{actual_version} ({actual_hash:08x})")]
    LayoutMismatch {
        expected_version: u8,
        expected_hash: u32,
        actual_version: u8,
        actual_hash: u32,
    },

    #[error("Baseline Checksum Mismatch: Expected {expected}, Got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl BaselineError {
    /// Persisted state exists but cannot be trusted
    pub fn is_corruption(&self) -> bool {
        !matches!(self, BaselineError::IoError(_))
    }
}

impl From<LayoutMismatch> for BaselineError {
    fn from(e: LayoutMismatch) -> Self {
        BaselineError::LayoutMismatch {
            expected_version: e.expected_version,
            expected_hash: e.expected_hash,
            actual_version: e.actual_version,
            actual_hash: e.actual_hash,
        }
    }
}

/// Validate a persisted model header and body before decoding it
pub fn validate_persisted(persisted: &PersistedModel) -> Result<(), BaselineError> {
    validate_layout(persisted.format_version, persisted.layout_hash)?;

    let actual = checksum(&persisted.model)?;
    if actual != persisted.checksum {
        return Err(BaselineError::ChecksumMismatch {
            expected: persisted.checksum.clone(),
            actual,
        });
    }

    Ok(())
}
