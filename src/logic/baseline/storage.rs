use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::layout::{layout_hash, MODEL_FORMAT_VERSION};
use super::validate::{validate_persisted, BaselineError};
use super::BaselineModel;
use crate::logic::scorer::ScoringConfig;

/// On-disk envelope around the model body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub format_version: u8,
    pub layout_hash: u32,
    /// SHA-256 (hex) of the compact JSON encoding of `model`
    pub checksum: String,
    pub model: serde_json::Value,
}

pub(super) fn checksum(model: &serde_json::Value) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(model)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Save model to disk
pub fn save_model(model: &BaselineModel, path: &Path) -> Result<(), BaselineError> {
    // Ensure directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let body = serde_json::to_value(model)?;
    let persisted = PersistedModel {
        format_version: MODEL_FORMAT_VERSION,
        layout_hash: layout_hash(),
        checksum: checksum(&body)?,
        model: body,
    };

    let json = serde_json::to_vec_pretty(&persisted)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load model from disk with validation
pub fn load_model(path: &Path, config: ScoringConfig) -> Result<BaselineModel, BaselineError> {
    let data = fs::read(path)?;
    let persisted: PersistedModel = serde_json::from_slice(&data)?;

    // Validate version/layout/checksum
    validate_persisted(&persisted)?;

    let mut model: BaselineModel = serde_json::from_value(persisted.model)?;
    model.set_config(config);
    Ok(model)
}
