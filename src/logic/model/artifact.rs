//! Model Artifact - JSON blob + SHA-256 sidecar
//!
//! `<path>` holds the serialized model wrapped with layout metadata,
//! `<path>.sha256` holds the hex digest of those bytes. A digest mismatch
//! makes the artifact unreadable; a missing sidecar is tolerated.

use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::features::layout::{validate_layout, LayoutInfo};
use super::scorer::ScorerError;

/// On-disk envelope around a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub algorithm: String,
    pub layout: LayoutInfo,
    pub trained_at: DateTime<Utc>,
    pub model: M,
}

/// Path of the checksum file next to `path`
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Write `model` and its checksum
pub fn write_artifact<M: Serialize>(path: &Path, algorithm: &str, model: &M) -> Result<(), ScorerError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let artifact = ModelArtifact {
        algorithm: algorithm.to_string(),
        layout: LayoutInfo::current(),
        trained_at: Utc::now(),
        model,
    };

    let bytes = serde_json::to_vec(&artifact)?;
    fs::write(path, &bytes)?;
    fs::write(checksum_path(path), sha256_hex(&bytes))?;

    log::info!("Model artifact written: {:?} ({} bytes)", path, bytes.len());
    Ok(())
}

/// Read and verify an artifact written by [`write_artifact`]
pub fn read_artifact<M: DeserializeOwned>(path: &Path) -> Result<ModelArtifact<M>, ScorerError> {
    let bytes = fs::read(path)?;

    match fs::read_to_string(checksum_path(path)) {
        Ok(expected) => {
            let expected = expected.trim().to_lowercase();
            let actual = sha256_hex(&bytes);
            if expected != actual {
                return Err(ScorerError::ChecksumMismatch { expected, actual });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("No checksum next to {:?}, loading unverified", path);
        }
        Err(e) => return Err(e.into()),
    }

    let artifact: ModelArtifact<M> = serde_json::from_slice(&bytes)?;
    validate_layout(artifact.layout.version, artifact.layout.hash)?;

    Ok(artifact)
}
