//! Atomic persistence of [`ModelBundle`]s.
//!
//! File layout: a bincode-encoded [`ArtifactEnvelope`] whose payload is the
//! bincode-encoded bundle. bincode keeps `f64` bit patterns, so a reloaded
//! bundle scores identically to the one that was saved.
//!
//! Writes go to a temporary file in the target directory, are synced, and are
//! then renamed over the destination, so a reader never observes a partial
//! artifact.

use crate::bundle::ModelBundle;
use crate::errors::{CreditError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Current on-disk format version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Framing written around the encoded bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    pub format_version: u32,
    /// Unix seconds at save time
    pub created_at: i64,
    pub crate_version: String,
    /// Blake3 hex digest of `payload`
    pub checksum: String,
    pub payload: Vec<u8>,
}

impl ArtifactEnvelope {
    pub fn seal(bundle: &ModelBundle) -> Result<Self> {
        let payload = bincode::serialize(bundle)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: chrono::Utc::now().timestamp(),
            crate_version: crate::VERSION.to_string(),
            checksum: checksum_hex(&payload),
            payload,
        })
    }

    /// Verify framing and decode the contained bundle
    pub fn open(&self) -> Result<ModelBundle> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(CreditError::Artifact(format!(
                "unsupported format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let actual = checksum_hex(&self.payload);
        if actual != self.checksum {
            return Err(CreditError::Artifact(format!(
                "checksum mismatch: header {}, payload {}",
                self.checksum, actual
            )));
        }

        let bundle: ModelBundle = bincode::deserialize(&self.payload)
            .map_err(|e| CreditError::Artifact(format!("failed to decode bundle: {e}")))?;
        bundle.validate()?;
        Ok(bundle)
    }
}

fn checksum_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Save a bundle to `path`, replacing any existing file atomically
pub fn save_bundle(bundle: &ModelBundle, path: &Path) -> Result<()> {
    bundle.validate()?;
    let envelope = ArtifactEnvelope::seal(bundle)?;
    let encoded = bincode::serialize(&envelope)?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)?;

    let mut temp = NamedTempFile::new_in(&parent)?;
    temp.write_all(&encoded)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        CreditError::Artifact(format!(
            "persist model to {} failed: {}",
            path.display(),
            e.error
        ))
    })?;

    info!(
        path = %path.display(),
        bytes = encoded.len(),
        model = %bundle.metrics.model_type,
        "model bundle saved"
    );
    Ok(())
}

/// Load and verify a bundle previously written by [`save_bundle`]
pub fn load_bundle(path: &Path) -> Result<ModelBundle> {
    let raw = fs::read(path)?;
    let envelope: ArtifactEnvelope = bincode::deserialize(&raw).map_err(|e| {
        CreditError::Artifact(format!("{} is not a model artifact: {}", path.display(), e))
    })?;
    let bundle = envelope.open()?;

    info!(
        path = %path.display(),
        created_at = envelope.created_at,
        saved_by = %envelope.crate_version,
        model = %bundle.metrics.model_type,
        "model bundle loaded"
    );
    Ok(bundle)
}
