//! Content-addressed, file-backed store for fitted calibrators.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/<name>/<version_id>/model.json   the fitted calibrator
//! <root>/<name>/<version_id>/meta.json    the registration record
//! ```
//!
//! The version id is derived from the record's content, so re-registering
//! identical content at the same timestamp is idempotent.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use prob_calibrator::CalibratorModel;

/// Hex characters of the content hash kept as the version id.
const VERSION_ID_LEN: usize = 12;

const MODEL_FILE: &str = "model.json";
const META_FILE: &str = "meta.json";

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("calibrator {name} version {version} not found")]
    NotFound { name: String, version: String },
    #[error("no versions registered under {0}")]
    Empty(String),
}

/// Registration record stored next to each persisted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratorRecord {
    pub name: String,
    pub version_id: String,
    pub created_at: DateTime<Utc>,
    /// Location of the serialized model blob.
    pub calibrator_path: PathBuf,
    /// Free-form registration metadata (training window, sample count, ...).
    pub metadata: serde_json::Value,
}

/// File-backed calibrator store with an in-process latest-version cache.
#[derive(Debug)]
pub struct CalibratorRegistry {
    root: PathBuf,
    latest: RwLock<HashMap<String, CalibratorRecord>>,
}

impl CalibratorRegistry {
    /// Open a registry rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            latest: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a fitted model under `name` and return its record.
    pub fn register(
        &self,
        name: &str,
        model: &CalibratorModel,
        metadata: serde_json::Value,
    ) -> Result<CalibratorRecord, RegistryError> {
        let created_at = Utc::now();
        let version_id = version_id(name, &metadata, created_at);
        let dir = self.root.join(name).join(&version_id);
        let record = CalibratorRecord {
            name: name.to_string(),
            version_id: version_id.clone(),
            created_at,
            calibrator_path: dir.join(MODEL_FILE),
            metadata,
        };

        fs::create_dir_all(&dir)?;
        fs::write(&record.calibrator_path, serde_json::to_vec_pretty(model)?)?;
        fs::write(dir.join(META_FILE), serde_json::to_vec_pretty(&record)?)?;

        info!(name, version = %version_id, "registered calibrator");
        if let Ok(mut cache) = self.latest.write() {
            cache.insert(name.to_string(), record.clone());
        }
        Ok(record)
    }

    /// Load one specific version of a calibrator.
    pub fn load(&self, name: &str, version_id: &str) -> Result<CalibratorModel, RegistryError> {
        let path = self.root.join(name).join(version_id).join(MODEL_FILE);
        if !path.exists() {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
                version: version_id.to_string(),
            });
        }
        let model = serde_json::from_slice(&fs::read(path)?)?;
        Ok(model)
    }

    /// Record of the newest version of `name`, by registration time.
    ///
    /// Served from the cache when possible; otherwise rebuilt from disk so
    /// registrations made by other processes are still visible.
    pub fn latest(&self, name: &str) -> Result<CalibratorRecord, RegistryError> {
        if let Ok(cache) = self.latest.read() {
            if let Some(record) = cache.get(name) {
                return Ok(record.clone());
            }
        }

        debug!(name, "latest-version cache miss, scanning disk");
        let mut versions = self.list_versions(name)?;
        let record = versions
            .pop()
            .ok_or_else(|| RegistryError::Empty(name.to_string()))?;
        if let Ok(mut cache) = self.latest.write() {
            cache.insert(name.to_string(), record.clone());
        }
        Ok(record)
    }

    /// Load the newest version of `name`.
    pub fn load_latest(&self, name: &str) -> Result<CalibratorModel, RegistryError> {
        let record = self.latest(name)?;
        self.load(name, &record.version_id)
    }

    /// All registered versions of `name`, oldest first.
    pub fn list_versions(&self, name: &str) -> Result<Vec<CalibratorRecord>, RegistryError> {
        let dir = self.root.join(name);
        if !dir.exists() {
            return Err(RegistryError::Empty(name.to_string()));
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(dir)? {
            let meta_path = entry?.path().join(META_FILE);
            if meta_path.exists() {
                let record: CalibratorRecord = serde_json::from_slice(&fs::read(meta_path)?)?;
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

/// Short hex digest of the record content: name, metadata, and timestamp.
fn version_id(name: &str, metadata: &serde_json::Value, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(metadata.to_string().as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())[..VERSION_ID_LEN].to_string()
}
