//! JSON file write-through preset store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::event::timestamp;
use crate::wire::null_as_default;

/// A saved request preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preset {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub auth_mode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub auth_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub auth_value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
}

/// Errors from reading or writing the preset file.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("preset file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory presets mirrored to a JSON file on every write.
pub struct PresetStore {
    path: PathBuf,
    inventory: Mutex<Inventory>,
    /// Version of the snapshot last written to disk.
    written: tokio::sync::Mutex<u64>,
}

#[derive(Default)]
struct Inventory {
    presets: HashMap<String, Preset>,
    version: u64,
}

impl PresetStore {
    /// Create an empty store backed by `path` without touching the disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inventory: Mutex::new(Inventory::default()),
            written: tokio::sync::Mutex::new(0),
        }
    }

    /// Open the store, loading `path` if it exists.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PresetError> {
        let store = Self::new(path);
        if store.path.exists() {
            let content = fs::read(&store.path)?;
            let list: Vec<Preset> = serde_json::from_slice(&content)?;
            let count = {
                let mut inventory = store.lock();
                for preset in list.into_iter().filter(|p| !p.id.is_empty()) {
                    inventory.presets.insert(preset.id.clone(), preset);
                }
                inventory.presets.len()
            };
            tracing::info!(path = %store.path.display(), count, "Loaded presets");
        }
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All presets, most recently updated first.
    pub fn list(&self) -> Vec<Preset> {
        let mut out: Vec<Preset> = self.lock().presets.values().cloned().collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        out
    }

    /// Insert or replace a preset and persist the whole set.
    ///
    /// The file is written after the in-memory lock is released. A snapshot
    /// older than the one already on disk is skipped, so concurrent upserts
    /// never roll the file back.
    pub async fn upsert(&self, mut preset: Preset) -> Result<Preset, PresetError> {
        let (version, json) = {
            let mut inventory = self.lock();
            if preset.id.is_empty() {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                preset.id = format!("p_{nanos}");
            }
            preset.updated_at = timestamp();
            inventory.presets.insert(preset.id.clone(), preset.clone());
            inventory.version += 1;

            let list: Vec<&Preset> = inventory.presets.values().collect();
            (inventory.version, serde_json::to_vec_pretty(&list)?)
        };

        let mut written = self.written.lock().await;
        if *written < version {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&self.path, json).await?;
            *written = version;
        }

        tracing::debug!(id = %preset.id, path = %self.path.display(), version, "Preset saved");
        Ok(preset)
    }
}
