//! JSON-file flag store for native hosts.

use super::{FlagStore, StoreError, StoreResult};
use crate::core::keys::env;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    /// Store at `<root>/<app>/session.json`, where root is `AVALAUNCH_ROOT`
    /// or the platform's local data directory.
    pub fn open(app: &str) -> Self {
        let root = std::env::var(env::ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
        Self::at(root.join(app).join("session.json"))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn read_all(&self) -> StoreResult<BTreeMap<String, bool>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io(format!("read: {e}")))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write_all(&self, flags: &BTreeMap<String, bool>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("mkdir: {e}")))?;
        }
        let raw = serde_json::to_string_pretty(flags).map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| StoreError::Io(format!("write: {e}")))
    }
}

impl FlagStore for FileFlagStore {
    fn load(&self, key: &str) -> StoreResult<Option<bool>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&self, key: &str, value: bool) -> StoreResult<()> {
        let mut flags = self.read_all()?;
        flags.insert(key.to_string(), value);
        self.write_all(&flags)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut flags = self.read_all()?;
        if flags.remove(key).is_some() {
            self.write_all(&flags)?;
        }
        Ok(())
    }
}
