//! `localStorage`-backed session flag.

use crate::storage::{FlagStore, StoreError, StoreResult};
use web_sys::Storage;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageFlagStore;

impl LocalStorageFlagStore {
    pub fn new() -> Self { Self }

    fn storage(&self) -> StoreResult<Storage> {
        let window = web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))
    }
}

impl FlagStore for LocalStorageFlagStore {
    fn load(&self, key: &str) -> StoreResult<Option<bool>> {
        let raw = self.storage()?.get_item(key).map_err(|e| StoreError::Io(format!("{e:?}")))?;
        Ok(match raw.as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => return Err(StoreError::Serialization(format!("unexpected flag value {other:?}"))),
            None => None,
        })
    }

    fn save(&self, key: &str, value: bool) -> StoreResult<()> {
        self.storage()?
            .set_item(key, if value { "true" } else { "false" })
            .map_err(|e| StoreError::Io(format!("{e:?}")))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.storage()?.remove_item(key).map_err(|e| StoreError::Io(format!("{e:?}")))
    }
}
