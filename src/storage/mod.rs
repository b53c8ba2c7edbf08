//! Durable flag storage
//!
//! The session keeps exactly one boolean outside process memory: whether the
//! user's last action was "connected". Browsers back it with `localStorage`
//! (see `wasm::LocalStorageFlagStore`), native hosts with a JSON file.

#[cfg(feature = "native")]
mod file;

#[cfg(feature = "native")]
pub use file::FileFlagStore;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(String),
    #[error("storage serialization: {0}")]
    Serialization(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence scoped to the application origin.
pub trait FlagStore {
    fn load(&self, key: &str) -> StoreResult<Option<bool>>;
    fn save(&self, key: &str, value: bool) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Process-local store. Clones share the same map, so a test can keep one
/// handle and inspect what the session wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlagStore {
    flags: Rc<RefCell<BTreeMap<String, bool>>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_flag(key: &str, value: bool) -> Self {
        let store = Self::new();
        store.flags.borrow_mut().insert(key.to_string(), value);
        store
    }

    pub fn get(&self, key: &str) -> Option<bool> { self.flags.borrow().get(key).copied() }
}

impl FlagStore for MemoryFlagStore {
    fn load(&self, key: &str) -> StoreResult<Option<bool>> { Ok(self.get(key)) }

    fn save(&self, key: &str, value: bool) -> StoreResult<()> {
        self.flags.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.flags.borrow_mut().remove(key);
        Ok(())
    }
}
