//! Handle to a single named store.

use color_eyre::Result;
use std::sync::Arc;

use super::response::StoredResponse;
use super::storage::CacheStorage;

/// A named store opened against a storage backend.
///
/// Opening registers the name with the backend (idempotent), matching
/// the create-if-absent contract of the platform cache API.
pub struct Store<S: CacheStorage> {
  storage: Arc<S>,
  name: String,
}

impl<S: CacheStorage> Store<S> {
  /// Open the named store, creating it if absent.
  pub fn open(storage: Arc<S>, name: &str) -> Result<Self> {
    storage.open_store(name)?;

    Ok(Self {
      storage,
      name: name.to_string(),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn get(&self, url: &str) -> Result<Option<StoredResponse>> {
    self.storage.get(&self.name, url)
  }

  pub fn put(&self, url: &str, response: &StoredResponse) -> Result<()> {
    self.storage.put(&self.name, url, response)
  }

  pub fn delete(&self, url: &str) -> Result<bool> {
    self.storage.delete(&self.name, url)
  }

  pub fn keys(&self) -> Result<Vec<String>> {
    self.storage.keys(&self.name)
  }
}

impl<S: CacheStorage> Clone for Store<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      name: self.name.clone(),
    }
  }
}
