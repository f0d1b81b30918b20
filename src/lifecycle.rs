//! Install and activate steps for a deployed cache generation.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheStorage, Store, StoredResponse};
use crate::config::Config;
use crate::net::{Fetch, Request};

/// Naming convention for static-generation stores. The version suffix is
/// the sole discriminator between the current store and stale ones.
pub const STATIC_STORE_PREFIX: &str = "static-";

/// True for store names that belong to a static generation other than
/// `current`. The media store never matches.
pub fn is_stale_static_store(name: &str, current: &str) -> bool {
  name.starts_with(STATIC_STORE_PREFIX) && name != current
}

/// Prefetch the manifest into the version's static store.
///
/// Every manifest entry is fetched before anything is written, so one
/// failed or non-success fetch fails the whole install with the store
/// untouched. Returns only once every entry is durably stored; until
/// then the previous generation remains authoritative.
pub async fn install<S, F>(storage: &Arc<S>, fetcher: &F, config: &Config) -> Result<()>
where
  S: CacheStorage + 'static,
  F: Fetch + ?Sized,
{
  let store = Store::open(Arc::clone(storage), &config.static_store_name())?;

  let requests = config
    .manifest
    .iter()
    .map(|path| config.asset_url(path).map(Request::new))
    .collect::<Result<Vec<_>>>()?;

  let fetches = requests.iter().map(|req| fetcher.fetch(req));
  let responses = futures::future::try_join_all(fetches)
    .await
    .map_err(|e| eyre!("Install failed: {}", e))?;

  for (req, fetched) in requests.iter().zip(&responses) {
    if !fetched.is_success() {
      return Err(eyre!(
        "Install failed: {} answered with status {}",
        req.url,
        fetched.status
      ));
    }
  }

  for (req, fetched) in requests.iter().zip(responses) {
    store.put(req.url.as_str(), &StoredResponse::from(fetched))?;
  }

  info!(
    store = store.name(),
    assets = config.manifest.len(),
    "installed static assets"
  );
  Ok(())
}

/// Delete every static-generation store other than the current one.
///
/// Deletions are independent: a failure is logged and the remaining
/// stores are still attempted. The current static store and the media
/// store are never touched. Returns the number of stores removed.
pub fn activate<S: CacheStorage>(storage: &S, config: &Config) -> Result<usize> {
  let current = config.static_store_name();
  let mut removed = 0;

  for name in storage.store_names()? {
    if !is_stale_static_store(&name, &current) {
      continue;
    }

    match storage.delete_store(&name) {
      Ok(()) => {
        info!(store = %name, "deleted stale static store");
        removed += 1;
      }
      Err(e) => warn!(store = %name, error = %e, "failed to delete stale store"),
    }
  }

  Ok(removed)
}
