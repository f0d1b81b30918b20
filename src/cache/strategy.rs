//! The two caching strategies applied to intercepted requests.

use color_eyre::Result;
use tracing::{info, warn};

use crate::net::{Fetch, Request};

use super::response::{CacheResult, ResponseSource, StoredResponse};
use super::storage::CacheStorage;
use super::store::Store;

/// Serve from cache, fill from the network on a miss.
///
/// A hit never touches the network; cached content is only refreshed by
/// a version bump replacing the store. On a miss the single network
/// attempt is authoritative, and its failure propagates to the caller.
/// The cache fill is detached and can never fail the returned response.
pub async fn cache_first<S, F>(store: &Store<S>, fetcher: &F, req: &Request) -> Result<CacheResult>
where
  S: CacheStorage + 'static,
  F: Fetch + ?Sized,
{
  if let Some(cached) = store.get(req.url.as_str())? {
    info!(url = %req.url, store = store.name(), "serving from cache");
    return Ok(CacheResult {
      response: cached,
      source: ResponseSource::Cache,
    });
  }

  let fetched = fetcher.fetch(req).await?;
  let response = StoredResponse::from(fetched);

  info!(url = %req.url, store = store.name(), "adding to cache");
  detach_put(store.clone(), req.url.to_string(), response.clone());

  Ok(CacheResult {
    response,
    source: ResponseSource::Network,
  })
}

/// Fetch first, fall back to cache when the network fails or answers
/// outside the 2xx/3xx range.
///
/// Returns `None` when the fallback lookup also misses; the router maps
/// that to an explicit unavailable outcome. Failure responses are never
/// written to the store.
pub async fn network_first<S, F>(
  store: &Store<S>,
  fetcher: &F,
  req: &Request,
) -> Result<Option<CacheResult>>
where
  S: CacheStorage + 'static,
  F: Fetch + ?Sized,
{
  match fetcher.fetch(req).await {
    Ok(fetched) if fetched.is_success() => {
      let response = StoredResponse::from(fetched);

      info!(url = %req.url, store = store.name(), "adding to cache");
      detach_put(store.clone(), req.url.to_string(), response.clone());

      Ok(Some(CacheResult {
        response,
        source: ResponseSource::Network,
      }))
    }
    Ok(fetched) => {
      info!(url = %req.url, status = fetched.status, "failure status, falling back to cache");
      fallback(store, req)
    }
    Err(e) => {
      info!(url = %req.url, error = %e, "network unreachable, falling back to cache");
      fallback(store, req)
    }
  }
}

fn fallback<S: CacheStorage>(store: &Store<S>, req: &Request) -> Result<Option<CacheResult>> {
  match store.get(req.url.as_str())? {
    Some(cached) => {
      info!(url = %req.url, store = store.name(), "serving from cache");
      Ok(Some(CacheResult {
        response: cached,
        source: ResponseSource::Fallback,
      }))
    }
    None => Ok(None),
  }
}

/// Detached cache fill. Errors are logged and discarded so they can
/// never fail the response already handed back to the caller.
fn detach_put<S: CacheStorage + 'static>(store: Store<S>, url: String, response: StoredResponse) {
  tokio::spawn(async move {
    if let Err(e) = store.put(&url, &response) {
      warn!(url = %url, store = store.name(), error = %e, "cache fill failed");
    }
  });
}
