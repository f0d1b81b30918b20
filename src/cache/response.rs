//! Stored response types and result metadata for cache operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::net::FetchedResponse;

/// Byte-for-byte snapshot of a network response at the time it was cached.
///
/// Mutable only by being overwritten under the same URL or deleted, never
/// partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
  pub url: String,
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  /// When the response came off the network.
  pub fetched_at: DateTime<Utc>,
}

impl From<FetchedResponse> for StoredResponse {
  fn from(res: FetchedResponse) -> Self {
    Self {
      url: res.url,
      status: res.status,
      headers: res.headers,
      body: res.body,
      fetched_at: Utc::now(),
    }
  }
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Fresh from the network
  Network,
  /// Served from cache without a network attempt
  Cache,
  /// Served from cache after the network attempt failed
  Fallback,
}

/// A response produced by a caching strategy, tagged with its source
/// for diagnostics.
#[derive(Debug, Clone)]
pub struct CacheResult {
  pub response: StoredResponse,
  pub source: ResponseSource,
}
