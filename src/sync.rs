//! Cross-context sync channel: media-store pruning driven by the app.
//!
//! After the application refreshes its feed it posts the list of media
//! URLs it currently shows. Everything else in the media store is
//! deleted; this is the store's sole eviction mechanism (no TTL, no LRU).

use std::collections::HashSet;

use color_eyre::Result;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::{CacheStorage, Store};

/// Name of the unversioned store holding fetched media.
pub const MEDIA_STORE: &str = "giphy";

/// Wire payload posted by the application.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action")]
pub enum SyncMessage {
  #[serde(rename = "cleanGiphyCache")]
  CleanGiphyCache { giphys: Vec<String> },
}

impl SyncMessage {
  /// Parse a raw message. Malformed or unknown payloads are ignored,
  /// never raised.
  pub fn parse(raw: &str) -> Option<Self> {
    match serde_json::from_str(raw) {
      Ok(msg) => Some(msg),
      Err(e) => {
        debug!(error = %e, "ignoring malformed sync message");
        None
      }
    }
  }
}

/// Delete every cached entry whose URL is not in the wanted set.
///
/// An empty set evicts everything; wanted URLs that are not cached are
/// no-ops. Returns the number of entries removed.
pub fn clean_media_cache<S: CacheStorage>(store: &Store<S>, wanted: &[String]) -> Result<usize> {
  let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
  let mut removed = 0;

  for url in store.keys()? {
    if !wanted.contains(url.as_str()) && store.delete(&url)? {
      removed += 1;
    }
  }

  if removed > 0 {
    info!(removed, store = store.name(), "pruned media cache");
  }
  Ok(removed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{SqliteStorage, StoredResponse};
  use chrono::Utc;
  use std::sync::Arc;

  fn media_store() -> Store<SqliteStorage> {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    Store::open(storage, MEDIA_STORE).unwrap()
  }

  fn fill(store: &Store<SqliteStorage>, urls: &[&str]) {
    for url in urls {
      let response = StoredResponse {
        url: url.to_string(),
        status: 200,
        headers: Vec::new(),
        body: b"gif".to_vec(),
        fetched_at: Utc::now(),
      };
      store.put(url, &response).unwrap();
    }
  }

  #[test]
  fn test_parse_clean_message() {
    let msg = SyncMessage::parse(
      r#"{"action": "cleanGiphyCache", "giphys": ["https://media.giphy.com/media/a/giphy.gif"]}"#,
    );

    let Some(SyncMessage::CleanGiphyCache { giphys }) = msg else {
      panic!("expected CleanGiphyCache");
    };
    assert_eq!(giphys.len(), 1);
  }

  #[test]
  fn test_malformed_messages_are_ignored() {
    assert!(SyncMessage::parse("not json").is_none());
    assert!(SyncMessage::parse(r#"{"action": "dropTables"}"#).is_none());
    assert!(SyncMessage::parse(r#"{"action": "cleanGiphyCache"}"#).is_none());
    assert!(SyncMessage::parse(r#"{"giphys": []}"#).is_none());
  }

  #[test]
  fn test_clean_keeps_only_wanted() {
    let store = media_store();
    fill(&store, &["https://m.gif/a", "https://m.gif/b", "https://m.gif/c"]);

    let removed = clean_media_cache(&store, &["https://m.gif/b".to_string()]).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(store.keys().unwrap(), vec!["https://m.gif/b"]);
  }

  #[test]
  fn test_empty_wanted_set_evicts_everything() {
    let store = media_store();
    fill(&store, &["https://m.gif/a", "https://m.gif/b"]);

    let removed = clean_media_cache(&store, &[]).unwrap();

    assert_eq!(removed, 2);
    assert!(store.keys().unwrap().is_empty());
  }

  #[test]
  fn test_unknown_wanted_urls_are_noops() {
    let store = media_store();
    fill(&store, &["https://m.gif/a"]);

    let wanted = vec!["https://m.gif/a".to_string(), "https://m.gif/z".to_string()];
    let removed = clean_media_cache(&store, &wanted).unwrap();

    assert_eq!(removed, 0);
    assert_eq!(store.keys().unwrap(), vec!["https://m.gif/a"]);
  }
}
