//! Cache storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

use super::response::StoredResponse;

/// Trait for cache storage backends.
///
/// A backend holds any number of named stores, each mapping a request URL
/// to a stored response. Failures propagate to the caller; only the
/// strategies' fire-and-forget fills are allowed to swallow them.
pub trait CacheStorage: Send + Sync {
  /// Register a named store. Creates it if absent, no-op otherwise.
  fn open_store(&self, name: &str) -> Result<()>;

  /// Look up a stored response by URL.
  fn get(&self, store: &str, url: &str) -> Result<Option<StoredResponse>>;

  /// Store a response, overwriting any existing entry for the URL.
  fn put(&self, store: &str, url: &str, response: &StoredResponse) -> Result<()>;

  /// Remove an entry. Returns true when an entry existed.
  fn delete(&self, store: &str, url: &str) -> Result<bool>;

  /// URLs currently present in the store, oldest first.
  fn keys(&self, store: &str) -> Result<Vec<String>>;

  /// Names of all registered stores.
  fn store_names(&self) -> Result<Vec<String>>;

  /// Drop a store and everything in it. Unknown names are an error.
  fn delete_store(&self, name: &str) -> Result<()>;
}

/// SQLite-based cache storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::init(conn)
  }

  /// Open an in-memory storage, used in tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;

    Self::init(conn)
  }

  fn init(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("shellcache").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Registry of named stores; open_store creates rows, delete_store removes them
CREATE TABLE IF NOT EXISTS stores (
    name TEXT PRIMARY KEY
);

-- One row per cached response, keyed by store and request URL
CREATE TABLE IF NOT EXISTS entries (
    store TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY (store, url)
);

CREATE INDEX IF NOT EXISTS idx_entries_store ON entries(store);
"#;

impl CacheStorage for SqliteStorage {
  fn open_store(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![name])
      .map_err(|e| eyre!("Failed to open store {}: {}", name, e))?;

    Ok(())
  }

  fn get(&self, store: &str, url: &str) -> Result<Option<StoredResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u16, String, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, headers, body, fetched_at FROM entries
         WHERE store = ? AND url = ?",
        params![store, url],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read entry {} from {}: {}", url, store, e))?;

    match row {
      Some((status, headers, body, fetched_at)) => {
        let headers = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to parse stored headers for {}: {}", url, e))?;
        let fetched_at = chrono::DateTime::parse_from_rfc3339(&fetched_at)
          .map_err(|e| eyre!("Failed to parse fetched_at for {}: {}", url, e))?
          .with_timezone(&chrono::Utc);

        Ok(Some(StoredResponse {
          url: url.to_string(),
          status,
          headers,
          body,
          fetched_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, store: &str, url: &str, response: &StoredResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers = serde_json::to_string(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    conn
      .execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![store])
      .map_err(|e| eyre!("Failed to register store {}: {}", store, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO entries (store, url, status, headers, body, fetched_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
          store,
          url,
          response.status,
          headers,
          response.body,
          response.fetched_at.to_rfc3339(),
        ],
      )
      .map_err(|e| eyre!("Failed to store entry {} in {}: {}", url, store, e))?;

    Ok(())
  }

  fn delete(&self, store: &str, url: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute(
        "DELETE FROM entries WHERE store = ? AND url = ?",
        params![store, url],
      )
      .map_err(|e| eyre!("Failed to delete entry {} from {}: {}", url, store, e))?;

    Ok(removed > 0)
  }

  fn keys(&self, store: &str) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT url FROM entries WHERE store = ? ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare key query: {}", e))?;

    let urls = stmt
      .query_map(params![store], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list keys of {}: {}", store, e))?
      .collect::<std::result::Result<Vec<String>, _>>()
      .map_err(|e| eyre!("Failed to read keys of {}: {}", store, e))?;

    Ok(urls)
  }

  fn store_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM stores ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare store query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list stores: {}", e))?
      .collect::<std::result::Result<Vec<String>, _>>()
      .map_err(|e| eyre!("Failed to read store names: {}", e))?;

    Ok(names)
  }

  fn delete_store(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let removed = conn
      .execute("DELETE FROM stores WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete store {}: {}", name, e))?;

    if removed == 0 {
      return Err(eyre!("Store not found: {}", name));
    }

    conn
      .execute("DELETE FROM entries WHERE store = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn response(url: &str, body: &[u8]) -> StoredResponse {
    StoredResponse {
      url: url.to_string(),
      status: 200,
      headers: vec![("content-type".to_string(), "text/html".to_string())],
      body: body.to_vec(),
      fetched_at: Utc::now(),
    }
  }

  #[test]
  fn test_put_get_roundtrip() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let res = response("https://example.com/index.html", b"<html>");

    storage.put("static-1.0", &res.url, &res).unwrap();

    let stored = storage
      .get("static-1.0", "https://example.com/index.html")
      .unwrap()
      .unwrap();
    assert_eq!(stored.status, 200);
    assert_eq!(stored.body, b"<html>");
    assert_eq!(stored.headers, res.headers);
  }

  #[test]
  fn test_get_missing_is_none() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open_store("static-1.0").unwrap();

    let stored = storage.get("static-1.0", "https://example.com/nope").unwrap();
    assert!(stored.is_none());
  }

  #[test]
  fn test_put_overwrites() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let url = "https://example.com/main.js";

    storage.put("static-1.0", url, &response(url, b"old")).unwrap();
    storage.put("static-1.0", url, &response(url, b"new")).unwrap();

    let stored = storage.get("static-1.0", url).unwrap().unwrap();
    assert_eq!(stored.body, b"new");
    assert_eq!(storage.keys("static-1.0").unwrap().len(), 1);
  }

  #[test]
  fn test_stores_are_isolated() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let url = "https://example.com/index.html";

    storage.put("static-1.0", url, &response(url, b"a")).unwrap();

    assert!(storage.get("giphy", url).unwrap().is_none());
  }

  #[test]
  fn test_delete_reports_presence() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let url = "https://example.com/index.html";
    storage.put("static-1.0", url, &response(url, b"a")).unwrap();

    assert!(storage.delete("static-1.0", url).unwrap());
    assert!(!storage.delete("static-1.0", url).unwrap());
  }

  #[test]
  fn test_keys_in_insertion_order() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    for url in ["https://e.com/b", "https://e.com/a", "https://e.com/c"] {
      storage.put("giphy", url, &response(url, b"x")).unwrap();
    }

    assert_eq!(
      storage.keys("giphy").unwrap(),
      vec!["https://e.com/b", "https://e.com/a", "https://e.com/c"]
    );
  }

  #[test]
  fn test_open_store_is_idempotent() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.open_store("giphy").unwrap();
    storage.open_store("giphy").unwrap();

    assert_eq!(storage.store_names().unwrap(), vec!["giphy"]);
  }

  #[test]
  fn test_delete_store_removes_entries() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let url = "https://example.com/index.html";
    storage.put("static-0.9", url, &response(url, b"a")).unwrap();
    storage.put("static-1.0", url, &response(url, b"b")).unwrap();

    storage.delete_store("static-0.9").unwrap();

    assert_eq!(storage.store_names().unwrap(), vec!["static-1.0"]);
    assert!(storage.keys("static-0.9").unwrap().is_empty());
    assert!(storage.get("static-1.0", url).unwrap().is_some());
  }

  #[test]
  fn test_delete_unknown_store_fails() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert!(storage.delete_store("static-0.1").is_err());
  }
}
