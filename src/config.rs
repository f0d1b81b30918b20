use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::lifecycle::STATIC_STORE_PREFIX;

/// Worker configuration: cache version, asset manifest, and the URL
/// patterns the router intercepts.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Cache generation. Bumping this is the way static assets get
  /// refreshed: install populates `static-<version>`, activate deletes
  /// every other static store.
  pub version: String,
  /// Origin the app shell is served from.
  pub origin: Url,
  /// Relative asset paths cached during install, in order.
  pub manifest: Vec<String>,
  /// Volatile feed endpoint, handled network-first.
  pub feed: EndpointPattern,
  /// Media host, handled cache-first against the media store.
  pub media: EndpointPattern,
}

/// Host plus path prefix identifying an interceptable endpoint.
///
/// The host matches exactly or as a `.`-separated suffix, so `giphy.com`
/// covers `media2.giphy.com` but not `evilgiphy.com`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointPattern {
  pub host: String,
  #[serde(default)]
  pub path_prefix: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shellcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shellcache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/shellcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shellcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shellcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config =
      serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse config: {}", e))?;

    if config.version.is_empty() {
      return Err(eyre!("version must not be empty"));
    }

    Ok(config)
  }

  /// Name of the static store for the configured version.
  pub fn static_store_name(&self) -> String {
    format!("{}{}", STATIC_STORE_PREFIX, self.version)
  }

  /// Absolute URL for a manifest asset path.
  pub fn asset_url(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid asset path {}: {}", path, e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
version: "1.0"
origin: "https://app.example.com"
manifest:
  - index.html
  - main.js
  - images/logo.png
feed:
  host: api.giphy.com
  path_prefix: /v1/gifs/trending
media:
  host: giphy.com
  path_prefix: /media
"#;

  #[test]
  fn test_parse_sample() {
    let config = Config::parse(SAMPLE).unwrap();

    assert_eq!(config.version, "1.0");
    assert_eq!(config.manifest.len(), 3);
    assert_eq!(config.feed.host, "api.giphy.com");
    assert_eq!(config.media.path_prefix, "/media");
  }

  #[test]
  fn test_static_store_name_carries_version() {
    let config = Config::parse(SAMPLE).unwrap();
    assert_eq!(config.static_store_name(), "static-1.0");
  }

  #[test]
  fn test_asset_url_joins_origin() {
    let config = Config::parse(SAMPLE).unwrap();

    let url = config.asset_url("images/logo.png").unwrap();
    assert_eq!(url.as_str(), "https://app.example.com/images/logo.png");
  }

  #[test]
  fn test_empty_version_rejected() {
    let contents = SAMPLE.replace("version: \"1.0\"", "version: \"\"");
    assert!(Config::parse(&contents).is_err());
  }

  #[test]
  fn test_missing_manifest_rejected() {
    assert!(Config::parse("version: \"1.0\"\norigin: \"https://a.com\"").is_err());
  }
}
