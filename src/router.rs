//! Request routing: an ordered table of predicate + handler pairs.
//!
//! Only explicitly allow-listed patterns are intercepted; everything
//! else passes through to normal network handling, so third-party
//! traffic (browser-extension requests and the like) is never cached.

use url::{Origin, Url};

use crate::cache::CacheResult;
use crate::config::Config;
use crate::sync::MEDIA_STORE;

/// How a matched request is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
  /// Cache-first against the named store.
  CacheFirst { store: String },
  /// Network-first against the current static store.
  NetworkFirst,
}

/// Predicate a request URL is tested against.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
  /// URL has exactly this origin (scheme, host and port).
  Origin(Origin),
  /// Host equals the pattern host or ends with `.<host>`, and the path
  /// starts with the prefix.
  HostPath { host: String, path_prefix: String },
}

impl RouteMatcher {
  fn matches(&self, url: &Url) -> bool {
    match self {
      Self::Origin(origin) => url.origin() == *origin,
      Self::HostPath { host, path_prefix } => {
        let Some(url_host) = url.host_str() else {
          return false;
        };
        let host_ok = url_host == host
          || url_host
            .strip_suffix(host.as_str())
            .is_some_and(|rest| rest.ends_with('.'));

        host_ok && url.path().starts_with(path_prefix.as_str())
      }
    }
  }
}

/// One predicate + handler pair in the routing table.
#[derive(Debug, Clone)]
pub struct RouteRule {
  pub matcher: RouteMatcher,
  pub action: RouteAction,
}

/// Ordered routing table. First match wins; unmatched requests pass
/// through untouched.
#[derive(Debug, Clone)]
pub struct RouteTable {
  rules: Vec<RouteRule>,
}

impl RouteTable {
  /// Build the routing policy from config: app shell first, then the
  /// feed endpoint, then the media host.
  pub fn from_config(config: &Config) -> Self {
    let rules = vec![
      RouteRule {
        matcher: RouteMatcher::Origin(config.origin.origin()),
        action: RouteAction::CacheFirst {
          store: config.static_store_name(),
        },
      },
      RouteRule {
        matcher: RouteMatcher::HostPath {
          host: config.feed.host.clone(),
          path_prefix: config.feed.path_prefix.clone(),
        },
        action: RouteAction::NetworkFirst,
      },
      RouteRule {
        matcher: RouteMatcher::HostPath {
          host: config.media.host.clone(),
          path_prefix: config.media.path_prefix.clone(),
        },
        action: RouteAction::CacheFirst {
          store: MEDIA_STORE.to_string(),
        },
      },
    ];

    Self { rules }
  }

  /// Classify a request URL against the table, first match wins.
  pub fn classify(&self, url: &Url) -> Option<&RouteAction> {
    self
      .rules
      .iter()
      .find(|rule| rule.matcher.matches(url))
      .map(|rule| &rule.action)
  }
}

/// Result of routing one intercepted request.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
  /// A strategy produced a response.
  Respond(CacheResult),
  /// Network and cache both missed; callers may synthesize a 503.
  Unavailable,
  /// Not intercepted, normal network handling applies.
  PassThrough,
}
