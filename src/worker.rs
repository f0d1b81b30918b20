//! The process-wide worker instance: lifecycle state plus event dispatch.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{strategy, CacheStorage, Store};
use crate::config::Config;
use crate::lifecycle;
use crate::net::{Fetch, Request};
use crate::router::{RouteAction, RouteOutcome, RouteTable};
use crate::sync::{self, SyncMessage, MEDIA_STORE};

/// Lifecycle states of a deployed worker version.
///
/// Several versions may sit in `Installed` (waiting) at once; only one
/// is `Active` and serves requests against its static store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Installing,
  Installed,
  Activating,
  Active,
}

/// One worker per deployed version.
///
/// All cross-cutting state (current version, store names, routing
/// policy) lives here rather than in ambient globals.
pub struct Worker<S: CacheStorage, F: Fetch> {
  config: Config,
  storage: Arc<S>,
  fetcher: F,
  routes: RouteTable,
  state: WorkerState,
}

impl<S: CacheStorage + 'static, F: Fetch> Worker<S, F> {
  pub fn new(config: Config, storage: S, fetcher: F) -> Self {
    let routes = RouteTable::from_config(&config);

    Self {
      config,
      storage: Arc::new(storage),
      fetcher,
      routes,
      state: WorkerState::Installing,
    }
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn storage(&self) -> &Arc<S> {
    &self.storage
  }

  /// Install trigger. Resolves only once the manifest is fully cached;
  /// on failure the previous generation keeps serving.
  pub async fn install(&mut self) -> Result<()> {
    if self.state != WorkerState::Installing {
      return Err(eyre!("Install is only valid in the installing state"));
    }

    lifecycle::install(&self.storage, &self.fetcher, &self.config).await?;
    self.state = WorkerState::Installed;
    Ok(())
  }

  /// Activate trigger. Resolves only once stale static stores are
  /// purged (best effort per store). Returns the number removed.
  pub fn activate(&mut self) -> Result<usize> {
    if self.state != WorkerState::Installed {
      return Err(eyre!("Activate is only valid in the installed state"));
    }

    self.state = WorkerState::Activating;
    match lifecycle::activate(self.storage.as_ref(), &self.config) {
      Ok(removed) => {
        self.state = WorkerState::Active;
        Ok(removed)
      }
      Err(e) => {
        // Enumeration failed before any deletion; allow a retry.
        self.state = WorkerState::Installed;
        Err(e)
      }
    }
  }

  /// Fetch interception: route the request through the pattern table,
  /// or decline it.
  pub async fn handle_fetch(&self, req: &Request) -> Result<RouteOutcome> {
    let action = match self.routes.classify(&req.url) {
      Some(action) => action.clone(),
      None => {
        debug!(url = %req.url, "not intercepted");
        return Ok(RouteOutcome::PassThrough);
      }
    };

    match action {
      RouteAction::CacheFirst { store } => {
        let store = Store::open(Arc::clone(&self.storage), &store)?;
        let result = strategy::cache_first(&store, &self.fetcher, req).await?;
        Ok(RouteOutcome::Respond(result))
      }
      RouteAction::NetworkFirst => {
        let store = Store::open(Arc::clone(&self.storage), &self.config.static_store_name())?;
        match strategy::network_first(&store, &self.fetcher, req).await? {
          Some(result) => Ok(RouteOutcome::Respond(result)),
          None => Ok(RouteOutcome::Unavailable),
        }
      }
    }
  }

  /// Sync message from the application. Malformed payloads are ignored.
  /// Returns the number of media entries pruned.
  pub fn handle_message(&self, raw: &str) -> Result<usize> {
    match SyncMessage::parse(raw) {
      Some(SyncMessage::CleanGiphyCache { giphys }) => {
        let store = Store::open(Arc::clone(&self.storage), MEDIA_STORE)?;
        sync::clean_media_cache(&store, &giphys)
      }
      None => Ok(0),
    }
  }
}
