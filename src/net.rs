//! Network types and the fetch seam used by the caching strategies.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use url::Url;

/// An outbound request intercepted by the worker.
///
/// The URL doubles as the request identity for cache lookups.
#[derive(Debug, Clone)]
pub struct Request {
  pub url: Url,
}

impl Request {
  pub fn new(url: Url) -> Self {
    Self { url }
  }

  pub fn parse(url: &str) -> Result<Self> {
    let url = Url::parse(url).map_err(|e| eyre!("Invalid request URL {}: {}", url, e))?;
    Ok(Self { url })
  }
}

/// A response as it came off the network.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
  pub url: String,
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl FetchedResponse {
  /// The 2xx/3xx range the strategies treat as a usable response.
  pub fn is_success(&self) -> bool {
    (200..400).contains(&self.status)
  }
}

/// Abstraction over the HTTP client so strategies and lifecycle steps
/// can be driven without a network in tests.
///
/// A single attempt per call; retries are deliberately out of scope.
#[async_trait]
pub trait Fetch: Send + Sync {
  async fn fetch(&self, req: &Request) -> Result<FetchedResponse>;
}

/// reqwest-backed fetcher used outside of tests.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Fetch for HttpFetcher {
  async fn fetch(&self, req: &Request) -> Result<FetchedResponse> {
    let res = self
      .client
      .get(req.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", req.url, e))?;

    let status = res.status().as_u16();
    let url = res.url().to_string();
    let headers = res
      .headers()
      .iter()
      .map(|(name, value)| {
        (
          name.to_string(),
          String::from_utf8_lossy(value.as_bytes()).into_owned(),
        )
      })
      .collect();

    let body = res
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body from {}: {}", req.url, e))?
      .to_vec();

    Ok(FetchedResponse {
      url,
      status,
      headers,
      body,
    })
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  /// In-memory fetcher keyed by URL, for driving strategies in tests.
  ///
  /// URLs without a registered response fail as if the network were down.
  pub struct FakeFetcher {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: AtomicUsize,
  }

  impl FakeFetcher {
    pub fn new() -> Self {
      Self {
        responses: Mutex::new(HashMap::new()),
        calls: AtomicUsize::new(0),
      }
    }

    pub fn respond(&self, url: &str, status: u16, body: &[u8]) {
      self
        .responses
        .lock()
        .unwrap()
        .insert(url.to_string(), (status, body.to_vec()));
    }

    /// Number of fetch attempts made so far.
    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl Fetch for FakeFetcher {
    async fn fetch(&self, req: &Request) -> Result<FetchedResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);

      let responses = self.responses.lock().unwrap();
      match responses.get(req.url.as_str()) {
        Some((status, body)) => Ok(FetchedResponse {
          url: req.url.to_string(),
          status: *status,
          headers: Vec::new(),
          body: body.clone(),
        }),
        None => Err(eyre!("Connection refused: {}", req.url)),
      }
    }
  }
}
