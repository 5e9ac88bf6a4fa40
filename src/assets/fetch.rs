//! Remote resource fetching.
//!
//! Loaders only talk to the [`Fetcher`] trait so tests and offline tools can swap the network out.

use std::time::Duration;

use async_trait::async_trait;

use crate::foundation::error::{GlintError, GlintResult};

/// A fetched HTTP response body plus the metadata loaders validate against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    /// `true` for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type without parameters, lowercased (`"image/png; q=1"` -> `"image/png"`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
    }
}

/// Fetch bytes for a URL.
///
/// Implementations must enforce `timeout` as a hard deadline and `max_bytes` as an upper bound
/// on the body they are willing to buffer; both surface as errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. Non-2xx responses are returned as `Ok` with their status.
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> GlintResult<FetchedResource>;
}

/// Default user agent for outgoing requests.
pub const DEFAULT_USER_AGENT: &str = concat!("glint/", env!("CARGO_PKG_VERSION"));

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a fetcher with the default user agent.
    pub fn new() -> GlintResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| GlintError::fetch(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> GlintResult<FetchedResource> {
        let request = async {
            let mut resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| GlintError::fetch(format!("GET {url}: {e}")))?;

            let status = resp.status().as_u16();
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if resp
                .content_length()
                .is_some_and(|len| len > max_bytes as u64)
            {
                return Err(GlintError::fetch(format!(
                    "GET {url}: declared body exceeds {max_bytes} bytes"
                )));
            }

            let mut bytes = Vec::new();
            while let Some(chunk) = resp
                .chunk()
                .await
                .map_err(|e| GlintError::fetch(format!("GET {url}: read body: {e}")))?
            {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(GlintError::fetch(format!(
                        "GET {url}: body exceeds {max_bytes} bytes"
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            Ok(FetchedResource {
                status,
                content_type,
                bytes,
            })
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| GlintError::fetch(format!("GET {url}: timed out after {timeout:?}")))?
    }
}

/// In-memory [`Fetcher`] serving a fixed route table, for offline use and tests.
///
/// Unknown URLs answer 404. An optional per-request delay is applied before answering and is
/// subject to the caller's timeout.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    routes: parking_lot::Mutex<std::collections::HashMap<String, FetchedResource>>,
    calls: parking_lot::Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StaticFetcher {
    /// Empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `bytes` with status 200 and the given content type at `url`.
    pub fn insert(&self, url: impl Into<String>, content_type: &str, bytes: Vec<u8>) {
        self.insert_resource(
            url,
            FetchedResource {
                status: 200,
                content_type: Some(content_type.to_string()),
                bytes,
            },
        );
    }

    /// Serve an arbitrary response at `url`.
    pub fn insert_resource(&self, url: impl Into<String>, resource: FetchedResource) {
        self.routes.lock().insert(url.into(), resource);
    }

    /// How many times `url` was requested.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }

    /// Total requests served.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> GlintResult<FetchedResource> {
        self.calls.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(GlintError::fetch(format!(
                    "GET {url}: timed out after {timeout:?}"
                )));
            }
            tokio::time::sleep(delay).await;
        }

        let resource = self
            .routes
            .lock()
            .get(url)
            .cloned()
            .unwrap_or(FetchedResource {
                status: 404,
                content_type: None,
                bytes: Vec::new(),
            });
        if resource.bytes.len() > max_bytes {
            return Err(GlintError::fetch(format!(
                "GET {url}: body exceeds {max_bytes} bytes"
            )));
        }
        Ok(resource)
    }
}
