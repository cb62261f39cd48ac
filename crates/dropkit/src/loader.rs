//! Remote option loading
//!
//! A load turns the configured URL and [`FetchOptions`] into a
//! [`FetchRequest`], hands it to a [`DataFetcher`], runs the optional
//! resolver over the JSON payload, and decodes the result into
//! [`OptionData`].
//!
//! With the `network` feature, [`HttpFetcher`] performs the request with
//! reqwest. Tests and embedded hosts plug in any closure instead:
//!
//! ```rust
//! use dropkit::loader::{DataFetcher, FetchRequest};
//! use dropkit::LoadError;
//!
//! let fetcher = |request: FetchRequest| async move {
//!     assert_eq!(request.method, "GET");
//!     Ok::<_, LoadError>(serde_json::json!({"options": [{"value": "a", "text": "Alpha"}]}))
//! };
//! let _future = fetcher.fetch(FetchRequest::new("https://example.com/options.json"));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::config::{DataResolver, FetchOptions};
use crate::data::OptionData;
use crate::error::LoadError;

/// Boxed future produced by a [`DataFetcher`]
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, LoadError>> + Send>>;

/// Everything needed to issue the data request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Uppercase HTTP method
    pub method: String,
    /// Headers in send order
    pub headers: IndexMap<String, String>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// A plain GET with the default headers
    pub fn new(url: impl Into<String>) -> Self {
        Self::build(url, &FetchOptions::default())
    }

    /// Apply caller overrides to the default request
    pub fn build(url: impl Into<String>, options: &FetchOptions) -> Self {
        Self {
            url: url.into(),
            method: options.effective_method(),
            headers: options.merged_headers(),
            timeout: options.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Source of raw option payloads
pub trait DataFetcher: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> FetchFuture;
}

impl<F, Fut> DataFetcher for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, LoadError>> + Send + 'static,
{
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        Box::pin(self(request))
    }
}

/// HTTP transport backed by reqwest
#[cfg(feature = "network")]
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "network")]
impl HttpFetcher {
    /// Use an existing client (connection pool, proxies, TLS config)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "network")]
impl DataFetcher for HttpFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let method = reqwest::Method::from_bytes(request.method.as_bytes())
                .map_err(|_| LoadError::Unsupported(format!("HTTP method {}", request.method)))?;

            let mut builder = client.request(method, &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| LoadError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(LoadError::Status(response.status().as_u16()));
            }

            response.json::<serde_json::Value>().await.map_err(|e| {
                if e.is_decode() {
                    LoadError::Decode(e.to_string())
                } else {
                    LoadError::Transport(e.to_string())
                }
            })
        })
    }
}

/// The configured fetcher, else HTTP when available
pub fn default_fetcher(configured: Option<&Arc<dyn DataFetcher>>) -> Option<Arc<dyn DataFetcher>> {
    if let Some(fetcher) = configured {
        return Some(fetcher.clone());
    }
    #[cfg(feature = "network")]
    {
        Some(Arc::new(HttpFetcher::default()))
    }
    #[cfg(not(feature = "network"))]
    {
        None
    }
}

/// Run the resolver (identity when unset) and decode the payload
pub fn resolve_payload(
    payload: serde_json::Value,
    resolver: Option<&DataResolver>,
) -> Result<OptionData, LoadError> {
    let resolved = match resolver {
        Some(resolve) => resolve(payload),
        None => payload,
    };
    OptionData::from_json(resolved).map_err(|e| LoadError::Decode(e.to_string()))
}

/// Fetch and decode one option set
pub async fn load_options(
    fetcher: Arc<dyn DataFetcher>,
    request: FetchRequest,
    resolver: Option<DataResolver>,
) -> Result<OptionData, LoadError> {
    tracing::debug!(url = %request.url, method = %request.method, "loading dropdown data");
    let payload = fetcher.fetch(request).await?;
    resolve_payload(payload, resolver.as_ref())
}
