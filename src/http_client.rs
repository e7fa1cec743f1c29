//! reqwest-backed transports.
//!
//! - [`HttpFetcher`]: the direct transport. HTTP/2 with adaptive window,
//!   rustls, Brotli/Zstd/Gzip/Deflate, pooled keep-alive connections.
//! - [`ProxiedFetcher`]: rewrites every request to
//!   `{proxy}?destination={url}` and hands it to an inner transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, Fetchers, Method};

/// User agent sent when a request does not set its own.
pub const USER_AGENT: &str = concat!("reelsource/", env!("CARGO_PKG_VERSION"));

/// Direct HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the default 30s request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            // Let the server negotiate h2 vs http/1.1
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url, method = ?request.method))]
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.full_url()?;
        let target = url.to_string();

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| classify(&target, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();
        debug!(status, version = ?response.version(), final_url = %final_url, "response received");

        let body = response.text().await.map_err(|e| match classify(&target, &e) {
            FetchError::Transport { url, reason } => FetchError::Decode { url, reason },
            other => other,
        })?;

        Ok(FetchResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

fn classify(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Transport that routes requests through a CORS proxy.
///
/// The destination URL is percent-encoded into the proxy's `destination`
/// query parameter; method, headers and body are forwarded unchanged.
pub struct ProxiedFetcher {
    proxy_url: String,
    inner: Arc<dyn Fetcher>,
}

impl ProxiedFetcher {
    pub fn new(proxy_url: impl Into<String>, inner: Arc<dyn Fetcher>) -> Self {
        Self {
            proxy_url: proxy_url.into(),
            inner,
        }
    }

    #[must_use]
    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    /// Rewrite `request` so it targets the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the destination cannot be built.
    pub fn rewrite(&self, request: FetchRequest) -> Result<FetchRequest, FetchError> {
        let destination = request.full_url()?;
        let separator = if self.proxy_url.contains('?') { '&' } else { '?' };
        Ok(FetchRequest {
            url: format!(
                "{}{separator}destination={}",
                self.proxy_url,
                urlencoding::encode(destination.as_str())
            ),
            base_url: None,
            method: request.method,
            headers: request.headers,
            query: Vec::new(),
            body: request.body,
        })
    }
}

#[async_trait]
impl Fetcher for ProxiedFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let rewritten = self.rewrite(request)?;
        self.inner.fetch(rewritten).await
    }
}

impl std::fmt::Debug for ProxiedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedFetcher")
            .field("proxy_url", &self.proxy_url)
            .finish_non_exhaustive()
    }
}

/// Direct and proxied transports over one shared client.
///
/// Without `proxy_url` both slots hold the direct transport.
pub fn http_fetchers(proxy_url: Option<&str>, timeout: Duration) -> Result<Fetchers> {
    let direct: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_timeout(timeout)?);
    Ok(match proxy_url {
        Some(proxy) => Fetchers {
            proxied: Arc::new(ProxiedFetcher::new(proxy, Arc::clone(&direct))),
            direct,
        },
        None => Fetchers::direct_only(direct),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records the URL it was asked for and answers 200.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Fetcher for Recorder {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
            let url = request.full_url()?.to_string();
            self.0.lock().unwrap().push(url.clone());
            Ok(FetchResponse {
                status: 200,
                final_url: url,
                headers: HashMap::new(),
                body: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn proxied_requests_carry_encoded_destination() {
        let recorder = Arc::new(Recorder::default());
        let proxied = ProxiedFetcher::new("https://proxy.test/", recorder.clone());
        let request = FetchRequest::get("https://host.test/a b").query("x", "1&2");
        proxied.fetch(request).await.unwrap();

        let seen = recorder.0.lock().unwrap();
        assert_eq!(
            seen[0],
            "https://proxy.test/?destination=https%3A%2F%2Fhost.test%2Fa%2520b%3Fx%3D1%25262"
        );
    }

    #[test]
    fn rewrite_appends_to_existing_query() {
        let proxied = ProxiedFetcher::new("https://proxy.test/fetch?key=k", Arc::new(Recorder::default()));
        let rewritten = proxied
            .rewrite(FetchRequest::get("https://host.test/").header("Referer", "https://r.test/"))
            .unwrap();
        assert!(rewritten.url.starts_with("https://proxy.test/fetch?key=k&destination="));
        assert_eq!(rewritten.headers, vec![("Referer".to_string(), "https://r.test/".to_string())]);
    }

    #[tokio::test]
    async fn invalid_url_fails_before_network() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(FetchRequest::get("not a url")).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn without_proxy_both_slots_are_direct() {
        let fetchers = http_fetchers(None, Duration::from_secs(5)).unwrap();
        assert!(Arc::ptr_eq(&fetchers.direct, &fetchers.proxied));
    }
}
