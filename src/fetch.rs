//! Fetch transport contract.
//!
//! Providers never talk to reqwest directly. They receive two [`Fetcher`]s
//! through their run context (direct and proxied) and pick one per endpoint,
//! usually via [`Fetchers::select`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::flags::{select_transport, FlagSet, Target, Transport};

/// Transport-level failure.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete before its deadline.
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Connection, TLS or protocol failure.
    #[error("transport error for {url}: {reason}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error text.
        reason: String,
    },

    /// The URL could not be parsed or joined.
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    /// The body could not be decoded as requested.
    #[error("failed to decode response from {url}: {reason}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder error text.
        reason: String,
    },
}

/// HTTP method subset used by providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// An outgoing request.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    /// Absolute URL, or a path relative to `base_url`.
    pub url: String,
    /// Optional base the URL is joined onto.
    pub base_url: Option<String>,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    /// A GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// A POST request with a body.
    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Resolve `url` against `base_url` and append the query pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result is not a valid URL.
    pub fn full_url(&self) -> Result<url::Url, FetchError> {
        let mut url = match &self.base_url {
            Some(base) => url::Url::parse(base)
                .and_then(|b| b.join(&self.url))
                .map_err(|_| FetchError::InvalidUrl(format!("{base} + {}", self.url)))?,
            None => url::Url::parse(&self.url)
                .map_err(|_| FetchError::InvalidUrl(self.url.clone()))?,
        };
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Body decoded as text.
    pub body: String,
}

impl FetchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`FetchError::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.final_url,
                status: self.status,
            })
        }
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|e| FetchError::Decode {
            url: self.final_url.clone(),
            reason: e.to_string(),
        })
    }
}

/// A transport that performs HTTP requests on behalf of providers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request and read the full body.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// The pair of transports bound into every run context.
#[derive(Clone)]
pub struct Fetchers {
    /// Direct transport.
    pub direct: Arc<dyn Fetcher>,
    /// Proxied transport.
    pub proxied: Arc<dyn Fetcher>,
}

impl Fetchers {
    /// Use `direct` for both transports (no proxy available).
    pub fn direct_only(direct: Arc<dyn Fetcher>) -> Self {
        Self {
            proxied: Arc::clone(&direct),
            direct,
        }
    }

    /// Transport for an endpoint carrying `flags`, under `target`.
    #[must_use]
    pub fn select(&self, flags: &FlagSet, target: Target) -> Arc<dyn Fetcher> {
        match select_transport(flags, target) {
            Transport::Direct => Arc::clone(&self.direct),
            Transport::Proxied => Arc::clone(&self.proxied),
        }
    }
}

impl std::fmt::Debug for Fetchers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetchers").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_joins_base_and_query() {
        let req = FetchRequest::get("/ajax/embed/1")
            .base_url("https://vidsrc.example/")
            .query("s", "1")
            .query("e", "2");
        assert_eq!(
            req.full_url().unwrap().as_str(),
            "https://vidsrc.example/ajax/embed/1?s=1&e=2"
        );
    }

    #[test]
    fn full_url_rejects_relative_without_base() {
        assert!(matches!(
            FetchRequest::get("/relative").full_url(),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn json_decode_error_is_reported() {
        let resp = FetchResponse {
            status: 200,
            final_url: "https://x".into(),
            headers: HashMap::new(),
            body: "not json".into(),
        };
        assert!(resp.is_success());
        assert!(matches!(
            resp.json::<serde_json::Value>(),
            Err(FetchError::Decode { .. })
        ));
    }
}
