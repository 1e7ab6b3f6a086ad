use async_trait::async_trait;
use reqwest::{header::HeaderMap, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::{str::FromStr, time::Duration};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid argument: {arg} - {error}")]
    InvalidArgument { arg: String, error: String },

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    UnexpectedBody(#[from] serde_json::Error),

    #[error("unexpected status code: {status_code} - {msg}")]
    UnexpectedStatusCode {
        status_code: StatusCode,
        msg: String,
    },
}

/// Per-call options forwarded untouched to the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// One request to be issued by a [`Connection`].
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Path relative to the connection's base url, e.g. `/api/v1/query/`.
    pub endpoint: String,
    /// Url-encoded query string appended to the endpoint.
    pub query: Option<String>,
    /// JSON body for POST requests.
    pub post_payload: Option<Value>,
    /// Pass-through per-call options.
    pub options: RequestOptions,
}

impl RequestConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn query<Q: Serialize>(mut self, query: &Q) -> Self {
        self.query = serialize_query(query);
        self
    }

    pub fn post_payload(mut self, payload: Value) -> Self {
        self.post_payload = Some(payload);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// A utility function for serializing parameters into a url query string.
#[inline]
pub fn serialize_query<Q: Serialize>(q: &Q) -> Option<String> {
    serde_urlencoded::to_string(q).ok()
}

/// Transport boundary used by [`ChartClient`](crate::ChartClient).
///
/// Implementations issue the request and yield the parsed JSON response body.
/// Per-call options carried by the request must be forwarded untouched.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn get(&self, request: RequestConfig) -> Result<Value, TransportError>;
    async fn post(&self, request: RequestConfig) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub base_url: Url,
    /// The maximum time limit for a single request. Defaults to 30 seconds.
    pub http_timeout: Duration,
    pub default_headers: HeaderMap,
}

impl ConnectionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http_timeout: defaults::http_timeout(),
            default_headers: HeaderMap::new(),
        }
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }
}

mod defaults {
    use std::time::Duration;

    pub fn http_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

/// Default [`Connection`] implementation over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpConnection {
    pub fn new(config: ConnectionConfig) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .default_headers(config.default_headers)
            .build()?;
        Ok(Self {
            base_url: config.base_url,
            http_client,
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::from_str(base_url).map_err(|err| TransportError::InvalidArgument {
            arg: "base_url".to_string(),
            error: err.to_string(),
        })?;
        Self::new(ConnectionConfig::new(base_url))
    }

    fn url(&self, request: &RequestConfig) -> Url {
        let mut url = self.base_url.join(&request.endpoint).unwrap();
        url.set_query(request.query.as_deref());
        url
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, TransportError> {
        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            status => Err(TransportError::UnexpectedStatusCode {
                status_code: status,
                msg: response.text().await?,
            }),
        }
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn get(&self, request: RequestConfig) -> Result<Value, TransportError> {
        let url = self.url(&request);
        debug!(%url, "issuing GET request");
        self.execute(self.http_client.get(url).headers(request.options.headers))
            .await
    }

    async fn post(&self, request: RequestConfig) -> Result<Value, TransportError> {
        let url = self.url(&request);
        debug!(%url, "issuing POST request");
        let RequestConfig {
            post_payload,
            options,
            ..
        } = request;
        let mut builder = self.http_client.post(url).headers(options.headers);
        if let Some(payload) = &post_payload {
            builder = builder.json(payload);
        }
        self.execute(builder).await
    }
}
