//! Wire-level request/response types and the HTTP transport seam.
//!
//! The [`SessionClient`](super::SessionClient) never talks to `reqwest`
//! directly: it hands an [`ApiRequest`] plus an optional bearer token to a
//! [`Transport`]. Production code uses [`HttpTransport`]; tests substitute an
//! in-process fake to count dispatches deterministically.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

/// An outbound call to the commerce API, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base (e.g. `products/12/`).
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Create a request without query or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// `PUT` request with a JSON body.
    #[must_use]
    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    /// `PATCH` request with a JSON body.
    #[must_use]
    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response from the commerce API with the body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Raw response body.
    pub body: String,
}

/// Error payload shapes used by the commerce API.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the presented credentials were rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Human-readable error message for a failed response.
    ///
    /// Prefers the API's `error` or `detail` field and falls back to a
    /// truncated raw body.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&self.body)
            && let Some(message) = parsed.error.or(parsed.detail)
        {
            return message;
        }

        if self.body.trim().is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        } else {
            self.body.chars().take(200).collect()
        }
    }
}

/// Dispatches API requests.
///
/// Implementations must attach `bearer` as an `Authorization: Bearer` header
/// when present and must not retry on their own.
pub trait Transport: Send + Sync + 'static {
    /// Send one request.
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ApiResponse, reqwest::Error>>;
}

/// `reqwest`-backed transport for the commerce API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &Url, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.clone(),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}",
            self.base_url.path().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        url.set_path(&path);
        url.set_query(None);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ApiResponse, reqwest::Error>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.clone(), self.url_for(request));

            if let Some(token) = bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;

            tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = %status,
                "API response"
            );

            Ok(ApiResponse { status, body })
        })
    }
}
