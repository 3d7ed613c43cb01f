//! HTTP utilities for GCP REST API calls

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Upper bound for a single request, on top of reqwest's connect handling
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull `error.message` out of a Google API error envelope
fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

/// Last path segment of a URL, used to name the missing resource on 404
fn resource_from_url(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcp-interconnect/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::remote(None, format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.send::<(), T>(Method::GET, url, token, query, None).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T> {
        self.send(Method::POST, url, token, query, Some(body)).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.send::<(), T>(Method::DELETE, url, token, query, None).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token)
            .query(query);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("{} {} failed: {}", method, url, e);
            Error::from(e)
        })?;

        let status = response.status();
        let response_body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{} {} -> 404", method, url);
            return Err(Error::NotFound {
                resource: resource_from_url(url),
            });
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            let message = api_error_message(&response_body)
                .map(|m| sanitize_for_log(&m))
                .unwrap_or_else(|| format!("API request failed: {}", status));
            return Err(Error::remote(Some(status.as_u16()), message));
        }

        tracing::debug!("{} {} -> {}: {}", method, url, status, sanitize_for_log(&response_body));

        // Empty bodies decode as JSON null
        let body = if response_body.is_empty() {
            "null"
        } else {
            response_body.as_str()
        };

        Ok(serde_json::from_str(body)?)
    }
}
