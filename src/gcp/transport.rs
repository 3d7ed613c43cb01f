//! Compute transport
//!
//! [`ComputeTransport`] is the narrow remote surface the client needs: list,
//! get, insert and delete for the two resource types, plus an operation
//! lookup for callers that want to wait. [`RestTransport`] implements it over
//! the Compute REST API; tests substitute an in-memory fake.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use super::auth::TokenSource;
use super::http::GcpHttpClient;
use super::model::{Interconnect, InterconnectAttachment, ListPage, Operation};
use crate::error::{Error, Result};

/// Production Compute Engine v1 endpoint
pub const COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1/";

/// Remote operations the interconnect client depends on
#[async_trait]
pub trait ComputeTransport: Send + Sync {
    /// All interconnects in the project (global resource)
    async fn list_interconnects(&self, project: &str) -> Result<Vec<Interconnect>>;

    /// All attachments in one project and region
    async fn list_attachments(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<InterconnectAttachment>>;

    async fn get_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &str,
    ) -> Result<InterconnectAttachment>;

    async fn insert_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &InterconnectAttachment,
    ) -> Result<Operation>;

    async fn delete_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &str,
    ) -> Result<Operation>;

    /// Current state of a regional operation
    async fn get_operation(&self, project: &str, region: &str, operation: &str)
        -> Result<Operation>;
}

/// [`ComputeTransport`] over the Compute Engine REST API
#[derive(Clone)]
pub struct RestTransport {
    http: GcpHttpClient,
    credentials: Arc<dyn TokenSource>,
    endpoint: Url,
}

impl RestTransport {
    /// Transport against the production endpoint
    pub fn new(credentials: Arc<dyn TokenSource>) -> Result<Self> {
        Self::with_endpoint(credentials, COMPUTE_ENDPOINT)
    }

    /// Transport against a custom endpoint, e.g. a local emulator or mock server
    pub fn with_endpoint(credentials: Arc<dyn TokenSource>, endpoint: &str) -> Result<Self> {
        Ok(Self {
            http: GcpHttpClient::new()?,
            credentials,
            endpoint: parse_endpoint(endpoint)?,
        })
    }

    /// Replace the HTTP client, e.g. to change the request timeout
    pub fn with_http(mut self, http: GcpHttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Build a URL under `projects/{project}/` with each segment percent-encoded
    fn project_url(&self, project: &str, segments: &[&str]) -> Result<String> {
        let mut path = format!("projects/{}", encode_segment(project)?);
        for segment in segments {
            path.push('/');
            path.push_str(&encode_segment(segment)?);
        }
        self.endpoint
            .join(&path)
            .map(|u| u.to_string())
            .map_err(|e| Error::Validation(format!("invalid resource path '{}': {}", path, e)))
    }

    fn regional_url(&self, project: &str, region: &str, segments: &[&str]) -> Result<String> {
        let mut all = vec!["regions", region];
        all.extend_from_slice(segments);
        self.project_url(project, &all)
    }

    /// Follow `nextPageToken` until the collection is exhausted
    ///
    /// A 404 on a collection means the project or region is wrong, not that a
    /// resource is missing, so it is reported as a remote failure.
    async fn list_all<T>(&self, url: &str) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let token = self.credentials.token().await?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, &str)> = match page_token.as_deref() {
                Some(t) => vec![("pageToken", t)],
                None => Vec::new(),
            };
            let page: ListPage<T> = match self.http.get(url, &token, &query).await {
                Ok(page) => page,
                Err(Error::NotFound { resource }) => {
                    return Err(Error::remote(
                        Some(404),
                        format!("collection not found: {}", resource),
                    ));
                },
                Err(e) => return Err(e),
            };
            items.extend(page.items);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Percent-encode one path segment. Empty and dot segments are rejected since
/// URL resolution would drop them and address a different resource.
fn encode_segment(segment: &str) -> Result<std::borrow::Cow<'_, str>> {
    match segment {
        "" => Err(Error::Validation("empty resource path segment".to_string())),
        "." | ".." => Err(Error::Validation(format!(
            "invalid resource path segment '{}'",
            segment
        ))),
        _ => Ok(urlencoding::encode(segment)),
    }
}

/// The endpoint is used as a join base, so it must end with a slash
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let normalized = if endpoint.ends_with('/') {
        endpoint.to_string()
    } else {
        format!("{}/", endpoint)
    };
    Url::parse(&normalized)
        .map_err(|e| Error::Validation(format!("invalid endpoint '{}': {}", endpoint, e)))
}

#[async_trait]
impl ComputeTransport for RestTransport {
    async fn list_interconnects(&self, project: &str) -> Result<Vec<Interconnect>> {
        let url = self.project_url(project, &["global", "interconnects"])?;
        self.list_all(&url).await
    }

    async fn list_attachments(
        &self,
        project: &str,
        region: &str,
    ) -> Result<Vec<InterconnectAttachment>> {
        let url = self.regional_url(project, region, &["interconnectAttachments"])?;
        self.list_all(&url).await
    }

    async fn get_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &str,
    ) -> Result<InterconnectAttachment> {
        let url = self.regional_url(project, region, &["interconnectAttachments", attachment])?;
        let token = self.credentials.token().await?;
        self.http.get(&url, &token, &[]).await
    }

    async fn insert_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &InterconnectAttachment,
    ) -> Result<Operation> {
        let url = self.regional_url(project, region, &["interconnectAttachments"])?;
        let token = self.credentials.token().await?;
        let request_id = Uuid::new_v4().to_string();
        self.http
            .post(&url, &token, &[("requestId", request_id.as_str())], attachment)
            .await
    }

    async fn delete_attachment(
        &self,
        project: &str,
        region: &str,
        attachment: &str,
    ) -> Result<Operation> {
        let url = self.regional_url(project, region, &["interconnectAttachments", attachment])?;
        let token = self.credentials.token().await?;
        let request_id = Uuid::new_v4().to_string();
        self.http
            .delete(&url, &token, &[("requestId", request_id.as_str())])
            .await
    }

    async fn get_operation(
        &self,
        project: &str,
        region: &str,
        operation: &str,
    ) -> Result<Operation> {
        let url = self.regional_url(project, region, &["operations", operation])?;
        let token = self.credentials.token().await?;
        self.http.get(&url, &token, &[]).await
    }
}
