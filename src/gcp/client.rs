//! Interconnect client
//!
//! [`InterconnectClient`] binds a project and region to one long-lived
//! [`ComputeTransport`]. Each method issues the matching remote call and hands
//! the provider's answer back unchanged. Mutations return an [`Operation`]
//! without waiting for it; [`InterconnectClient::wait_for_operation`] is there
//! for callers that want to block until it is done.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::auth::{GcpCredentials, TokenSource};
use super::model::{Interconnect, InterconnectAttachment, Operation, PartnerMetadata};
use super::transport::{ComputeTransport, RestTransport};
use crate::error::{Error, Result};

/// Project and region every call is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub project_id: String,
    pub region: String,
}

/// Polling knobs for [`InterconnectClient::wait_for_operation`]
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Client for Cloud Interconnects and their attachments
#[derive(Clone)]
pub struct InterconnectClient<T = RestTransport> {
    context: ClientContext,
    transport: T,
}

impl InterconnectClient<RestTransport> {
    /// Client using Application Default Credentials with the compute scope
    pub async fn from_environment(project_id: &str, region: &str) -> Result<Self> {
        let credentials = GcpCredentials::from_environment().await?;
        Self::with_credentials(project_id, region, Arc::new(credentials))
    }

    /// Client against the production endpoint with explicitly supplied credentials
    pub fn with_credentials(
        project_id: &str,
        region: &str,
        credentials: Arc<dyn TokenSource>,
    ) -> Result<Self> {
        let transport = RestTransport::new(credentials)?;
        Ok(Self::new(project_id, region, transport))
    }
}

impl<T: ComputeTransport> InterconnectClient<T> {
    pub fn new(project_id: &str, region: &str, transport: T) -> Self {
        tracing::debug!(
            "Initialized interconnect client for project: {}, region: {}",
            project_id,
            region
        );

        Self {
            context: ClientContext {
                project_id: project_id.to_string(),
                region: region.to_string(),
            },
            transport,
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    pub fn project_id(&self) -> &str {
        &self.context.project_id
    }

    pub fn region(&self) -> &str {
        &self.context.region
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// List every interconnect in the project
    pub async fn list_interconnects(&self) -> Result<Vec<Interconnect>> {
        let interconnects = self
            .transport
            .list_interconnects(&self.context.project_id)
            .await?;
        tracing::debug!("Retrieved {} interconnects: {:?}", interconnects.len(), interconnects);
        Ok(interconnects)
    }

    /// List attachments in the bound project and region
    pub async fn list_attachments(&self) -> Result<Vec<InterconnectAttachment>> {
        let attachments = self
            .transport
            .list_attachments(&self.context.project_id, &self.context.region)
            .await?;
        tracing::debug!(
            "Retrieved {} interconnect attachments: {:?}",
            attachments.len(),
            attachments
        );
        Ok(attachments)
    }

    /// Fetch a single attachment; [`Error::NotFound`] when it does not exist
    pub async fn get_attachment(&self, attachment_id: &str) -> Result<InterconnectAttachment> {
        let attachment = self
            .transport
            .get_attachment(&self.context.project_id, &self.context.region, attachment_id)
            .await?;
        tracing::debug!("Retrieved interconnect attachment: {:?}", attachment);
        Ok(attachment)
    }

    /// First interconnect whose name matches exactly
    pub async fn find_interconnect_by_name(&self, name: &str) -> Result<Option<Interconnect>> {
        let found = self
            .list_interconnects()
            .await?
            .into_iter()
            .find(|i| i.name == name);

        match &found {
            Some(interconnect) => tracing::debug!("Found interconnect by name: {:?}", interconnect),
            None => tracing::debug!("No interconnect found with name: {}", name),
        }
        Ok(found)
    }

    /// First attachment in the region whose name matches exactly
    pub async fn find_attachment_by_name(
        &self,
        name: &str,
    ) -> Result<Option<InterconnectAttachment>> {
        let found = self
            .list_attachments()
            .await?
            .into_iter()
            .find(|a| a.name == name);

        match &found {
            Some(attachment) => tracing::debug!("Found attachment by name: {:?}", attachment),
            None => tracing::debug!("No attachment found with name: {}", name),
        }
        Ok(found)
    }

    /// Request deletion of an attachment; [`Error::NotFound`] when it does not exist
    pub async fn delete_attachment(&self, attachment_id: &str) -> Result<Operation> {
        let operation = self
            .transport
            .delete_attachment(&self.context.project_id, &self.context.region, attachment_id)
            .await?;
        tracing::debug!("Deleted interconnect attachment: {:?}", operation);
        Ok(operation)
    }

    /// Create a `PARTNER_PROVIDER` attachment on the interconnect called
    /// `interconnect_name`.
    ///
    /// Returns `Ok(None)` without sending anything when that interconnect does
    /// not exist. `partner_metadata` must hold exactly `interconnect_name`,
    /// `partner_name` and `portal_url`.
    pub async fn create_partner_attachment<I, K, V>(
        &self,
        pairing_key: &str,
        name: &str,
        bandwidth: &str,
        interconnect_name: &str,
        vlan: u16,
        partner_metadata: I,
    ) -> Result<Option<Operation>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let Some(interconnect) = self.find_interconnect_by_name(interconnect_name).await? else {
            tracing::error!("Interconnect {} not found.", interconnect_name);
            return Ok(None);
        };
        // An attachment cannot reference an interconnect without a link
        let Some(interconnect_link) = interconnect.self_link else {
            tracing::error!("Interconnect {} has no self link.", interconnect_name);
            return Ok(None);
        };

        let metadata = PartnerMetadata::from_map(partner_metadata)?;

        let attachment = InterconnectAttachment::partner_provider(
            name,
            pairing_key,
            bandwidth,
            vlan,
            metadata,
            &interconnect_link,
        );

        let operation = self
            .transport
            .insert_attachment(&self.context.project_id, &self.context.region, &attachment)
            .await?;
        tracing::debug!("Inserted interconnect attachment: {:?}", operation);
        Ok(Some(operation))
    }

    /// Poll `operation` until it is `DONE`.
    ///
    /// Fails with [`Error::OperationFailed`] when the finished operation carries
    /// errors, and with [`Error::Timeout`] once `options.timeout` has elapsed.
    pub async fn wait_for_operation(
        &self,
        operation: &Operation,
        options: WaitOptions,
    ) -> Result<Operation> {
        let started = Instant::now();
        let mut current = operation.clone();

        loop {
            if current.is_done() {
                if let Some(message) = current.error_message() {
                    tracing::error!("Operation {} failed: {}", current.name, message);
                    return Err(Error::OperationFailed {
                        operation: current.name,
                        message,
                    });
                }
                tracing::debug!("Operation {} done", current.name);
                return Ok(current);
            }

            let waited = started.elapsed();
            if waited >= options.timeout {
                return Err(Error::Timeout {
                    operation: current.name,
                    waited,
                });
            }

            tokio::time::sleep(options.poll_interval.min(options.timeout - waited)).await;

            current = self
                .transport
                .get_operation(&self.context.project_id, &self.context.region, &operation.name)
                .await?;
            tracing::debug!("Operation {} status: {:?}", current.name, current.status);
        }
    }
}
