//! Compute Engine resource shapes
//!
//! Field names follow the Compute REST schema (camelCase on the wire). Only the
//! fields this crate reads or writes are modelled; anything else in a response
//! is ignored.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A Cloud Interconnect (physical cross-connect at a colocation facility)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interconnect {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interconnect_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Kind of attachment. Everything created by this crate is `PartnerProvider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentType {
    Dedicated,
    Partner,
    PartnerProvider,
    #[serde(other)]
    Unknown,
}

impl AttachmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dedicated => "DEDICATED",
            Self::Partner => "PARTNER",
            Self::PartnerProvider => "PARTNER_PROVIDER",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Keys accepted when building [`PartnerMetadata`] from a map
pub const PARTNER_METADATA_KEYS: [&str; 3] = ["interconnect_name", "partner_name", "portal_url"];

/// Partner details attached to a `PARTNER_PROVIDER` attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerMetadata {
    /// Partner-side name of the interconnect, e.g. `gcp-loc-sth-1`
    pub interconnect_name: String,
    pub partner_name: String,
    pub portal_url: String,
}

impl PartnerMetadata {
    /// Build metadata from `interconnect_name` / `partner_name` / `portal_url`
    /// entries. Unknown, duplicated or missing keys are rejected.
    pub fn from_map<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields: HashMap<&'static str, String> = HashMap::new();

        for (key, value) in entries {
            let key = key.as_ref();
            let Some(known) = PARTNER_METADATA_KEYS.iter().find(|k| **k == key) else {
                return Err(Error::Validation(format!(
                    "unrecognized partner metadata key '{}'",
                    key
                )));
            };
            if fields.insert(*known, value.into()).is_some() {
                return Err(Error::Validation(format!(
                    "duplicate partner metadata key '{}'",
                    key
                )));
            }
        }

        let mut take = |key: &'static str| {
            fields
                .remove(key)
                .ok_or_else(|| Error::Validation(format!("missing partner metadata key '{}'", key)))
        };

        Ok(Self {
            interconnect_name: take("interconnect_name")?,
            partner_name: take("partner_name")?,
            portal_url: take("portal_url")?,
        })
    }
}

/// A VLAN attachment over an interconnect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterconnectAttachment {
    pub name: String,
    /// Server-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_tag8021q: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_metadata: Option<PartnerMetadata>,
    /// Self link of the parent interconnect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interconnect: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attachment_type: Option<AttachmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_availability_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

impl InterconnectAttachment {
    /// Descriptor for a new `PARTNER_PROVIDER` attachment on the interconnect
    /// whose self link is `interconnect_link`
    pub fn partner_provider(
        name: &str,
        pairing_key: &str,
        bandwidth: &str,
        vlan: u16,
        partner_metadata: PartnerMetadata,
        interconnect_link: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            pairing_key: Some(pairing_key.to_string()),
            bandwidth: Some(bandwidth.to_string()),
            vlan_tag8021q: Some(vlan),
            partner_metadata: Some(partner_metadata),
            interconnect: Some(interconnect_link.to_string()),
            attachment_type: Some(AttachmentType::PartnerProvider),
            region: None,
            state: None,
            edge_availability_domain: None,
            self_link: None,
        }
    }
}

/// Status of a long-running Compute operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorDetail>,
}

/// Handle for an asynchronous mutation (insert or delete)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
}

impl Operation {
    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// Error messages joined into one line, when the operation failed
    pub fn error_message(&self) -> Option<String> {
        let errors = &self.error.as_ref()?.errors;
        if errors.is_empty() {
            return None;
        }
        Some(
            errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// One page of a Compute list call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
