//! Create, inspect and delete GCP Cloud Interconnect partner attachments.

pub mod config;
pub mod error;
pub mod gcp;

pub use error::{Error, Result};
pub use gcp::auth::{GcpCredentials, StaticToken, TokenSource};
pub use gcp::client::{ClientContext, InterconnectClient, WaitOptions};
pub use gcp::model::{
    AttachmentType, Interconnect, InterconnectAttachment, Operation, OperationStatus,
    PartnerMetadata,
};
pub use gcp::transport::{ComputeTransport, RestTransport};
