//! GCP API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Token sources: ambient credentials or explicitly injected ones
//! - [`client`] - [`InterconnectClient`](client::InterconnectClient), the public entry point
//! - [`http`] - HTTP utilities for REST API calls
//! - [`model`] - Interconnect, attachment and operation resources
//! - [`transport`] - The remote surface the client is written against
//!
//! # Example
//!
//! ```ignore
//! use gcp_interconnect::gcp::client::InterconnectClient;
//!
//! async fn example() -> gcp_interconnect::Result<()> {
//!     let client = InterconnectClient::from_environment("my-project", "europe-north1").await?;
//!     for attachment in client.list_attachments().await? {
//!         println!("{}", attachment.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod model;
pub mod transport;
