//! Property-based tests using proptest
//!
//! These tests verify name lookups, attachment creation and partner-metadata
//! validation against an in-memory transport, using randomized inputs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use gcp_interconnect::gcp::auth::validate_project_id;
use gcp_interconnect::{
    AttachmentType, ComputeTransport, Error, Interconnect, InterconnectAttachment,
    InterconnectClient, Operation, OperationStatus, PartnerMetadata, Result,
};
use proptest::prelude::*;

/// Transport serving fixed lists and recording inserts
#[derive(Default)]
struct MemoryTransport {
    interconnects: Vec<Interconnect>,
    attachments: Vec<InterconnectAttachment>,
    inserts: AtomicUsize,
    last_insert: Mutex<Option<InterconnectAttachment>>,
}

#[async_trait]
impl ComputeTransport for MemoryTransport {
    async fn list_interconnects(&self, _project: &str) -> Result<Vec<Interconnect>> {
        Ok(self.interconnects.clone())
    }

    async fn list_attachments(
        &self,
        _project: &str,
        _region: &str,
    ) -> Result<Vec<InterconnectAttachment>> {
        Ok(self.attachments.clone())
    }

    async fn get_attachment(
        &self,
        _project: &str,
        _region: &str,
        attachment: &str,
    ) -> Result<InterconnectAttachment> {
        Err(Error::NotFound {
            resource: attachment.to_string(),
        })
    }

    async fn insert_attachment(
        &self,
        _project: &str,
        _region: &str,
        attachment: &InterconnectAttachment,
    ) -> Result<Operation> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        *self.last_insert.lock().unwrap() = Some(attachment.clone());
        Ok(pending_operation())
    }

    async fn delete_attachment(
        &self,
        _project: &str,
        _region: &str,
        _attachment: &str,
    ) -> Result<Operation> {
        Ok(pending_operation())
    }

    async fn get_operation(
        &self,
        _project: &str,
        _region: &str,
        operation: &str,
    ) -> Result<Operation> {
        Err(Error::NotFound {
            resource: operation.to_string(),
        })
    }
}

fn pending_operation() -> Operation {
    serde_json::from_value(serde_json::json!({"name": "op", "status": "PENDING"})).unwrap()
}

/// Generate an interconnect with a short name so duplicates are common
fn arb_interconnect() -> impl Strategy<Value = Interconnect> {
    ("[a-c]{1,2}", 0u32..1000).prop_map(|(name, n)| {
        serde_json::from_value(serde_json::json!({
            "name": format!("gcp-loc-{}", name),
            "selfLink": format!("projects/p/global/interconnects/gcp-loc-{}-{}", name, n)
        }))
        .unwrap()
    })
}

fn arb_interconnect_list() -> impl Strategy<Value = Vec<Interconnect>> {
    prop::collection::vec(arb_interconnect(), 0..20)
}

fn client(transport: MemoryTransport) -> InterconnectClient<MemoryTransport> {
    InterconnectClient::new("net-prod-123", "europe-north1", transport)
}

fn metadata_for(name: &str) -> Vec<(String, String)> {
    vec![
        ("interconnect_name".to_string(), name.to_string()),
        ("partner_name".to_string(), "Acme".to_string()),
        ("portal_url".to_string(), "https://acme.example".to_string()),
    ]
}

proptest! {
    /// Lookup returns the first entry with the requested name
    #[test]
    fn find_returns_first_match(items in arb_interconnect_list()) {
        let c = client(MemoryTransport { interconnects: items.clone(), ..Default::default() });

        for item in &items {
            let found = tokio_test::block_on(c.find_interconnect_by_name(&item.name)).unwrap();
            let first = items.iter().find(|i| i.name == item.name).cloned();
            prop_assert_eq!(found, first);
        }
    }

    /// Names absent from the list are reported as None, never as errors
    #[test]
    fn find_absent_name_is_none(items in arb_interconnect_list(), probe in "[d-z]{1,3}") {
        let c = client(MemoryTransport { interconnects: items, ..Default::default() });
        let found = tokio_test::block_on(c.find_interconnect_by_name(&probe)).unwrap();
        prop_assert!(found.is_none());
    }

    /// Creation inserts only when the interconnect exists, and then always as PARTNER_PROVIDER
    #[test]
    fn create_inserts_only_for_known_interconnect(
        items in arb_interconnect_list(),
        target in "gcp-loc-[a-c]{1,2}",
        vlan in 2u16..4094,
        bandwidth in prop_oneof!["BPS_50M", "BPS_500M", "BPS_1G", "BPS_10G"],
    ) {
        let expected = items.iter().find(|i| i.name == target).cloned();
        let c = client(MemoryTransport { interconnects: items, ..Default::default() });

        let result = tokio_test::block_on(c.create_partner_attachment(
            "123/456/az1",
            "att",
            &bandwidth,
            &target,
            vlan,
            metadata_for(&target),
        ))
        .unwrap();

        match expected {
            None => {
                prop_assert!(result.is_none());
                prop_assert_eq!(c.transport().inserts.load(Ordering::SeqCst), 0);
            },
            Some(interconnect) => {
                prop_assert_eq!(result.map(|op| op.status), Some(OperationStatus::Pending));
                prop_assert_eq!(c.transport().inserts.load(Ordering::SeqCst), 1);
                let inserted = c.transport().last_insert.lock().unwrap().clone().unwrap();
                prop_assert_eq!(inserted.interconnect, interconnect.self_link);
                prop_assert_eq!(inserted.attachment_type, Some(AttachmentType::PartnerProvider));
                prop_assert_eq!(inserted.vlan_tag8021q, Some(vlan));
            },
        }
    }
}

/// Tests for partner metadata validation
mod partner_metadata_tests {
    use super::*;

    const REQUIRED: [&str; 3] = ["interconnect_name", "partner_name", "portal_url"];

    proptest! {
        /// Dropping any required key fails validation
        #[test]
        fn missing_key_rejected(drop in 0usize..3, value in "[a-z]{1,10}") {
            let entries: Vec<(&str, String)> = REQUIRED
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != drop)
                .map(|(_, k)| (*k, value.clone()))
                .collect();

            let result = PartnerMetadata::from_map(entries);
            prop_assert!(matches!(result, Err(Error::Validation(_))));
        }

        /// Any key outside the known three fails validation
        #[test]
        fn unknown_key_rejected(extra in "[a-z_]{1,20}") {
            prop_assume!(!REQUIRED.contains(&extra.as_str()));

            let mut entries: Vec<(String, String)> = REQUIRED
                .iter()
                .map(|k| (k.to_string(), "v".to_string()))
                .collect();
            entries.push((extra, "v".to_string()));

            let result = PartnerMetadata::from_map(entries);
            prop_assert!(matches!(result, Err(Error::Validation(_))));
        }

        /// Key order does not matter for a complete map
        #[test]
        fn complete_map_accepted_in_any_order(
            entries in Just(REQUIRED.to_vec()).prop_shuffle(),
            value in "[a-z]{1,10}"
        ) {
            let pairs: Vec<(&str, String)> = entries.iter().map(|k| (*k, value.clone())).collect();
            let metadata = PartnerMetadata::from_map(pairs).unwrap();
            prop_assert_eq!(metadata.partner_name, value);
        }
    }
}

/// Tests for project id validation used when reading ambient configuration
mod project_id_tests {
    use super::*;

    proptest! {
        #[test]
        fn well_formed_ids_accepted(id in "[a-z][a-z0-9-]{4,28}[a-z0-9]") {
            prop_assert!(validate_project_id(&id));
        }

        #[test]
        fn uppercase_ids_rejected(id in "[A-Z][a-z0-9-]{5,20}") {
            prop_assert!(!validate_project_id(&id));
        }
    }
}
