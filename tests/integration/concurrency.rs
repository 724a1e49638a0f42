//! Shared state under concurrent callers.
//!
//! The schema registry and schema sets are shared across every request; the
//! in-memory store must serialize conflicting writes.

use crate::common;
use futures::future::join_all;
use scim_protocol::schema::ProtocolExtension;
use scim_protocol::{ScimRequest, SchemaRegistry, SchemaSet};
use serde_json::json;
use std::sync::Arc;

struct Ticket;

impl ProtocolExtension for Ticket {
    fn schema_identifier(&self) -> &str {
        "urn:example:params:scim:schemas:ticket:1.0:Ticket"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identifier_registration_settles_on_one_entry() {
    let set = Arc::new(SchemaSet::new());
    let tasks = (0..64).map(|i| {
        let set = Arc::clone(&set);
        tokio::spawn(async move {
            let spelling = if i % 2 == 0 {
                "urn:example:shared"
            } else {
                "URN:EXAMPLE:SHARED"
            };
            set.add(spelling)
        })
    });

    let inserted = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .filter(|inserted| *inserted)
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(set.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_extension_registration_keeps_one() {
    let registry = Arc::new(SchemaRegistry::new());
    let tasks = (0..32).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry.register_identifier("urn:example:registered");
            registry.register_extension(Arc::new(Ticket))
        })
    });

    let accepted = join_all(tasks)
        .await
        .into_iter()
        .filter(|result| matches!(result, Ok(true)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(registry.extensions().len(), 1);
    assert!(registry.is_known("urn:example:registered"));
    assert!(registry.is_known("urn:example:params:scim:schemas:ticket:1.0:Ticket"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_one_user_name_admit_exactly_one() {
    let engine = Arc::new(common::engine());
    let tasks = (0..16).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .handler
                .handle(ScimRequest::post("/Users", common::user_payload("contended")))
                .await
                .status
        })
    });

    let statuses: Vec<u16> = join_all(tasks)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .collect();
    assert_eq!(statuses.iter().filter(|status| **status == 201).count(), 1);
    assert_eq!(statuses.iter().filter(|status| **status == 409).count(), 15);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_patches_all_land() {
    let engine = Arc::new(common::engine());
    let created = engine
        .handler
        .handle(ScimRequest::post("/Groups", common::group_payload("Busy", &[])))
        .await;
    let id = created.body.unwrap()["id"].as_str().unwrap().to_string();

    let tasks = (0..20).map(|i| {
        let engine = Arc::clone(&engine);
        let path = format!("/Groups/{}", id);
        tokio::spawn(async move {
            engine
                .handler
                .handle(ScimRequest::patch(
                    path,
                    common::patch_payload(json!([
                        {"op": "add", "path": "members", "value": [{"value": format!("m{}", i)}]}
                    ])),
                ))
                .await
                .status
        })
    });
    for status in join_all(tasks).await {
        assert_eq!(status.unwrap(), 204);
    }

    let group = engine
        .handler
        .handle(ScimRequest::get(format!("/Groups/{}", id)))
        .await
        .body
        .unwrap();
    assert_eq!(group["members"].as_array().map(Vec::len), Some(20));
}
