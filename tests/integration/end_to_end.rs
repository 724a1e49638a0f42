//! End-to-end request lifecycles through the operation handler.
//!
//! These tests drive [`ScimOperationHandler`] the way a transport would,
//! checking status codes and response bodies across create, read, patch,
//! query, replace and delete.

use crate::common::{self, PATCH_OP};
use scim_protocol::providers::ProviderAdapter;
use scim_protocol::{ResourceKind, ScimMethod, ScimRequest};
use serde_json::json;

#[tokio::test]
async fn user_lifecycle() {
    let engine = common::engine();
    let handler = &engine.handler;

    let created = handler
        .handle(ScimRequest::post("/Users", common::user_payload("alice")))
        .await;
    assert_eq!(created.status, 201);
    let body = created.body.clone().unwrap();
    let id = body["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(
        created.location.as_deref(),
        Some(format!("https://scim.example.com/Users/{}", id).as_str())
    );
    assert_eq!(body["meta"]["resourceType"], "User");

    let duplicate = handler
        .handle(ScimRequest::post("/Users", common::user_payload("alice")))
        .await;
    assert_eq!(duplicate.status, 409);
    assert_eq!(duplicate.body.unwrap()["scimType"], "uniqueness");

    let patched = handler
        .handle(ScimRequest::patch(
            format!("/Users/{}", id),
            common::patch_payload(json!([{"op": "add", "path": "displayName", "value": "Alice A"}])),
        ))
        .await;
    assert_eq!(patched.status, 204);
    assert!(patched.body.is_none());

    let fetched = handler.handle(ScimRequest::get(format!("/Users/{}", id))).await;
    assert_eq!(fetched.status, 200);
    let fetched = fetched.body.unwrap();
    assert_eq!(fetched["displayName"], "Alice A");
    assert_eq!(fetched["userName"], "alice");
    assert_eq!(fetched["name"], body["name"]);
    assert_eq!(fetched["emails"], body["emails"]);
    assert_eq!(fetched["active"], body["active"]);
    assert_ne!(fetched["meta"]["version"], body["meta"]["version"]);

    let listed = handler
        .handle(ScimRequest::get("/Users").with_query("filter=userName%20eq%20%22alice%22"))
        .await;
    assert_eq!(listed.status, 200);
    let listed = listed.body.unwrap();
    assert_eq!(listed["totalResults"], 1);
    assert_eq!(listed["Resources"][0]["id"], id.as_str());

    let deleted = handler.handle(ScimRequest::delete(format!("/Users/{}", id))).await;
    assert_eq!(deleted.status, 204);

    let missing = handler.handle(ScimRequest::get(format!("/Users/{}", id))).await;
    assert_eq!(missing.status, 404);
    assert_eq!(
        missing.body.unwrap()["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:Error"
    );
}

#[tokio::test]
async fn group_membership_is_patched_in_compact_form() {
    let engine = common::engine();
    let handler = &engine.handler;

    let created = handler
        .handle(ScimRequest::post(
            "/Groups",
            common::group_payload("Admins", &["42", "43"]),
        ))
        .await;
    assert_eq!(created.status, 201);
    let id = created.body.unwrap()["id"].as_str().unwrap().to_string();

    let patched = handler
        .handle(ScimRequest::patch(
            format!("/Groups/{}", id),
            json!({
                "schemas": [PATCH_OP],
                "Operations": [{"op": "remove", "path": "members[value eq \"42\"]"}]
            }),
        ))
        .await;
    assert_eq!(patched.status, 204);

    let group = handler.handle(ScimRequest::get(format!("/Groups/{}", id))).await;
    let members = group.body.unwrap()["members"].clone();
    assert_eq!(members.as_array().map(Vec::len), Some(1));
    assert_eq!(members[0]["value"], "43");
}

#[tokio::test]
async fn replace_keeps_identity_and_creation_time() {
    let engine = common::engine();
    let handler = &engine.handler;

    let created = handler
        .handle(ScimRequest::post("/Users", common::user_payload("bob")))
        .await
        .body
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let mut replacement = common::user_payload("bob");
    replacement["displayName"] = json!("Robert");
    let replaced = handler
        .handle(ScimRequest::put(format!("/Users/{}", id), replacement))
        .await;
    assert_eq!(replaced.status, 200);
    let replaced = replaced.body.unwrap();
    assert_eq!(replaced["id"], created["id"]);
    assert_eq!(replaced["displayName"], "Robert");
    assert_eq!(replaced["meta"]["created"], created["meta"]["created"]);

    let mut mismatched = common::user_payload("bob");
    mismatched["id"] = json!("somebody-else");
    let rejected = handler
        .handle(ScimRequest::put(format!("/Users/{}", id), mismatched))
        .await;
    assert_eq!(rejected.status, 400);
}

#[tokio::test]
async fn user_names_conflict_across_user_endpoints_only() {
    let engine = common::engine();
    let handler = &engine.handler;

    let user = handler
        .handle(ScimRequest::post("/Users", common::user_payload("shared")))
        .await;
    assert_eq!(user.status, 201);

    let group = handler
        .handle(ScimRequest::post("/Groups", common::group_payload("shared", &[])))
        .await;
    assert_eq!(group.status, 201);

    let enterprise = handler
        .handle(ScimRequest::post(
            "/Users",
            json!({
                "schemas": [common::CORE_USER, common::ENTERPRISE_USER],
                "userName": "shared",
                common::ENTERPRISE_USER: {"employeeNumber": "1"}
            }),
        ))
        .await;
    assert_eq!(enterprise.status, 409);

    assert_eq!(engine.provider.count(ResourceKind::User).await, 1);
    assert_eq!(engine.provider.count(ResourceKind::Group).await, 1);
}

#[tokio::test]
async fn unknown_attribute_patch_leaves_resource_untouched() {
    let engine = common::engine();
    let handler = &engine.handler;

    let created = handler
        .handle(ScimRequest::post("/Users", common::user_payload("carol")))
        .await
        .body
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let rejected = handler
        .handle(ScimRequest::patch(
            format!("/Users/{}", id),
            common::patch_payload(json!([
                {"op": "replace", "path": "displayName", "value": "changed"},
                {"op": "add", "path": "favouriteColour", "value": "blue"}
            ])),
        ))
        .await;
    assert_eq!(rejected.status, 400);
    assert_eq!(rejected.body.unwrap()["scimType"], "invalidPath");

    let fetched = handler
        .handle(ScimRequest::get(format!("/Users/{}", id)))
        .await
        .body
        .unwrap();
    assert!(fetched.get("displayName").is_none());
    assert_eq!(fetched["meta"]["version"], created["meta"]["version"]);
}

#[tokio::test]
async fn patch_with_a_resource_body_is_not_implemented() {
    let engine = common::engine();
    let handler = &engine.handler;

    let id = handler
        .handle(ScimRequest::post("/Users", common::user_payload("dave")))
        .await
        .body
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = handler
        .handle(ScimRequest::patch(
            format!("/Users/{}", id),
            common::user_payload("dave"),
        ))
        .await;
    assert_eq!(response.status, 501);
}

#[tokio::test]
async fn unknown_endpoints_fall_back_to_the_root_adapter() {
    let engine = common::engine();
    let handler = &engine.handler;

    let stub = handler.handle(ScimRequest::get("/Devices/abc")).await;
    assert_eq!(stub.status, 200);
    assert_eq!(stub.body.unwrap()["id"], "abc");

    let create = handler
        .handle(ScimRequest::post("/Devices", common::user_payload("eve")))
        .await;
    assert_eq!(create.status, 501);

    let query = handler.handle(ScimRequest::get("/Devices")).await;
    assert_eq!(query.status, 501);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let engine = common::engine();
    let handler = &engine.handler;

    let no_body = handler
        .handle(ScimRequest::new(ScimMethod::Post, "/Users"))
        .await;
    assert_eq!(no_body.status, 400);

    let no_schemas = handler
        .handle(ScimRequest::post("/Users", json!({"userName": "frank"})))
        .await;
    assert_eq!(no_schemas.status, 400);

    let with_id = handler
        .handle(ScimRequest::post(
            "/Users",
            json!({"schemas": [common::CORE_USER], "id": "client-chosen", "userName": "frank"}),
        ))
        .await;
    assert_eq!(with_id.status, 400);

    let collection_delete = handler.handle(ScimRequest::delete("/Users")).await;
    assert_eq!(collection_delete.status, 400);
}

#[tokio::test]
async fn correlation_ids_are_optional() {
    let engine = common::engine();
    let handler = &engine.handler;

    let explicit = handler
        .handle(ScimRequest::post("/Users", common::user_payload("gina")).with_correlation_id("req-1"))
        .await;
    assert_eq!(explicit.status, 201);

    let blank = handler
        .handle(ScimRequest::post("/Users", common::user_payload("hal")).with_correlation_id("  "))
        .await;
    assert_eq!(blank.status, 201);
}

#[tokio::test]
async fn adapters_require_a_correlation_id() {
    let engine = common::engine();
    let adapter = scim_protocol::providers::ResourceProviderAdapter::new(
        std::sync::Arc::clone(&engine.provider),
        ResourceKind::User,
        std::sync::Arc::new(scim_protocol::EngineConfig::default()),
    );
    let error = adapter.delete("anything", "").await.unwrap_err();
    assert_eq!(error.kind(), scim_protocol::ErrorKind::InternalError);
}
