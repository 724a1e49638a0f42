//! Filtering, projection and pagination through the operation handler.

use crate::common::{self, TestEngine};
use scim_protocol::{EngineConfig, ScimRequest};
use serde_json::Value;

async fn seed_users(engine: &TestEngine, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        let response = engine
            .handler
            .handle(ScimRequest::post("/Users", common::user_payload(name)))
            .await;
        assert_eq!(response.status, 201, "seeding {}", name);
        ids.push(response.body.unwrap()["id"].as_str().unwrap().to_string());
    }
    ids
}

async fn list(engine: &TestEngine, query: &str) -> (u16, Value) {
    let response = engine
        .handler
        .handle(ScimRequest::get("/Users").with_query(query))
        .await;
    (response.status, response.body.unwrap_or(Value::Null))
}

fn user_names(list_response: &Value) -> Vec<String> {
    list_response["Resources"]
        .as_array()
        .map(|resources| {
            resources
                .iter()
                .filter_map(|resource| resource["userName"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn equality_filter_ignores_case_by_default() {
    let engine = common::engine();
    seed_users(&engine, &["alice", "bob"]).await;

    let (status, body) = list(&engine, "filter=USERNAME%20eq%20%22ALICE%22").await;
    assert_eq!(status, 200);
    assert_eq!(body["totalResults"], 1);
    assert_eq!(user_names(&body), vec!["alice"]);
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:api:messages:2.0:ListResponse"
    );
}

#[tokio::test]
async fn conjunctions_must_match_every_predicate() {
    let engine = common::engine();
    seed_users(&engine, &["alice", "bob"]).await;

    let (_, both) = list(
        &engine,
        "filter=userName%20eq%20%22alice%22%20and%20active%20eq%20%22true%22",
    )
    .await;
    assert_eq!(both["totalResults"], 1);

    let (_, neither) = list(
        &engine,
        "filter=userName%20eq%20%22alice%22%20and%20userName%20eq%20%22bob%22",
    )
    .await;
    assert_eq!(neither["totalResults"], 0);
    assert_eq!(neither["Resources"], serde_json::json!([]));
}

#[tokio::test]
async fn unsupported_operators_are_not_implemented() {
    let engine = common::engine();
    seed_users(&engine, &["alice"]).await;

    let (status, body) = list(&engine, "filter=userName%20sw%20%22al%22").await;
    assert_eq!(status, 501);
    assert_eq!(body["scimType"], "invalidFilter");
}

#[tokio::test]
async fn too_many_filters_are_invalid_parameters() {
    let engine = common::engine();
    seed_users(&engine, &["alice"]).await;

    let (status, body) = list(
        &engine,
        "filter=userName%20eq%20%22alice%22&filter=active%20eq%20%22true%22",
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["detail"].as_str().unwrap().contains("invalid parameters"));
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let engine = common::engine();

    let (status, body) = list(&engine, "filter=userName%20eq%20%22unterminated").await;
    assert_eq!(status, 406);
    assert_eq!(body["scimType"], "invalidFilter");
}

#[tokio::test]
async fn pagination_windows_and_clamps() {
    let engine = common::engine();
    seed_users(&engine, &["u1", "u2", "u3", "u4", "u5"]).await;

    let (_, page) = list(&engine, "startIndex=2&count=2").await;
    assert_eq!(page["totalResults"], 5);
    assert_eq!(page["startIndex"], 2);
    assert_eq!(page["itemsPerPage"], 2);
    assert_eq!(user_names(&page), vec!["u2", "u3"]);

    let (_, clamped) = list(&engine, "startIndex=0&count=-3").await;
    assert_eq!(clamped["startIndex"], 1);
    assert_eq!(clamped["itemsPerPage"], 0);
    assert_eq!(clamped["totalResults"], 5);

    let (_, past_end) = list(&engine, "startIndex=9").await;
    assert_eq!(past_end["itemsPerPage"], 0);
}

#[tokio::test]
async fn max_results_caps_every_page() {
    let engine = common::engine_with(EngineConfig::default().with_max_results(3));
    seed_users(&engine, &["u1", "u2", "u3", "u4", "u5"]).await;

    let (_, page) = list(&engine, "count=50").await;
    assert_eq!(page["itemsPerPage"], 3);
    assert_eq!(page["totalResults"], 5);
}

#[tokio::test]
async fn projection_trims_listed_and_retrieved_resources() {
    let engine = common::engine();
    let ids = seed_users(&engine, &["alice"]).await;

    let (_, included) = list(&engine, "attributes=userName").await;
    let resource = &included["Resources"][0];
    assert_eq!(resource["userName"], "alice");
    assert!(resource.get("emails").is_none());
    assert!(resource.get("id").is_some());
    assert!(resource.get("meta").is_some());

    let retrieved = engine
        .handler
        .handle(ScimRequest::get(format!("/Users/{}", ids[0])).with_query("excludedAttributes=emails,name"))
        .await
        .body
        .unwrap();
    assert!(retrieved.get("emails").is_none());
    assert!(retrieved.get("name").is_none());
    assert_eq!(retrieved["userName"], "alice");

    let (status, _) = list(&engine, "attributes=userName&excludedAttributes=emails").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn retrieve_with_filter_requires_the_filter_to_match() {
    let engine = common::engine();
    let ids = seed_users(&engine, &["alice"]).await;
    let path = format!("/Users/{}", ids[0]);

    let hit = engine
        .handler
        .handle(ScimRequest::get(path.clone()).with_query("filter=userName%20eq%20%22alice%22"))
        .await;
    assert_eq!(hit.status, 200);

    let miss = engine
        .handler
        .handle(ScimRequest::get(path).with_query("filter=userName%20eq%20%22bob%22"))
        .await;
    assert_eq!(miss.status, 404);
}

#[tokio::test]
async fn filtering_can_be_switched_off() {
    let mut config = EngineConfig::default();
    config.filter_supported = false;
    let engine = common::engine_with(config);

    let (status, _) = list(&engine, "filter=userName%20eq%20%22alice%22").await;
    assert_eq!(status, 501);

    let (status, body) = list(&engine, "").await;
    assert_eq!(status, 200);
    assert_eq!(body["totalResults"], 0);
}
