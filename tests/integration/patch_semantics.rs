//! PATCH semantics over dispatched payloads.
//!
//! Requests are parsed through the dispatcher exactly as a client body would
//! be, then applied with [`PatchApplier`].

use crate::common::{self, ENTERPRISE_USER};
use scim_protocol::{
    EngineConfig, PatchApplier, PatchRequest, ProtocolObject, Resource, SchemaDispatcher,
    SchemaRegistry, ScimError,
};
use serde_json::{Value, json};
use std::sync::Arc;

struct Fixture {
    registry: Arc<SchemaRegistry>,
    dispatcher: SchemaDispatcher,
}

impl Fixture {
    fn new() -> Self {
        common::init_logging();
        let registry = Arc::new(SchemaRegistry::new());
        let dispatcher = SchemaDispatcher::new(Arc::clone(&registry), &EngineConfig::default());
        Self {
            registry,
            dispatcher,
        }
    }

    fn resource(&self, body: Value) -> Resource {
        match self.dispatcher.create(&body).unwrap() {
            ProtocolObject::Resource(resource) => resource,
            other => panic!("expected a resource, got {}", other.shape_name()),
        }
    }

    fn patch(&self, operations: Value) -> PatchRequest {
        match self.dispatcher.create(&common::patch_payload(operations)).unwrap() {
            ProtocolObject::PatchRequest(request) => request,
            other => panic!("expected a patch request, got {}", other.shape_name()),
        }
    }

    fn apply_to_user(&self, user: &Resource, operations: Value) -> Result<Resource, ScimError> {
        PatchApplier::new(self.registry.user_type()).apply(user, &self.patch(operations))
    }

    fn apply_to_group(&self, group: &Resource, operations: Value) -> Result<Resource, ScimError> {
        PatchApplier::new(self.registry.group_type()).apply(group, &self.patch(operations))
    }
}

#[test]
fn operations_apply_in_order() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("ordered"));

    let patched = fixture
        .apply_to_user(
            &user,
            json!([
                {"op": "add", "path": "title", "value": "Engineer"},
                {"op": "remove", "path": "title"},
                {"op": "add", "path": "title", "value": "Manager"}
            ]),
        )
        .unwrap();
    assert_eq!(patched.string_attribute("title"), Some("Manager"));
}

#[test]
fn add_display_name_changes_nothing_else() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("alice"));

    let patched = fixture
        .apply_to_user(
            &user,
            json!([{"op": "add", "path": "displayName", "value": "Alice A"}]),
        )
        .unwrap();

    let mut expected = user.to_json();
    expected["displayName"] = json!("Alice A");
    assert_eq!(patched.to_json(), expected);
}

#[test]
fn remove_by_filter_is_idempotent() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &["42", "43", "44"]));
    let operations = json!([{"op": "remove", "path": "members[value eq \"43\"]"}]);

    let once = fixture.apply_to_group(&group, operations.clone()).unwrap();
    let twice = fixture.apply_to_group(&once, operations).unwrap();
    assert_eq!(once, twice);
    let remaining: Vec<&str> = once
        .attribute("members")
        .and_then(Value::as_array)
        .unwrap()
        .iter()
        .filter_map(|member| member["value"].as_str())
        .collect();
    assert_eq!(remaining, vec!["42", "44"]);
}

#[test]
fn compact_member_removal_equals_value_removal() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &["42", "43"]));

    let compact = fixture
        .apply_to_group(&group, json!([{"op": "remove", "path": "members[value eq \"42\"]"}]))
        .unwrap();
    let explicit = fixture
        .apply_to_group(
            &group,
            json!([{"op": "remove", "path": "members", "value": [{"value": "42"}]}]),
        )
        .unwrap();
    assert_eq!(compact, explicit);
}

#[test]
fn compact_form_needs_a_single_predicate() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &["42", "43"]));

    let patched = fixture
        .apply_to_group(
            &group,
            json!([{"op": "remove", "path": "members[value eq \"42\" and type eq \"User\"]"}]),
        )
        .unwrap();
    assert_eq!(
        patched.attribute("members"),
        Some(&json!([{"value": "43", "type": "User"}]))
    );
}

#[test]
fn unknown_attribute_fails_the_whole_request() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("atomic"));

    let error = fixture
        .apply_to_user(
            &user,
            json!([
                {"op": "add", "path": "displayName", "value": "first"},
                {"op": "replace", "path": "nickName", "value": "second"},
                {"op": "add", "path": "shoeSize", "value": "44"}
            ]),
        )
        .unwrap_err();
    assert!(matches!(error, ScimError::UnknownAttribute { .. }));
    assert!(user.attribute("displayName").is_none());
    assert!(user.attribute("nickName").is_none());
}

#[test]
fn filtered_replace_matching_nothing_is_a_no_op() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("nomatch"));

    let patched = fixture
        .apply_to_user(
            &user,
            json!([{"op": "replace", "path": "emails[type eq \"home\"].value", "value": "x@y.z"}]),
        )
        .unwrap();
    assert_eq!(patched, user);
}

#[test]
fn schema_qualified_paths_reach_core_and_extension_attributes() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("qualified"));

    let patched = fixture
        .apply_to_user(
            &user,
            json!([
                {"op": "replace", "path": "urn:ietf:params:scim:schemas:core:2.0:User:displayName", "value": "Q"},
                {"op": "add", "path": format!("{}:department", ENTERPRISE_USER), "value": "Research"}
            ]),
        )
        .unwrap();
    assert_eq!(patched.string_attribute("displayName"), Some("Q"));
    assert_eq!(
        patched.attribute(ENTERPRISE_USER),
        Some(&json!({"department": "Research"}))
    );
    assert!(patched.schemas.contains(ENTERPRISE_USER));

    let cleared = fixture
        .apply_to_user(
            &patched,
            json!([{"op": "remove", "path": format!("{}:department", ENTERPRISE_USER)}]),
        )
        .unwrap();
    assert!(cleared.attribute(ENTERPRISE_USER).is_none());
}

#[test]
fn pathless_operations_are_rejected() {
    let fixture = Fixture::new();
    let error = fixture
        .dispatcher
        .create(&common::patch_payload(json!([
            {"op": "add", "value": {"displayName": "no path"}}
        ])))
        .unwrap_err();
    assert_eq!(error.kind(), scim_protocol::ErrorKind::BadRequest);
}

#[test]
fn read_only_attributes_cannot_be_patched() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &["42"]));

    let error = fixture
        .apply_to_group(&group, json!([{"op": "replace", "path": "id", "value": "other"}]))
        .unwrap_err();
    assert!(matches!(error, ScimError::ReadOnlyAttribute { .. }));
}

#[test]
fn values_are_coerced_to_declared_types() {
    let fixture = Fixture::new();
    let user = fixture.resource(common::user_payload("coerce"));

    let patched = fixture
        .apply_to_user(&user, json!([{"op": "replace", "path": "active", "value": "False"}]))
        .unwrap();
    assert_eq!(patched.attribute("active"), Some(&json!(false)));

    let error = fixture
        .apply_to_user(&user, json!([{"op": "replace", "path": "active", "value": "maybe"}]))
        .unwrap_err();
    assert_eq!(error.kind(), scim_protocol::ErrorKind::BadRequest);
}

#[test]
fn member_removal_by_inequality_keeps_every_member() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &["42", "43"]));

    let error = fixture
        .apply_to_group(&group, json!([{"op": "remove", "path": "members[value ne \"42\"]"}]))
        .unwrap_err();
    assert_eq!(error.kind(), scim_protocol::ErrorKind::NotImplemented);
    assert_eq!(error.scim_type(), Some("invalidFilter"));
    assert_eq!(
        group.attribute("members").and_then(Value::as_array).map(Vec::len),
        Some(2)
    );
}

#[test]
fn replace_with_empty_string_overwrites() {
    let fixture = Fixture::new();
    let group = fixture.resource(common::group_payload("Admins", &[]));

    let patched = fixture
        .apply_to_group(&group, json!([{"op": "replace", "path": "displayName", "value": ""}]))
        .unwrap();
    assert_eq!(patched.string_attribute("displayName"), Some(""));
}
