//! Schema-driven dispatch.
//!
//! Resolution is tried in a fixed order (resources, then protocol messages,
//! then registered extensions) and the first claim wins.

use crate::common::{self, fixtures::rfc_examples};
use scim_protocol::protocol::dispatcher::ResourceFactory;
use scim_protocol::schema::ProtocolExtension;
use scim_protocol::{
    EngineConfig, ErrorKind, ProtocolObject, Resource, ResourceKind, SchemaDispatcher,
    SchemaRegistry, ScimError,
};
use serde_json::{Value, json};
use std::sync::Arc;

const AUDIT_EVENT: &str = "urn:example:params:scim:schemas:audit:1.0:Event";

struct AuditEvent;

impl ProtocolExtension for AuditEvent {
    fn schema_identifier(&self) -> &str {
        AUDIT_EVENT
    }
}

fn dispatcher() -> SchemaDispatcher {
    common::init_logging();
    SchemaDispatcher::new(Arc::new(SchemaRegistry::new()), &EngineConfig::default())
}

fn resource(object: ProtocolObject) -> Resource {
    match object {
        ProtocolObject::Resource(resource) => resource,
        other => panic!("expected a resource, got {}", other.shape_name()),
    }
}

#[test]
fn rfc_resources_dispatch_to_their_kind() {
    let dispatcher = dispatcher();

    let user = resource(dispatcher.create(&rfc_examples::user_minimal()).unwrap());
    assert_eq!(user.kind(), Some(ResourceKind::User));

    let enterprise = resource(dispatcher.create(&rfc_examples::enterprise_user()).unwrap());
    assert_eq!(enterprise.kind(), Some(ResourceKind::EnterpriseUser));

    let group = resource(dispatcher.create(&rfc_examples::group()).unwrap());
    assert_eq!(group.kind(), Some(ResourceKind::Group));
}

#[test]
fn schema_identifiers_compare_ignoring_case() {
    let dispatcher = dispatcher();
    let user = resource(
        dispatcher
            .create(&json!({
                "schemas": ["URN:IETF:PARAMS:SCIM:SCHEMAS:CORE:2.0:USER"],
                "userName": "shouting"
            }))
            .unwrap(),
    );
    assert_eq!(user.kind(), Some(ResourceKind::User));
}

#[test]
fn group_with_registered_extension_is_still_a_group() {
    let dispatcher = dispatcher();
    assert!(dispatcher.register_extension(Arc::new(AuditEvent)));

    let group = resource(
        dispatcher
            .create(&json!({
                "schemas": [common::CORE_GROUP, AUDIT_EVENT],
                "displayName": "Auditors"
            }))
            .unwrap(),
    );
    assert_eq!(group.kind(), Some(ResourceKind::Group));
    assert!(group.schemas.contains(AUDIT_EVENT));
}

#[test]
fn registered_extension_claims_its_own_payloads() {
    let dispatcher = dispatcher();
    dispatcher.register_extension(Arc::new(AuditEvent));

    match dispatcher
        .create(&json!({"schemas": [AUDIT_EVENT], "action": "login"}))
        .unwrap()
    {
        ProtocolObject::Extension(extension) => {
            assert_eq!(extension.schema_identifier, AUDIT_EVENT);
            assert_eq!(extension.body["action"], "login");
        }
        other => panic!("expected an extension, got {}", other.shape_name()),
    }
}

#[test]
fn registering_an_extension_twice_keeps_one() {
    let dispatcher = dispatcher();
    assert!(dispatcher.register_extension(Arc::new(AuditEvent)));
    assert!(!dispatcher.register_extension(Arc::new(AuditEvent)));
    assert_eq!(dispatcher.registry().extensions().len(), 1);
}

#[test]
fn user_and_group_together_are_ambiguous() {
    let error = dispatcher()
        .create(&json!({
            "schemas": [common::CORE_USER, common::CORE_GROUP],
            "userName": "both",
            "displayName": "both"
        }))
        .unwrap_err();
    assert!(matches!(error, ScimError::DispatchAmbiguity { .. }));
    assert_eq!(error.kind(), ErrorKind::BadRequest);
}

#[test]
fn unknown_schemas_are_not_supported() {
    let dispatcher = dispatcher();

    let error = dispatcher
        .create(&json!({"schemas": ["urn:example:unknown"], "x": 1}))
        .unwrap_err();
    assert!(matches!(error, ScimError::UnsupportedSchema { .. }));
    assert_eq!(error.kind(), ErrorKind::NotImplemented);

    let error = dispatcher
        .create(&json!({
            "schemas": [common::CORE_USER, "urn:example:unknown"],
            "userName": "mixed"
        }))
        .unwrap_err();
    assert!(matches!(error, ScimError::UnsupportedSchema { ref schemas } if schemas == &vec!["urn:example:unknown".to_string()]));
}

#[test]
fn missing_or_empty_schemas_are_unidentifiable() {
    let dispatcher = dispatcher();
    for payload in [
        json!({"userName": "nobody"}),
        json!({"schemas": [], "userName": "nobody"}),
        json!({"schemas": "urn:ietf:params:scim:schemas:core:2.0:User"}),
    ] {
        let error = dispatcher.create(&payload).unwrap_err();
        assert!(matches!(error, ScimError::UnidentifiableSchema), "{}", payload);
    }
}

#[test]
fn protocol_messages_dispatch_by_their_single_schema() {
    let dispatcher = dispatcher();

    let patch = dispatcher
        .create(&common::patch_payload(json!([
            {"op": "replace", "path": "displayName", "value": "x"}
        ])))
        .unwrap();
    assert!(matches!(patch, ProtocolObject::PatchRequest(ref request) if request.operations.len() == 1));

    match dispatcher.create(&rfc_examples::error_response()).unwrap() {
        ProtocolObject::Error(error) => {
            assert_eq!(error.status, 400);
            assert_eq!(error.scim_type.as_deref(), Some("mutability"));
        }
        other => panic!("expected an error response, got {}", other.shape_name()),
    }
}

#[test]
fn null_members_are_dropped_before_dispatch() {
    let user = resource(
        dispatcher()
            .create(&json!({
                "schemas": [common::CORE_USER],
                "userName": "sparse",
                "displayName": null,
                "name": {"givenName": null}
            }))
            .unwrap(),
    );
    assert!(user.attribute("displayName").is_none());
    assert!(user.attribute("name").is_none());
}

#[test]
fn resource_factory_overrides_take_precedence() {
    let factory: ResourceFactory = Arc::new(|body: Value| {
        let mut resource = Resource::from_json(body)?;
        resource.set_attribute("title", json!("built by override"));
        Ok(resource)
    });
    let dispatcher = dispatcher().with_resource_factory(common::CORE_USER, factory);

    let user = resource(dispatcher.create(&rfc_examples::user_minimal()).unwrap());
    assert_eq!(user.string_attribute("title"), Some("built by override"));

    let group = resource(dispatcher.create(&rfc_examples::group()).unwrap());
    assert!(group.attribute("title").is_none());
}
