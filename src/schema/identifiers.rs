//! Well-known schema identifiers, attribute names and endpoint paths.

/// Core User resource schema.
pub const CORE_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// Core Group resource schema.
pub const CORE_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
/// Enterprise User extension schema.
pub const ENTERPRISE_USER: &str = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// PATCH request message schema.
pub const PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
/// Error response message schema.
pub const ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
/// Query response message schema.
pub const LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

pub const SERVICE_PROVIDER_CONFIG: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";
pub const RESOURCE_TYPE: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";
pub const SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

/// Attribute names with protocol meaning.
pub mod attributes {
    pub const SCHEMAS: &str = "schemas";
    pub const ID: &str = "id";
    pub const META: &str = "meta";
    pub const EXTERNAL_ID: &str = "externalId";
    pub const USER_NAME: &str = "userName";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const MEMBERS: &str = "members";
    pub const VALUE: &str = "value";
    pub const OPERATIONS: &str = "Operations";
}

/// Endpoint paths served by the operation handler.
pub mod endpoints {
    pub const USERS: &str = "/Users";
    pub const GROUPS: &str = "/Groups";
    pub const SERVICE_PROVIDER_CONFIG: &str = "/ServiceProviderConfig";
    pub const RESOURCE_TYPES: &str = "/ResourceTypes";
    pub const SCHEMAS: &str = "/Schemas";
}

/// Case-insensitive identifier comparison.
pub fn same_identifier(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
