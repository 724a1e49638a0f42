//! Discovery handlers: ServiceProviderConfig, ResourceTypes and Schemas.

use crate::error::{ScimError, ScimResult};
use crate::operation_handler::core::{Route, ScimMethod, ScimOperationHandler, ScimRequest, ScimResponse};
use crate::protocol::QueryResponse;
use crate::providers::Provider;
use crate::schema_discovery::SchemaDiscovery;

use serde_json::Value;

/// Serve a discovery document. Only GET is supported.
pub(crate) fn handle_discovery<P: Provider>(
    handler: &ScimOperationHandler<P>,
    route: &Route,
    request: &ScimRequest,
) -> ScimResult<ScimResponse> {
    if request.method != ScimMethod::Get {
        return Err(ScimError::not_implemented(
            request.path.trim_matches('/'),
            request.method.to_string(),
        ));
    }
    let discovery = &handler.discovery;

    match route {
        Route::ServiceProviderConfig => Ok(ScimResponse::ok(serde_json::to_value(
            discovery.service_provider_config(),
        )?)),
        Route::ResourceTypes(None) => {
            let documents = discovery
                .resource_types()
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(list_response(documents)?)
        }
        Route::ResourceTypes(Some(name)) => {
            let document = discovery
                .resource_type(name)
                .ok_or_else(|| ScimError::resource_not_found("ResourceType", name.as_str()))?;
            Ok(ScimResponse::ok(serde_json::to_value(document)?))
        }
        Route::Schemas(None) => {
            let documents = discovery
                .schemas()
                .into_iter()
                .map(SchemaDiscovery::schema_document)
                .collect::<ScimResult<Vec<_>>>()?;
            Ok(list_response(documents)?)
        }
        Route::Schemas(Some(id)) => {
            let schema = discovery
                .schema(id)
                .ok_or_else(|| ScimError::resource_not_found("Schema", id.as_str()))?;
            Ok(ScimResponse::ok(SchemaDiscovery::schema_document(schema)?))
        }
        Route::Resource { .. } | Route::Root(_) => {
            Err(ScimError::internal("not a discovery route"))
        }
    }
}

fn list_response(documents: Vec<Value>) -> ScimResult<ScimResponse> {
    let total = documents.len();
    let response = QueryResponse::new(documents, total, 1);
    Ok(ScimResponse::ok(serde_json::to_value(response)?))
}
