//! Resource operation handlers: create, read, replace, patch and delete
//! against a [`ProviderAdapter`].

use crate::error::{ScimError, ScimResult};
use crate::operation_handler::core::{ScimMethod, ScimOperationHandler, ScimRequest, ScimResponse};
use crate::protocol::{ProtocolObject, ResourceQuery};
use crate::providers::{Provider, ProviderAdapter};
use crate::resource::Resource;

use log::debug;
use serde_json::Value;

/// Route a resource request to the matching adapter operation.
pub async fn handle_resource<P: Provider, A: ProviderAdapter>(
    handler: &ScimOperationHandler<P>,
    adapter: &A,
    id: Option<&str>,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    match (request.method, id) {
        (ScimMethod::Post, None) => handle_create(handler, adapter, request, correlation_id).await,
        (ScimMethod::Get, None) => super::query::handle_query(adapter, request, correlation_id).await,
        (ScimMethod::Get, Some(id)) => handle_get(adapter, id, request, correlation_id).await,
        (ScimMethod::Put, Some(id)) => handle_replace(handler, adapter, id, request, correlation_id).await,
        (ScimMethod::Patch, Some(id)) => handle_patch(handler, adapter, id, request, correlation_id).await,
        (ScimMethod::Delete, Some(id)) => {
            adapter.delete(id, correlation_id).await?;
            Ok(ScimResponse::no_content())
        }
        (method, Some(_)) => Err(ScimError::invalid_request(format!(
            "{} is not allowed on an individual resource",
            method
        ))),
        (method, None) => Err(ScimError::invalid_request(format!(
            "{} requires a resource identifier",
            method
        ))),
    }
}

/// Dispatch a body that must describe a resource.
fn resource_payload<P: Provider>(handler: &ScimOperationHandler<P>, body: &Value) -> ScimResult<Resource> {
    match handler.dispatcher.create(body)? {
        ProtocolObject::Resource(resource) => Ok(resource),
        ProtocolObject::Extension(extension) => Resource::from_json(extension.body),
        other => Err(ScimError::invalid_request(format!(
            "expected a resource, got {}",
            other.shape_name()
        ))),
    }
}

async fn handle_create<P: Provider, A: ProviderAdapter>(
    handler: &ScimOperationHandler<P>,
    adapter: &A,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    let resource = resource_payload(handler, request.require_body()?)?;
    let created = adapter.create(resource, correlation_id).await?;
    let location = created.meta.as_ref().and_then(|meta| meta.location.clone());
    Ok(ScimResponse::created(created.to_json(), location))
}

async fn handle_get<A: ProviderAdapter>(
    adapter: &A,
    id: &str,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    let query = ResourceQuery::from_query_str(request.query.as_deref().unwrap_or_default())?;
    let body = adapter.retrieve(id, &query, correlation_id).await?;
    Ok(ScimResponse::ok(body))
}

async fn handle_replace<P: Provider, A: ProviderAdapter>(
    handler: &ScimOperationHandler<P>,
    adapter: &A,
    id: &str,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    let mut resource = resource_payload(handler, request.require_body()?)?;
    if let Some(body_id) = &resource.id {
        if !body_id.eq_ignore_ascii_case(id) {
            return Err(ScimError::invalid_request(format!(
                "body id '{}' does not match path id '{}'",
                body_id, id
            )));
        }
    }
    resource.id = Some(id.to_string());
    let replaced = adapter.replace(resource, correlation_id).await?;
    Ok(ScimResponse::ok(replaced.to_json()))
}

async fn handle_patch<P: Provider, A: ProviderAdapter>(
    handler: &ScimOperationHandler<P>,
    adapter: &A,
    id: &str,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    let payload = handler.dispatcher.create(request.require_body()?)?;
    debug!("PATCH payload resolved to {}", payload.shape_name());
    adapter.update(id, payload, correlation_id).await?;
    Ok(ScimResponse::no_content())
}
