//! Query handler for list requests on a resource endpoint.

use crate::error::ScimResult;
use crate::operation_handler::core::{ScimRequest, ScimResponse};
use crate::protocol::ResourceQuery;
use crate::providers::ProviderAdapter;

/// Decode the query string and run it through the adapter.
pub async fn handle_query<A: ProviderAdapter>(
    adapter: &A,
    request: &ScimRequest,
    correlation_id: &str,
) -> ScimResult<ScimResponse> {
    let query = ResourceQuery::from_query_str(request.query.as_deref().unwrap_or_default())?;
    let response = adapter.query(&query, correlation_id).await?;
    Ok(ScimResponse::ok(serde_json::to_value(response)?))
}
