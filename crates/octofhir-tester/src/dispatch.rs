//! Submission handling: validate, execute, classify.

use octofhir_core::{HighlightClass, OperationRequest, RawFieldSet, ResourceTypeRegistry};
use serde::Serialize;

use crate::client::{Exchange, FhirClient};
use crate::error::TesterError;

/// What the result page shows for one executed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub action: String,
    pub base: String,
    pub request_url: String,
    pub http_method: String,
    pub status_line: String,
    pub status: u16,
    pub body: String,
    pub mime_type: Option<String>,
    pub highlight: HighlightClass,
}

impl OperationResult {
    fn from_exchange(request: &OperationRequest, base: &str, exchange: Exchange) -> Self {
        let highlight = HighlightClass::classify(exchange.mime_type.as_deref());
        Self {
            action: request.kind().to_string(),
            base: base.to_string(),
            request_url: exchange.request_url,
            http_method: exchange.method,
            status_line: exchange.status_line,
            status: exchange.status,
            body: exchange.body,
            mime_type: exchange.mime_type,
            highlight,
        }
    }
}

/// Execute an already validated request.
pub async fn dispatch(
    client: &dyn FhirClient,
    request: &OperationRequest,
) -> Result<OperationResult, TesterError> {
    let exchange = client.execute(request).await?;
    tracing::info!(
        action = %request.kind(),
        resource_type = %request.resource_type(),
        status = exchange.status,
        "operation completed"
    );
    Ok(OperationResult::from_exchange(
        request,
        client.base_url(),
        exchange,
    ))
}

/// Validate a form submission and, if it is well formed, execute it.
///
/// A rejected submission never reaches the client.
pub async fn submit(
    client: &dyn FhirClient,
    registry: &ResourceTypeRegistry,
    fields: &RawFieldSet,
) -> Result<OperationResult, TesterError> {
    let request = OperationRequest::from_fields(fields, registry)?;
    dispatch(client, &request).await
}
