use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use octofhir_core::RawFieldSet;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::{self, OperationResult};
use crate::error::TesterError;
use crate::server::AppState;
use crate::ui::{lookup_asset, render};

const INDEX_PAGE: &str = "index.html";
const RESULT_PAGE: &str = "result.html";

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// `POST /` with a form-encoded tester submission.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, TesterError> {
    state.refresh_pages();

    let fields = RawFieldSet::from_form(&body);
    tracing::debug!(fields = fields.len(), "submission received");

    let result = dispatch::submit(state.client.as_ref(), &state.registry, &fields).await?;

    if wants_json(&headers) {
        return Ok(Json(result).into_response());
    }
    render_result(&state, &result).await
}

pub async fn index(State(state): State<AppState>) -> Result<Response, TesterError> {
    state.refresh_pages();
    render_page(&state, INDEX_PAGE).await
}

/// `GET /{name}`: a static asset if the name is in the asset table, a page otherwise.
pub async fn resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, TesterError> {
    if let Some(asset) = lookup_asset(&name) {
        return Ok((
            [(header::CONTENT_TYPE, asset.content_type)],
            asset.contents,
        )
            .into_response());
    }
    state.refresh_pages();
    render_page(&state, &name).await
}

async fn render_page(state: &AppState, name: &str) -> Result<Response, TesterError> {
    // Unknown pages are rejected before the downstream server is contacted
    if !state.pages.contains(name).await {
        return Err(TesterError::PageNotFound(name.to_string()));
    }

    let capability = state.client.capability_statement().await?;
    let conformance_json = state.codec.encode(&capability)?;
    let software = software_label(&capability);
    let fhir_version = capability
        .get("fhirVersion")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let template = state
        .pages
        .get(name)
        .await?
        .ok_or_else(|| TesterError::PageNotFound(name.to_string()))?;

    let html = render(
        &template,
        &[
            ("base", state.client.base_url()),
            ("conformanceJson", conformance_json.as_str()),
            ("software", software.as_str()),
            ("fhirVersion", fhir_version),
        ],
    );
    Ok(Html(html).into_response())
}

async fn render_result(state: &AppState, result: &OperationResult) -> Result<Response, TesterError> {
    let template = state
        .pages
        .get(RESULT_PAGE)
        .await?
        .ok_or_else(|| TesterError::PageNotFound(RESULT_PAGE.to_string()))?;

    let html = render(
        &template,
        &[
            ("base", result.base.as_str()),
            ("action", result.action.as_str()),
            ("httpMethod", result.http_method.as_str()),
            ("requestUrl", result.request_url.as_str()),
            ("resultStatus", result.status_line.as_str()),
            ("resultBody", result.body.as_str()),
            ("resultSyntaxHighlighterClass", result.highlight.brush()),
        ],
    );
    Ok(Html(html).into_response())
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("application/json"))
}

/// `software.name software.version` from a capability statement.
fn software_label(capability: &Value) -> String {
    let software = capability.get("software");
    let field = |key: &str| {
        software
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    match (field("name"), field("version")) {
        (Some(name), Some(version)) => format!("{name} {version}"),
        (Some(name), None) => name.to_string(),
        _ => "unknown".to_string(),
    }
}
