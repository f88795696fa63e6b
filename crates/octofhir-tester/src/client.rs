//! Outbound FHIR REST client.
//!
//! The tester shows the operator exactly what went over the wire, so the
//! client returns an [`Exchange`] with the final URL, method, status line and
//! raw body instead of a decoded resource. Non-2xx responses are captured like
//! any other response.

use std::sync::Arc;

use async_trait::async_trait;
use octofhir_core::OperationRequest;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::{ClientAuth, ClientConfig};

const CAPABILITY_ACCEPT: &str = "application/fhir+json";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Server base URL '{0}' cannot carry a resource path")]
    CannotBeABase(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Failed to connect to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One request/response pair as seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub request_url: String,
    pub method: String,
    /// e.g. `HTTP/1.1 200 OK`
    pub status_line: String,
    pub status: u16,
    pub body: String,
    /// Declared media type without parameters, e.g. `application/fhir+json`
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait FhirClient: Send + Sync {
    /// Server base URL as configured.
    fn base_url(&self) -> &str;

    /// Perform a read, vread or search and capture the exchange.
    async fn execute(&self, request: &OperationRequest) -> Result<Exchange, ClientError>;

    /// Fetch `{base}/metadata`.
    async fn capability_statement(&self) -> Result<Value, ClientError>;
}

pub type DynFhirClient = Arc<dyn FhirClient>;

pub struct HttpFhirClient {
    http: reqwest::Client,
    base_url: Url,
    base_display: String,
    accept: &'static str,
    auth: Option<ClientAuth>,
}

impl HttpFhirClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| ClientError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::CannotBeABase(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("octofhir-tester/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            base_display: config.base_url.trim_end_matches('/').to_string(),
            base_url,
            accept: config.encoding.accept(),
            auth: config.auth.clone(),
        })
    }

    /// Absolute URL for an operation below the base.
    pub fn operation_url(&self, request: &OperationRequest) -> Result<Url, ClientError> {
        self.url_for(&request.path_segments(), &request.query_pairs())
    }

    fn url_for(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::CannotBeABase(self.base_display.clone()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url, accept: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        match &self.auth {
            Some(ClientAuth::Basic { username, password }) => {
                req = req.basic_auth(username, Some(password));
            }
            Some(ClientAuth::Bearer { token }) => {
                req = req.bearer_auth(token);
            }
            None => {}
        }
        req.header(ACCEPT, accept)
    }
}

#[async_trait]
impl FhirClient for HttpFhirClient {
    fn base_url(&self) -> &str {
        &self.base_display
    }

    async fn execute(&self, request: &OperationRequest) -> Result<Exchange, ClientError> {
        let url = self.operation_url(request)?;
        let url_text = url.to_string();
        let req = self
            .request(reqwest::Method::GET, url, self.accept)
            .build()
            .map_err(|source| ClientError::Transport {
                url: url_text.clone(),
                source,
            })?;

        let request_url = req.url().to_string();
        let method = req.method().to_string();
        tracing::debug!(%method, url = %request_url, "sending FHIR request");

        let resp = self
            .http
            .execute(req)
            .await
            .map_err(|source| ClientError::Transport {
                url: request_url.clone(),
                source,
            })?;

        let status = resp.status();
        let status_line = format!("{:?} {}", resp.version(), status);
        let mime_type = declared_mime_type(resp.headers());
        let body = resp.text().await.map_err(|source| ClientError::Body {
            url: request_url.clone(),
            source,
        })?;

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "FHIR response received");

        Ok(Exchange {
            request_url,
            method,
            status_line,
            status: status.as_u16(),
            body,
            mime_type,
        })
    }

    async fn capability_statement(&self) -> Result<Value, ClientError> {
        let url = self.url_for(&["metadata"], &[])?;
        let url_text = url.to_string();
        let resp = self
            .request(reqwest::Method::GET, url, CAPABILITY_ACCEPT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url_text.clone(),
                source,
            })?;
        decode_json(resp, url_text).await
    }
}

fn declared_mime_type(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn decode_json(resp: reqwest::Response, url: String) -> Result<Value, ClientError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|source| ClientError::Body {
        url: url.clone(),
        source,
    })?;

    if !status.is_success() {
        return Err(ClientError::Status {
            url,
            status: status.as_u16(),
            message: outcome_diagnostics(&body).unwrap_or(body),
        });
    }

    serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
}

/// Diagnostics of an OperationOutcome body, joined with `; `.
fn outcome_diagnostics(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    if json.get("resourceType").and_then(|v| v.as_str()) != Some("OperationOutcome") {
        return None;
    }
    let msgs: Vec<&str> = json
        .get("issue")?
        .as_array()?
        .iter()
        .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
        .collect();
    (!msgs.is_empty()).then(|| msgs.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_core::{ParameterMap, QueryParameter, ResourceTypeRegistry};

    fn client(base_url: &str) -> HttpFhirClient {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        HttpFhirClient::new(&config).expect("client")
    }

    fn resource(name: &str) -> octofhir_core::ResourceType {
        ResourceTypeRegistry::standard().resolve(name).unwrap()
    }

    #[test]
    fn test_read_and_vread_urls() {
        let client = client("http://fhir.example.org/baseR4/");
        let read = OperationRequest::read(resource("Patient"), "123");
        assert_eq!(
            client.operation_url(&read).unwrap().as_str(),
            "http://fhir.example.org/baseR4/Patient/123"
        );

        let vread = OperationRequest::vread(resource("Patient"), "123", "2");
        assert_eq!(
            client.operation_url(&vread).unwrap().as_str(),
            "http://fhir.example.org/baseR4/Patient/123/_history/2"
        );
    }

    #[test]
    fn test_search_url_encodes_tokens() {
        let client = client("http://fhir.example.org/fhir");
        let mut params = ParameterMap::new();
        params.insert("family".to_string(), vec![QueryParameter::string("Smith")]);
        params.insert(
            "identifier".to_string(),
            vec![QueryParameter::token(Some("urn:mrn"), Some("42"))],
        );
        let search = OperationRequest::search(resource("Patient"), params);
        assert_eq!(
            client.operation_url(&search).unwrap().as_str(),
            "http://fhir.example.org/fhir/Patient?family=Smith&identifier=urn%3Amrn%7C42"
        );
    }

    #[test]
    fn test_ids_are_percent_encoded_in_path() {
        let client = client("http://fhir.example.org/fhir");
        let read = OperationRequest::read(resource("Patient"), "a/b");
        assert_eq!(
            client.operation_url(&read).unwrap().as_str(),
            "http://fhir.example.org/fhir/Patient/a%2Fb"
        );
    }

    #[test]
    fn test_base_url_display_is_trimmed() {
        assert_eq!(
            client("http://fhir.example.org/fhir/").base_url(),
            "http://fhir.example.org/fhir"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ClientConfig {
            base_url: "::nope".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpFhirClient::new(&config),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_outcome_diagnostics() {
        let body = r#"{"resourceType":"OperationOutcome","issue":[{"diagnostics":"a"},{"diagnostics":"b"}]}"#;
        assert_eq!(outcome_diagnostics(body).as_deref(), Some("a; b"));
        assert_eq!(outcome_diagnostics(r#"{"resourceType":"Patient"}"#), None);
        assert_eq!(outcome_diagnostics("not json"), None);
    }

    #[test]
    fn test_declared_mime_type_strips_parameters() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            "application/fhir+json;charset=UTF-8".parse().unwrap(),
        );
        assert_eq!(
            declared_mime_type(&headers).as_deref(),
            Some("application/fhir+json")
        );
        assert_eq!(declared_mime_type(&reqwest::header::HeaderMap::new()), None);
    }
}
