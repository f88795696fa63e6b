use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use octofhir_core::CoreError;
use thiserror::Error;

use crate::client::ClientError;

/// Terminal failure of a tester request.
#[derive(Debug, Error)]
pub enum TesterError {
    /// Submission did not describe a valid operation, or a codec failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Downstream(#[from] ClientError),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Failed to load template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl TesterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Core(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::PageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Core(_) | Self::Downstream(_) | Self::Template { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Category recorded with every logged failure.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Core(e) => e.category().as_str(),
            Self::Downstream(_) => "downstream",
            Self::PageNotFound(_) | Self::Template { .. } => "presentation",
        }
    }
}

impl IntoResponse for TesterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, category = self.category(), "Failure during processing");
        } else {
            tracing::debug!(
                status = status.as_u16(),
                category = self.category(),
                reason = %self,
                "request rejected"
            );
        }
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        let err = TesterError::from(CoreError::missing_field("id", "ID"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No ID specified");

        let err = TesterError::from(CoreError::invalid_resource_type("Nope"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = TesterError::from(CoreError::invalid_method("bogus"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_downstream_error_is_server_error() {
        let err = TesterError::from(ClientError::Status {
            url: "http://x/metadata".into(),
            status: 503,
            message: "down".into(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "http://x/metadata returned HTTP 503: down");
    }

    #[test]
    fn test_codec_failure_is_server_error() {
        let err = TesterError::from(CoreError::configuration("x"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_categories() {
        assert_eq!(TesterError::from(CoreError::MissingMethod).category(), "discriminator");
        assert_eq!(
            TesterError::from(CoreError::missing_field("id", "ID")).category(),
            "validation"
        );
        assert_eq!(TesterError::from(CoreError::configuration("x")).category(), "configuration");
        let downstream = TesterError::from(ClientError::CannotBeABase("x".into()));
        assert_eq!(downstream.category(), "downstream");
        assert_eq!(TesterError::PageNotFound("a.html".into()).category(), "presentation");
    }

    #[test]
    fn test_page_not_found() {
        let err = TesterError::PageNotFound("nope.html".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
