use thiserror::Error;

/// Core error types for turning a submission into an operation request
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("No method specified")]
    MissingMethod,

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("No {label} specified")]
    MissingField {
        field: &'static str,
        label: &'static str,
    },

    #[error("Invalid resourceName: {0}")]
    InvalidResourceType(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    /// Create a new InvalidMethod error
    pub fn invalid_method(method: impl Into<String>) -> Self {
        Self::InvalidMethod(method.into())
    }

    /// Create a new MissingField error for a form field and its display label
    pub fn missing_field(field: &'static str, label: &'static str) -> Self {
        Self::MissingField { field, label }
    }

    /// Create a new InvalidResourceType error
    pub fn invalid_resource_type(resource_type: impl Into<String>) -> Self {
        Self::InvalidResourceType(resource_type.into())
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this error was caused by the submitted data (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingMethod
                | Self::InvalidMethod(_)
                | Self::MissingField { .. }
                | Self::InvalidResourceType(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingMethod | Self::InvalidMethod(_) => ErrorCategory::Discriminator,
            Self::MissingField { .. } | Self::InvalidResourceType(_) => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for logging and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Discriminator,
    Serialization,
    Configuration,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Discriminator => "discriminator",
            Self::Serialization => "serialization",
            Self::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
