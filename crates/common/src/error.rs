//! Error types for Flowspec

use thiserror::Error;

/// Result type alias using Flowspec Error
pub type Result<T> = std::result::Result<T, Error>;

/// Flowspec error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Unknown verification '{0}'")]
    UnknownVerification(String),

    #[error("Missing required parameter '{argument}' for {kind}")]
    MissingArgument { kind: String, argument: String },

    #[error("Invalid parameter '{argument}' for {kind}: {reason}")]
    InvalidArgument {
        kind: String,
        argument: String,
        reason: String,
    },

    #[error("No resource found with name '{name}' in '{location}'")]
    ResourceNotFound { name: String, location: String },

    #[error("Call '{operation}' failed: {message}")]
    AdapterCall { operation: String, message: String },

    #[error("No process instance registered with alias '{0}'")]
    UnknownAlias(String),

    #[error("No process instance available in the test context")]
    NoProcessInstance,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create an adapter call failure
    pub fn adapter(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::AdapterCall {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Errors raised while turning a spec document into the typed model.
    /// These always surface before any test case runs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownAction(_)
                | Error::UnknownVerification(_)
                | Error::MissingArgument { .. }
                | Error::InvalidArgument { .. }
                | Error::Yaml(_)
        )
    }

    /// Alias resolution failures. They fail the current test case only.
    pub fn is_context_resolution(&self) -> bool {
        matches!(self, Error::UnknownAlias(_) | Error::NoProcessInstance)
    }
}
