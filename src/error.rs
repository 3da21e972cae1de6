//! Error types for each layer of the runtime.

use thiserror::Error;

/// Errors raised by a language-model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model endpoint did not answer within the client timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The model endpoint answered with a non-success status.
    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout(err.to_string())
        } else {
            ModelError::Http(err)
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::InvalidResponse(err.to_string())
    }
}

/// Errors raised by the data service and other backend collaborators.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Timeout contacting {0}. Try again.")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub(crate) fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(service.to_string())
        } else if err.is_decode() {
            BackendError::InvalidResponse(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Errors raised while executing a dispatched action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Missing user_id for get_pending_orders")]
    MissingUser,

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),
}

/// Coarse classification of an envelope error, serialized for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoHandler,
    Validation,
    Upstream,
    NotFound,
    Timeout,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::MissingUser | ActionError::InvalidArgument { .. } => ErrorKind::Validation,
            ActionError::Backend(BackendError::NotFound(_)) => ErrorKind::NotFound,
            ActionError::Backend(BackendError::Timeout(_)) => ErrorKind::Timeout,
            ActionError::Model(ModelError::Timeout(_)) => ErrorKind::Timeout,
            ActionError::Backend(_) | ActionError::Model(_) => ErrorKind::Upstream,
        }
    }
}

/// Request-level failures that prevent an envelope from being produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} input not supported yet")]
    UnsupportedInput(&'static str),

    #[error("Timeout contacting LLM service for intent planning. Try again.")]
    Timeout,

    #[error("Upstream model failure: {0}")]
    Upstream(ModelError),

    /// Data prefetch for the keyword query path failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Timeout(_) => PipelineError::Timeout,
            other => PipelineError::Upstream(other),
        }
    }
}

impl PipelineError {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::UnsupportedInput(_) => 400,
            PipelineError::Timeout => 504,
            PipelineError::Upstream(ModelError::Api { status, .. }) => *status,
            PipelineError::Upstream(_) => 502,
            PipelineError::Backend(BackendError::NotFound(_)) => 404,
            PipelineError::Backend(BackendError::Timeout(_)) => 504,
            PipelineError::Backend(BackendError::Upstream { status, .. }) => *status,
            PipelineError::Backend(_) => 502,
        }
    }
}
