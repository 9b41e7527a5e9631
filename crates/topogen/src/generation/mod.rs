//! Generative backend abstraction for structured profile extraction

use async_trait::async_trait;

pub mod schema;

/// Error type for generative backend operations
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Provider not available: {0}")]
    NotAvailable(String),
}

/// A structured-extraction request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System instructions for the model
    pub instructions: String,
    /// Free-text organization description
    pub description: String,
    /// JSON schema the output must satisfy
    pub schema: serde_json::Value,
}

/// Backend able to turn a description into a JSON document matching a schema.
///
/// Implementations return whatever document the model produced; validating it
/// against the schema is the caller's job.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError>;
}

/// Backend that is never available.
///
/// Selecting it forces every profile onto the rule-based path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl GenerationBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<serde_json::Value, GenerationError> {
        Err(GenerationError::NotAvailable(
            "generation backend disabled".to_string(),
        ))
    }
}
