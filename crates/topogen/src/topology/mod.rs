//! Topology service boundary, materialization, resolution and fallback

use async_trait::async_trait;

use crate::model::TopologyPayload;

pub mod fallback;
pub mod materializer;
pub mod resolver;

/// Error type for topology service operations
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Topology service not reachable at {0}")]
    NotReachable(String),

    #[error("Topology service error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse topology response: {0}")]
    ParseError(String),

    #[error("Topology service returned no entities")]
    Empty,

    #[error("Topology service disabled")]
    Disabled,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Sends a free-text description to a topology-generation service
#[async_trait]
pub trait TopologyRequestor: Send + Sync {
    async fn request_topology(&self, description: &str) -> Result<TopologyPayload, TopologyError>;
}

/// Requestor that always fails, forcing the deterministic fallback topology
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTopology;

#[async_trait]
impl TopologyRequestor for OfflineTopology {
    async fn request_topology(&self, _description: &str) -> Result<TopologyPayload, TopologyError> {
        Err(TopologyError::Disabled)
    }
}
