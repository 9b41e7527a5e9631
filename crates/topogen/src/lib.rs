//! # Topogen - Organization Topology Generation
//!
//! Turns a free-text description of an organization into a structured company
//! profile and a simulated infrastructure topology of typed entities joined by
//! directed connections.
//!
//! ## Pipeline
//!
//! - **Profiles**: structured extraction through a [`GenerationBackend`], with a
//!   deterministic rule-based fallback when extraction fails
//! - **Materialization**: raw component records become fully-specified entities
//! - **Resolution**: textual connection endpoints become entity references
//! - **Expansion**: cached, idempotent attachment of an organization's internal
//!   components, with a deterministic fallback topology
//!
//! Every operation except input validation degrades to deterministic defaults
//! instead of failing.

pub mod classifier;
pub mod config;
pub mod expansion;
pub mod generation;
pub mod ids;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod topology;

#[cfg(test)]
mod test_support;

pub use classifier::{Classification, Sector, SectorClassifier};
pub use config::{
    CanvasBounds, ConfigError, ExpansionConfig, ExpansionGuard, GenerationConfig,
    GenerationProvider, LayoutConfig, TopogenConfig, TopologyServiceConfig,
};
pub use expansion::{
    ExpansionCoordinator, ExpansionOutcome, ExpansionPatch, ExpansionState, ExpansionView,
};
pub use generation::{
    schema::{GeneratedProfile, SchemaCheck, SchemaViolation},
    DisabledBackend, GenerationBackend, GenerationError, GenerationRequest,
};
pub use ids::{IdentifierService, RandomIds, SequentialIds};
pub use model::{
    CompanyProfile, EntityMetadata, EntityType, FidelityLevel, InfrastructureEntity, Port,
    PortStatus, Position, Protocol, RawConnection, RawParsedEntity, TopologyPayload,
};
pub use pipeline::Topogen;
pub use profile::{ProfileGenerator, ProfileSource};
pub use topology::{
    fallback::FallbackTopologyProvider,
    materializer::EntityMaterializer,
    resolver::{ConnectionResolver, ResolutionReport},
    OfflineTopology, TopologyError, TopologyRequestor,
};

/// Error surfaced by the pipeline.
///
/// Backend and topology failures are recovered through the fallbacks and
/// never reach this type; configuration loading reports [`ConfigError`].
#[derive(Debug, thiserror::Error)]
pub enum TopogenError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, TopogenError>;
