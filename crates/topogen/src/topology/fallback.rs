//! Deterministic default topology for an organization

use std::sync::Arc;

use crate::{
    config::LayoutConfig,
    ids::IdentifierService,
    model::{name_slug, EntityMetadata, EntityType, InfrastructureEntity, Port, Position},
};

const DEFAULT_API_FUNCTIONS: &[&str] = &["Customer Management", "Data Access", "Authentication"];

const API_ENDPOINTS: &[&str] = &[
    "/api/v1/health",
    "/api/v1/auth/login",
    "/api/v1/customers",
    "/api/v1/records",
];

/// Builds the fixed web portal / database / API service trio.
///
/// Apart from freshly issued ids the output depends only on the parent's name
/// and declared core functions: addresses and positions are constants.
pub struct FallbackTopologyProvider {
    ids: Arc<dyn IdentifierService>,
    domain_suffix: String,
}

impl FallbackTopologyProvider {
    pub fn new(ids: Arc<dyn IdentifierService>, layout: &LayoutConfig) -> Self {
        Self {
            ids,
            domain_suffix: layout.domain_suffix.clone(),
        }
    }

    /// Children in the order web portal, database, API service, linked
    /// web -> api -> db
    pub fn children(&self, parent: &InfrastructureEntity) -> Vec<InfrastructureEntity> {
        let slug = name_slug(&parent.name);
        let host = |role: &str| format!("{}.{}.{}", role, slug, self.domain_suffix);

        let mut web = InfrastructureEntity::new(
            self.ids.issue(),
            EntityType::WebApp,
            format!("{} Web Portal", parent.name),
            host("web"),
            "10.0.1.10",
        )
        .with_ports(vec![Port::tcp(80, "http"), Port::tcp(443, "https")])
        .with_position(Position::new(250.0, 250.0));

        let database = InfrastructureEntity::new(
            self.ids.issue(),
            EntityType::Database,
            format!("{} Database", parent.name),
            host("db"),
            "10.0.1.20",
        )
        .with_ports(vec![Port::tcp(5432, "postgresql")])
        .with_position(Position::new(550.0, 250.0));

        let core_functions = parent
            .metadata
            .core_functions
            .clone()
            .filter(|functions| !functions.is_empty())
            .unwrap_or_else(|| DEFAULT_API_FUNCTIONS.iter().map(|f| f.to_string()).collect());

        let mut api = InfrastructureEntity::new(
            self.ids.issue(),
            EntityType::ApiService,
            format!("{} API Service", parent.name),
            host("api"),
            "10.0.1.30",
        )
        .with_ports(vec![Port::tcp(8080, "http-api")])
        .with_metadata(EntityMetadata {
            description: Some(format!("Internal API for {}", parent.name)),
            core_functions: Some(core_functions),
            endpoints: API_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        })
        .with_position(Position::new(400.0, 400.0));

        web.connect_to(api.id());
        api.connect_to(database.id());

        vec![web, database, api]
    }
}
