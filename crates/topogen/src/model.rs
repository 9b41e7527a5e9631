//! Company profile and infrastructure entity model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use uuid::Uuid;

/// Structured description of an organization.
///
/// `id` and `created_at` are fixed at construction. Every mutator bumps
/// `updated_at`, which never moves backwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    id: Uuid,
    name: String,
    description: String,
    sector: String,
    core_functions: Vec<String>,
    regulatory_requirements: Vec<String>,
    infrastructure: Vec<InfrastructureEntity>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyProfile {
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        sector: impl Into<String>,
        core_functions: Vec<String>,
        regulatory_requirements: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            sector: sector.into(),
            core_functions,
            regulatory_requirements: dedup(regulatory_requirements),
            infrastructure: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn core_functions(&self) -> &[String] {
        &self.core_functions
    }

    pub fn regulatory_requirements(&self) -> &[String] {
        &self.regulatory_requirements
    }

    pub fn infrastructure(&self) -> &[InfrastructureEntity] {
        &self.infrastructure
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_sector(&mut self, sector: impl Into<String>) {
        self.sector = sector.into();
        self.touch();
    }

    pub fn set_core_functions(&mut self, core_functions: Vec<String>) {
        self.core_functions = core_functions;
        self.touch();
    }

    /// Add a regulatory requirement unless it is already listed
    pub fn add_regulatory_requirement(&mut self, requirement: impl Into<String>) {
        let requirement = requirement.into();
        if !self.regulatory_requirements.contains(&requirement) {
            self.regulatory_requirements.push(requirement);
        }
        self.touch();
    }

    pub fn add_infrastructure(&mut self, entity: InfrastructureEntity) {
        self.infrastructure.push(entity);
        self.touch();
    }

    /// Bump `updated_at` to now, unless the clock went backwards
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }
}

fn dedup(items: Vec<String>) -> Vec<String> {
    items.into_iter().collect::<IndexSet<_>>().into_iter().collect()
}

/// Kind of node in the infrastructure graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Organization,
    #[default]
    WebApp,
    Database,
    ApiService,
    LoadBalancer,
    Firewall,
    MailServer,
    FileServer,
    Workstation,
    Router,
    Storage,
    AuthServer,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Organization => "organization",
            EntityType::WebApp => "web_app",
            EntityType::Database => "database",
            EntityType::ApiService => "api_service",
            EntityType::LoadBalancer => "load_balancer",
            EntityType::Firewall => "firewall",
            EntityType::MailServer => "mail_server",
            EntityType::FileServer => "file_server",
            EntityType::Workstation => "workstation",
            EntityType::Router => "router",
            EntityType::Storage => "storage",
            EntityType::AuthServer => "auth_server",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    /// Lenient parse: case, spaces, dashes and underscores are ignored, so
    /// "Web App", "web-app" and "web_app" all map to [`EntityType::WebApp`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "organization" | "organisation" | "org" | "company" => Ok(EntityType::Organization),
            "webapp" | "web" | "webapplication" | "webserver" | "website" => Ok(EntityType::WebApp),
            "database" | "db" => Ok(EntityType::Database),
            "apiservice" | "api" | "apiserver" => Ok(EntityType::ApiService),
            "loadbalancer" | "lb" => Ok(EntityType::LoadBalancer),
            "firewall" => Ok(EntityType::Firewall),
            "mailserver" | "email" | "emailserver" | "mail" => Ok(EntityType::MailServer),
            "fileserver" | "fileshare" => Ok(EntityType::FileServer),
            "workstation" | "desktop" | "endpoint" => Ok(EntityType::Workstation),
            "router" | "gateway" => Ok(EntityType::Router),
            "storage" | "objectstorage" | "blobstorage" => Ok(EntityType::Storage),
            "authserver" | "auth" | "identityprovider" | "idp" => Ok(EntityType::AuthServer),
            _ => Err(format!("Unknown entity type: {}", s)),
        }
    }
}

/// Simulation realism tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum FidelityLevel {
    #[default]
    Virtual,
    SemiReal,
    Concrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    #[default]
    Open,
    Closed,
    Filtered,
}

/// A listening port on an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub number: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: PortStatus,
}

impl Port {
    pub fn tcp(number: u16, service: impl Into<String>) -> Self {
        Self {
            number,
            protocol: Protocol::Tcp,
            service: service.into(),
            status: PortStatus::Open,
        }
    }
}

/// Layout coordinate on the topology canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Entity metadata.
///
/// The keys the pipeline reads are typed fields. Everything else the upstream
/// service sent is kept verbatim in `attributes`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_functions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,
    /// Cached children of an expanded organization. Immutable once non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_entities: Vec<InfrastructureEntity>,
    /// Upstream type label that did not parse as an [`EntityType`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl EntityMetadata {
    /// Split an untyped metadata object into known fields and attributes.
    /// A known key holding a value of the wrong shape stays in `attributes`.
    pub fn from_raw(mut raw: Map<String, Value>) -> Self {
        let description = take_string(&mut raw, "description");
        let core_functions = take_strings(&mut raw, "coreFunctions");
        let endpoints = take_strings(&mut raw, "endpoints").unwrap_or_default();

        Self {
            description,
            core_functions,
            endpoints,
            internal_entities: Vec::new(),
            declared_type: None,
            attributes: raw.into_iter().collect(),
        }
    }
}

fn take_string(raw: &mut Map<String, Value>, key: &str) -> Option<String> {
    match raw.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            raw.insert(key.to_string(), other);
            None
        }
    }
}

fn take_strings(raw: &mut Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match raw.remove(key)? {
        Value::Array(items) if items.iter().all(Value::is_string) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        other => {
            raw.insert(key.to_string(), other);
            None
        }
    }
}

/// A node in the infrastructure graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureEntity {
    id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    pub hostname: String,
    pub ip: String,
    pub fidelity: FidelityLevel,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub metadata: EntityMetadata,
    pub position: Position,
    /// Outgoing edges, by target entity id
    #[serde(default)]
    pub connections: Vec<Uuid>,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl InfrastructureEntity {
    pub fn new(
        id: Uuid,
        entity_type: EntityType,
        name: impl Into<String>,
        hostname: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            hostname: hostname.into(),
            ip: ip.into(),
            fidelity: FidelityLevel::Virtual,
            ports: Vec::new(),
            metadata: EntityMetadata::default(),
            position: Position::default(),
            connections: Vec::new(),
            logs: Vec::new(),
        }
    }

    /// The organization node standing for a profile, carrying the profile's
    /// core functions and description so it can be expanded directly
    pub fn organization(profile: &CompanyProfile, id: Uuid, domain_suffix: &str) -> Self {
        let slug = name_slug(profile.name());
        let mut entity = Self::new(
            id,
            EntityType::Organization,
            profile.name(),
            format!("{}.{}", slug, domain_suffix),
            "10.0.0.1",
        )
        .with_position(Position::new(400.0, 300.0));
        entity.metadata.core_functions = Some(profile.core_functions().to_vec());
        entity.metadata.description = Some(profile.description().to_string());
        entity
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_organization(&self) -> bool {
        self.entity_type == EntityType::Organization
    }

    pub fn is_expanded(&self) -> bool {
        !self.metadata.internal_entities.is_empty()
    }

    /// Add a directed edge to `target` unless it already exists.
    /// Returns whether an edge was added.
    pub fn connect_to(&mut self, target: Uuid) -> bool {
        if self.connections.contains(&target) {
            return false;
        }
        self.connections.push(target);
        true
    }
}

/// Namespace slug of an entity name: lowercased with whitespace removed
pub fn name_slug(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Loosely-structured component record from the topology service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParsedEntity {
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub ports: Option<Vec<Port>>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Connection between two components, named by hostname or name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConnection {
    pub from: String,
    pub to: String,
}

impl RawConnection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Body returned by the topology service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyPayload {
    pub entities: Vec<RawParsedEntity>,
    #[serde(default)]
    pub connections: Vec<RawConnection>,
}
