//! Expansion of organization entities into their internal components
//!
//! Each expansion runs cache-check, request, materialize, resolve and attach in
//! that order. A failed request is replaced by the deterministic fallback
//! topology, so the caller always ends up with populated children.

use std::{collections::HashMap, sync::Arc};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::{
    config::{ExpansionGuard, TopogenConfig},
    ids::IdentifierService,
    model::InfrastructureEntity,
    topology::{
        fallback::FallbackTopologyProvider,
        materializer::EntityMaterializer,
        resolver::{ConnectionResolver, ResolutionReport},
        TopologyError, TopologyRequestor,
    },
};

/// Per-entity expansion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionState {
    #[default]
    Idle,
    Expanding,
    Satisfied,
    Failed,
}

/// What a UI layer needs to render expansion progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionView {
    /// Entity whose request is in flight
    pub expanding: Option<Uuid>,
    /// Entity most recently expanded and not yet closed
    pub expanded: Option<Uuid>,
}

/// How an expansion call ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// Not an organization; nothing happened
    NotExpandable,
    /// Children were already known; no request was made
    Cached { children: usize },
    /// Children came from the topology service
    Generated {
        children: usize,
        report: ResolutionReport,
    },
    /// The topology service failed; the fallback topology was used
    Fallback { children: usize, reason: String },
}

impl ExpansionOutcome {
    pub fn state(&self) -> ExpansionState {
        match self {
            ExpansionOutcome::NotExpandable => ExpansionState::Idle,
            ExpansionOutcome::Cached { .. } | ExpansionOutcome::Generated { .. } => {
                ExpansionState::Satisfied
            }
            ExpansionOutcome::Fallback { .. } => ExpansionState::Failed,
        }
    }

    pub fn children(&self) -> usize {
        match self {
            ExpansionOutcome::NotExpandable => 0,
            ExpansionOutcome::Cached { children }
            | ExpansionOutcome::Generated { children, .. }
            | ExpansionOutcome::Fallback { children, .. } => *children,
        }
    }
}

/// Children computed for one entity, not yet attached
#[derive(Debug, Clone)]
pub struct ExpansionPatch {
    entity_id: Uuid,
    children: Vec<InfrastructureEntity>,
    outcome: ExpansionOutcome,
}

impl ExpansionPatch {
    fn unchanged(entity_id: Uuid, outcome: ExpansionOutcome) -> Self {
        Self {
            entity_id,
            children: Vec::new(),
            outcome,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    pub fn children(&self) -> &[InfrastructureEntity] {
        &self.children
    }

    pub fn outcome(&self) -> &ExpansionOutcome {
        &self.outcome
    }

    /// Attach the children to `entity`.
    ///
    /// A patch for another entity is ignored, and an existing non-empty
    /// `internal_entities` cache is never replaced.
    pub fn apply(self, entity: &mut InfrastructureEntity) -> ExpansionOutcome {
        if entity.id() != self.entity_id {
            warn!(
                "Ignoring expansion patch for {} applied to {}",
                self.entity_id,
                entity.id()
            );
            return ExpansionOutcome::NotExpandable;
        }

        if !self.children.is_empty() {
            if entity.is_expanded() {
                debug!("Entity {} already expanded, keeping cached children", entity.id());
                return ExpansionOutcome::Cached {
                    children: entity.metadata.internal_entities.len(),
                };
            }
            entity.metadata.internal_entities = self.children;
        }
        self.outcome
    }
}

/// Children and outcome produced by one request-or-fallback run
type Expansion = (Vec<InfrastructureEntity>, ExpansionOutcome);

/// Coordinates expansion of organization entities.
///
/// State is keyed by entity id. With [`ExpansionGuard::PerEntity`] calls for
/// one id that overlap share a single request: the first caller runs it and
/// the others wait for its result. The shared slot is dropped as soon as that
/// run finishes, so the entity's own `internal_entities` stays the only cache.
pub struct ExpansionCoordinator {
    requestor: Arc<dyn TopologyRequestor>,
    materializer: EntityMaterializer,
    fallback: FallbackTopologyProvider,
    rng: Mutex<StdRng>,
    guard: ExpansionGuard,
    default_core_functions: Vec<String>,
    states: RwLock<HashMap<Uuid, ExpansionState>>,
    view: RwLock<ExpansionView>,
    in_flight: Mutex<HashMap<Uuid, Arc<OnceCell<Expansion>>>>,
}

impl ExpansionCoordinator {
    pub fn new(
        requestor: Arc<dyn TopologyRequestor>,
        ids: Arc<dyn IdentifierService>,
        config: &TopogenConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            requestor,
            materializer: EntityMaterializer::new(ids.clone(), config.layout.clone()),
            fallback: FallbackTopologyProvider::new(ids, &config.layout),
            rng: Mutex::new(rng),
            guard: config.expansion.guard,
            default_core_functions: config.expansion.default_core_functions.clone(),
            states: RwLock::new(HashMap::new()),
            view: RwLock::new(ExpansionView::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Expand `entity` in place
    pub async fn expand_organization(
        &self,
        entity: &mut InfrastructureEntity,
    ) -> ExpansionOutcome {
        self.plan_expansion(entity).await.apply(entity)
    }

    /// Compute the children for `entity` without touching it
    pub async fn plan_expansion(&self, entity: &InfrastructureEntity) -> ExpansionPatch {
        let id = entity.id();

        if !entity.is_organization() {
            debug!("Entity {} is a {}, not expanding", id, entity.entity_type);
            return ExpansionPatch::unchanged(id, ExpansionOutcome::NotExpandable);
        }

        if entity.is_expanded() {
            let outcome = ExpansionOutcome::Cached {
                children: entity.metadata.internal_entities.len(),
            };
            self.finish(id, ExpansionState::Satisfied).await;
            return ExpansionPatch::unchanged(id, outcome);
        }

        let (children, outcome) = match self.guard {
            ExpansionGuard::PerEntity => self.expand_shared(entity).await,
            ExpansionGuard::LastWriteWins => self.expand_once(entity).await,
        };

        ExpansionPatch {
            entity_id: id,
            children,
            outcome,
        }
    }

    /// Join the run in flight for this entity, or start one
    async fn expand_shared(&self, entity: &InfrastructureEntity) -> Expansion {
        let id = entity.id();
        let slot = self.in_flight.lock().await.entry(id).or_default().clone();

        let mut ran = false;
        let (children, outcome) = slot
            .get_or_init(|| {
                ran = true;
                self.expand_once(entity)
            })
            .await
            .clone();

        if !ran {
            debug!("Joined in-flight expansion of {} ({} children)", id, children.len());
            let outcome = ExpansionOutcome::Cached {
                children: children.len(),
            };
            return (children, outcome);
        }

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.get(&id).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            in_flight.remove(&id);
        }
        (children, outcome)
    }

    async fn expand_once(&self, entity: &InfrastructureEntity) -> Expansion {
        let id = entity.id();
        self.begin(id).await;

        let description = self.describe(entity);
        let (children, outcome) = match self.request_children(entity, &description).await {
            Ok((children, report)) => {
                info!(
                    "Expanded '{}' into {} components ({} connections, {} dropped)",
                    entity.name,
                    children.len(),
                    report.linked,
                    report.dropped
                );
                let outcome = ExpansionOutcome::Generated {
                    children: children.len(),
                    report,
                };
                (children, outcome)
            }
            Err(e) => {
                warn!(
                    "Topology request for '{}' failed, using fallback topology: {}",
                    entity.name, e
                );
                let children = self.fallback.children(entity);
                let outcome = ExpansionOutcome::Fallback {
                    children: children.len(),
                    reason: e.to_string(),
                };
                (children, outcome)
            }
        };

        self.finish(id, outcome.state()).await;
        (children, outcome)
    }

    /// Clear the "currently expanded" pointer, returning the entity it held
    pub async fn close_expansion(&self) -> Option<Uuid> {
        let closed = self.view.write().await.expanded.take();
        if let Some(id) = closed {
            self.states.write().await.insert(id, ExpansionState::Idle);
        }
        closed
    }

    pub async fn view(&self) -> ExpansionView {
        *self.view.read().await
    }

    pub async fn state_of(&self, id: Uuid) -> ExpansionState {
        self.states.read().await.get(&id).copied().unwrap_or_default()
    }

    async fn request_children(
        &self,
        entity: &InfrastructureEntity,
        description: &str,
    ) -> Result<(Vec<InfrastructureEntity>, ResolutionReport), TopologyError> {
        let payload = self.requestor.request_topology(description).await?;
        if payload.entities.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut children = {
            let mut rng = self.rng.lock().await;
            self.materializer.materialize(payload.entities, entity, &mut *rng)
        };
        let report = ConnectionResolver::resolve(&payload.connections, &mut children);
        Ok((children, report))
    }

    /// Request text built from the entity's name, declared core functions and
    /// declared description
    fn describe(&self, entity: &InfrastructureEntity) -> String {
        let functions = entity
            .metadata
            .core_functions
            .as_ref()
            .filter(|functions| !functions.is_empty())
            .unwrap_or(&self.default_core_functions)
            .join(", ");

        let mut description = format!(
            "Internal infrastructure for {}, an organization with the following \
             core functions: {}.",
            entity.name, functions
        );
        if let Some(extra) = entity
            .metadata
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            description.push(' ');
            description.push_str(extra);
        }
        description
    }

    async fn begin(&self, id: Uuid) {
        self.states.write().await.insert(id, ExpansionState::Expanding);
        self.view.write().await.expanding = Some(id);
    }

    async fn finish(&self, id: Uuid, state: ExpansionState) {
        self.states.write().await.insert(id, state);
        let mut view = self.view.write().await;
        if view.expanding == Some(id) {
            view.expanding = None;
        }
        view.expanded = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        ids::SequentialIds,
        model::{EntityType, RawConnection, RawParsedEntity, TopologyPayload},
        test_support::ScriptedTopology,
    };

    fn organization(name: &str) -> InfrastructureEntity {
        let mut org = InfrastructureEntity::new(
            Uuid::new_v4(),
            EntityType::Organization,
            name,
            "org.local",
            "10.0.0.1",
        );
        org.metadata.core_functions = Some(vec!["Payments".to_string(), "Lending".to_string()]);
        org.metadata.description = Some("Retail bank".to_string());
        org
    }

    fn payload() -> TopologyPayload {
        TopologyPayload {
            entities: vec![
                RawParsedEntity {
                    entity_type: Some("web_app".to_string()),
                    name: Some("Portal".to_string()),
                    ..Default::default()
                },
                RawParsedEntity {
                    entity_type: Some("database".to_string()),
                    name: Some("Ledger".to_string()),
                    hostname: Some("ledger.internal".to_string()),
                    ..Default::default()
                },
            ],
            connections: vec![
                RawConnection::new("Portal", "ledger.internal"),
                RawConnection::new("Portal", "Mainframe"),
            ],
        }
    }

    fn coordinator(topology: Arc<ScriptedTopology>, guard: ExpansionGuard) -> ExpansionCoordinator {
        let mut config = TopogenConfig::default();
        config.seed = Some(7);
        config.expansion.guard = guard;
        ExpansionCoordinator::new(topology, Arc::new(SequentialIds::new()), &config)
    }

    #[tokio::test]
    async fn test_generated_expansion_attaches_linked_children() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        let outcome = coordinator.expand_organization(&mut org).await;

        assert_eq!(
            outcome,
            ExpansionOutcome::Generated {
                children: 2,
                report: ResolutionReport { linked: 1, dropped: 1, duplicates: 0 },
            }
        );
        let children = &org.metadata.internal_entities;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].connections, vec![children[1].id()]);
        assert_eq!(children[0].hostname, "component-1.acmebank.local");
        assert_eq!(coordinator.state_of(org.id()).await, ExpansionState::Satisfied);
        assert_eq!(topology.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_description_uses_declared_fields() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);

        coordinator.expand_organization(&mut organization("Acme Bank")).await;

        let description = &topology.descriptions()[0];
        assert!(description.contains("Acme Bank"));
        assert!(description.contains("Payments, Lending"));
        assert!(description.ends_with("Retail bank"));
    }

    #[tokio::test]
    async fn test_default_core_functions_when_none_declared() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let mut org = organization("Acme");
        org.metadata.core_functions = None;
        org.metadata.description = None;

        coordinator.expand_organization(&mut org).await;

        assert!(topology.descriptions()[0].contains("general business operations"));
    }

    #[tokio::test]
    async fn test_second_call_reuses_cache() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        coordinator.expand_organization(&mut org).await;
        let first = org.metadata.internal_entities.clone();
        let outcome = coordinator.expand_organization(&mut org).await;

        assert_eq!(outcome, ExpansionOutcome::Cached { children: 2 });
        assert_eq!(org.metadata.internal_entities, first);
        assert_eq!(topology.calls(), 1);
    }

    #[tokio::test]
    async fn test_prepopulated_cache_makes_no_request() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::LastWriteWins);
        let mut org = organization("Acme Bank");
        org.metadata.internal_entities = vec![
            InfrastructureEntity::new(Uuid::new_v4(), EntityType::WebApp, "A", "a", "10.0.0.2"),
            InfrastructureEntity::new(Uuid::new_v4(), EntityType::Database, "B", "b", "10.0.0.3"),
        ];

        let outcome = coordinator.expand_organization(&mut org).await;

        assert_eq!(outcome, ExpansionOutcome::Cached { children: 2 });
        assert_eq!(org.metadata.internal_entities.len(), 2);
        assert_eq!(topology.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_request_attaches_fallback() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Err(
            TopologyError::NotReachable("http://localhost:8000".to_string()),
        )]));
        let coordinator = coordinator(topology, ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        let outcome = coordinator.expand_organization(&mut org).await;

        assert!(matches!(outcome, ExpansionOutcome::Fallback { children: 3, .. }));
        let hostnames: Vec<_> = org
            .metadata
            .internal_entities
            .iter()
            .map(|c| c.hostname.as_str())
            .collect();
        assert_eq!(
            hostnames,
            vec!["web.acmebank.local", "db.acmebank.local", "api.acmebank.local"]
        );
        assert_eq!(coordinator.state_of(org.id()).await, ExpansionState::Failed);
    }

    #[tokio::test]
    async fn test_empty_payload_attaches_fallback() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(TopologyPayload::default())]));
        let coordinator = coordinator(topology, ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        let outcome = coordinator.expand_organization(&mut org).await;

        let ExpansionOutcome::Fallback { reason, .. } = outcome else {
            panic!("expected fallback");
        };
        assert!(reason.contains("no entities"));
        assert_eq!(org.metadata.internal_entities.len(), 3);
    }

    #[tokio::test]
    async fn test_non_organization_is_untouched() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let mut db =
            InfrastructureEntity::new(Uuid::new_v4(), EntityType::Database, "DB", "db", "10.0.0.5");

        let outcome = coordinator.expand_organization(&mut db).await;

        assert_eq!(outcome, ExpansionOutcome::NotExpandable);
        assert!(!db.is_expanded());
        assert_eq!(topology.calls(), 0);
        assert_eq!(coordinator.state_of(db.id()).await, ExpansionState::Idle);
        assert_eq!(coordinator.view().await, ExpansionView::default());
    }

    #[tokio::test]
    async fn test_view_and_close_expansion() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology, ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        coordinator.expand_organization(&mut org).await;
        assert_eq!(
            coordinator.view().await,
            ExpansionView { expanding: None, expanded: Some(org.id()) }
        );

        assert_eq!(coordinator.close_expansion().await, Some(org.id()));
        assert_eq!(coordinator.view().await.expanded, None);
        assert_eq!(coordinator.state_of(org.id()).await, ExpansionState::Idle);
        assert_eq!(coordinator.close_expansion().await, None);
        assert!(org.is_expanded());
    }

    #[tokio::test]
    async fn test_overlapping_calls_share_one_request() {
        let topology = Arc::new(
            ScriptedTopology::returning(vec![Ok(payload()), Ok(payload())]).with_delay_ms(20),
        );
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let org = organization("Acme Bank");
        let (mut first, mut second) = (org.clone(), org);

        let (a, b) = tokio::join!(
            coordinator.expand_organization(&mut first),
            coordinator.expand_organization(&mut second),
        );

        assert_eq!(topology.calls(), 1);
        assert!(matches!(a, ExpansionOutcome::Generated { .. }));
        assert_eq!(b, ExpansionOutcome::Cached { children: 2 });
        assert_eq!(first.metadata.internal_entities, second.metadata.internal_entities);
        assert!(coordinator.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cleared_cache_is_requested_again() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload()), Ok(payload())]));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);
        let mut org = organization("Acme Bank");

        coordinator.expand_organization(&mut org).await;
        org.metadata.internal_entities.clear();
        let outcome = coordinator.expand_organization(&mut org).await;

        assert!(matches!(outcome, ExpansionOutcome::Generated { children: 2, .. }));
        assert_eq!(topology.calls(), 2);
        assert_eq!(org.metadata.internal_entities.len(), 2);
    }

    #[tokio::test]
    async fn test_no_per_entity_state_left_after_expansion() {
        let responses = (0..20).map(|_| Ok(payload())).collect();
        let topology = Arc::new(ScriptedTopology::returning(responses));
        let coordinator = coordinator(topology.clone(), ExpansionGuard::PerEntity);

        for i in 0..20 {
            let mut org = organization(&format!("Org {i}"));
            coordinator.expand_organization(&mut org).await;
            assert!(org.is_expanded());
        }

        assert_eq!(topology.calls(), 20);
        assert!(coordinator.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins_issues_both_requests() {
        let topology = Arc::new(
            ScriptedTopology::returning(vec![Ok(payload()), Ok(payload())]).with_delay_ms(20),
        );
        let coordinator = coordinator(topology.clone(), ExpansionGuard::LastWriteWins);
        let org = organization("Acme Bank");
        let (mut first, mut second) = (org.clone(), org);

        tokio::join!(
            coordinator.expand_organization(&mut first),
            coordinator.expand_organization(&mut second),
        );

        assert_eq!(topology.calls(), 2);
        assert!(first.is_expanded() && second.is_expanded());
    }

    #[tokio::test]
    async fn test_patch_keeps_existing_cache() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology, ExpansionGuard::LastWriteWins);
        let mut org = organization("Acme Bank");

        let patch = coordinator.plan_expansion(&org).await;
        assert_eq!(patch.children().len(), 2);
        assert!(!org.is_expanded());

        let existing =
            InfrastructureEntity::new(Uuid::new_v4(), EntityType::WebApp, "A", "a", "10.0.0.2");
        org.metadata.internal_entities = vec![existing.clone()];

        let outcome = patch.apply(&mut org);
        assert_eq!(outcome, ExpansionOutcome::Cached { children: 1 });
        assert_eq!(org.metadata.internal_entities, vec![existing]);
    }

    #[tokio::test]
    async fn test_patch_for_other_entity_is_ignored() {
        let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
        let coordinator = coordinator(topology, ExpansionGuard::PerEntity);
        let org = organization("Acme Bank");
        let mut other = organization("Other Co");

        let patch = coordinator.plan_expansion(&org).await;
        assert_eq!(patch.entity_id(), org.id());
        assert_eq!(patch.apply(&mut other), ExpansionOutcome::NotExpandable);
        assert!(!other.is_expanded());
    }

    #[tokio::test]
    async fn test_seeded_layout_is_reproducible() {
        let run = || async {
            let topology = Arc::new(ScriptedTopology::returning(vec![Ok(payload())]));
            let coordinator = coordinator(topology, ExpansionGuard::PerEntity);
            let mut org = organization("Acme Bank");
            coordinator.expand_organization(&mut org).await;
            org.metadata
                .internal_entities
                .iter()
                .map(|c| json!({ "ip": c.ip, "x": c.position.x, "y": c.position.y }))
                .collect::<Vec<_>>()
        };

        assert_eq!(run().await, run().await);
    }
}
