//! End-to-end facade over profile generation and expansion

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::TopogenConfig,
    expansion::{ExpansionCoordinator, ExpansionOutcome, ExpansionView},
    generation::GenerationBackend,
    ids::IdentifierService,
    model::{CompanyProfile, InfrastructureEntity},
    profile::{ProfileGenerator, ProfileSource},
    topology::TopologyRequestor,
    Result,
};

/// Owns one profile generator and one expansion coordinator sharing an id
/// issuer
pub struct Topogen {
    profiles: ProfileGenerator,
    expansion: ExpansionCoordinator,
    ids: Arc<dyn IdentifierService>,
    domain_suffix: String,
}

impl Topogen {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        requestor: Arc<dyn TopologyRequestor>,
        ids: Arc<dyn IdentifierService>,
        config: &TopogenConfig,
    ) -> Self {
        Self {
            profiles: ProfileGenerator::new(backend, ids.clone()),
            expansion: ExpansionCoordinator::new(requestor, ids.clone(), config),
            ids,
            domain_suffix: config.layout.domain_suffix.clone(),
        }
    }

    pub async fn generate_profile(
        &self,
        description: &str,
        name: Option<&str>,
    ) -> Result<CompanyProfile> {
        self.profiles.generate_profile(description, name).await
    }

    pub async fn generate_profile_with_source(
        &self,
        description: &str,
        name: Option<&str>,
    ) -> Result<(CompanyProfile, ProfileSource)> {
        self.profiles
            .generate_profile_with_source(description, name)
            .await
    }

    /// A fresh organization entity for `profile`
    pub fn organization_entity(&self, profile: &CompanyProfile) -> InfrastructureEntity {
        InfrastructureEntity::organization(profile, self.ids.issue(), &self.domain_suffix)
    }

    pub async fn expand_organization(
        &self,
        entity: &mut InfrastructureEntity,
    ) -> ExpansionOutcome {
        self.expansion.expand_organization(entity).await
    }

    pub async fn close_expansion(&self) -> Option<Uuid> {
        self.expansion.close_expansion().await
    }

    pub async fn view(&self) -> ExpansionView {
        self.expansion.view().await
    }

    pub fn coordinator(&self) -> &ExpansionCoordinator {
        &self.expansion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        generation::DisabledBackend, ids::SequentialIds, model::EntityType,
        topology::OfflineTopology, TopogenError,
    };

    fn offline() -> Topogen {
        let mut config = TopogenConfig::default();
        config.seed = Some(1);
        Topogen::new(
            Arc::new(DisabledBackend),
            Arc::new(OfflineTopology),
            Arc::new(SequentialIds::new()),
            &config,
        )
    }

    #[tokio::test]
    async fn test_offline_profile_then_expand() {
        let topogen = offline();

        let (profile, source) = topogen
            .generate_profile_with_source("A payment processing bank", Some("Acme Bank"))
            .await
            .unwrap();
        assert!(matches!(source, ProfileSource::RuleBased { .. }));
        assert_eq!(profile.sector(), "Banking");

        let mut org = topogen.organization_entity(&profile);
        assert_eq!(org.entity_type, EntityType::Organization);
        assert_eq!(org.hostname, "acmebank.local");
        assert_ne!(org.id(), profile.id());

        let outcome = topogen.expand_organization(&mut org).await;
        assert!(matches!(outcome, ExpansionOutcome::Fallback { children: 3, .. }));
        assert_eq!(topogen.view().await.expanded, Some(org.id()));

        let api = &org.metadata.internal_entities[2];
        assert_eq!(api.metadata.core_functions.as_deref(), Some(profile.core_functions()));

        assert_eq!(topogen.close_expansion().await, Some(org.id()));
    }

    #[tokio::test]
    async fn test_domain_suffix_applies_to_organization_and_children() {
        let mut config = TopogenConfig::default();
        config.layout.domain_suffix = "corp.sim".to_string();
        let topogen = Topogen::new(
            Arc::new(DisabledBackend),
            Arc::new(OfflineTopology),
            Arc::new(SequentialIds::new()),
            &config,
        );

        let profile = topogen.generate_profile("An online shop", Some("Shopco")).await.unwrap();
        let mut org = topogen.organization_entity(&profile);
        topogen.expand_organization(&mut org).await;

        assert_eq!(org.hostname, "shopco.corp.sim");
        assert_eq!(org.metadata.internal_entities[0].hostname, "web.shopco.corp.sim");
    }

    #[tokio::test]
    async fn test_profiles_never_fail_on_text() {
        let topogen = offline();

        for description in ["x", "hospital network", "A social media startup", "🚀"] {
            let profile = topogen.generate_profile(description, None).await.unwrap();
            assert!(!profile.core_functions().is_empty());
            assert!(!profile.regulatory_requirements().is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_description_is_rejected() {
        let topogen = offline();

        let err = topogen.generate_profile("  \n", None).await.unwrap_err();
        assert!(matches!(err, TopogenError::InvalidInput(_)));
    }
}
