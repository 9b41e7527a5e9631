//! Company profile generation with rule-based fallback

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    classifier::SectorClassifier,
    generation::{
        schema::{self, GeneratedProfile, SchemaCheck, SchemaViolation},
        GenerationBackend, GenerationError, GenerationRequest,
    },
    ids::IdentifierService,
    model::CompanyProfile,
    Result, TopogenError,
};

/// Name used on the rule-based path when no override is given
pub const FALLBACK_PROFILE_NAME: &str = "Unnamed Organization";

const PROFILE_INSTRUCTIONS: &str = "You analyse organization descriptions for an \
infrastructure simulation. Extract the organization's name, its industry sector, \
between 3 and 6 core business functions, and the regulatory frameworks that apply \
to it. Respond with a single JSON object matching the provided schema and nothing else.";

/// Which path produced a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    Generated,
    RuleBased { reason: String },
}

#[derive(Debug, thiserror::Error)]
enum ExtractionFailure {
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] GenerationError),

    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),
}

/// Produces company profiles from free text.
///
/// Tries the generative backend first. Any backend or schema failure falls back
/// to the [`SectorClassifier`] rules, so callers only see an error for empty
/// input.
pub struct ProfileGenerator {
    backend: Arc<dyn GenerationBackend>,
    ids: Arc<dyn IdentifierService>,
    classifier: SectorClassifier,
    schema: serde_json::Value,
}

impl ProfileGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, ids: Arc<dyn IdentifierService>) -> Self {
        Self {
            backend,
            ids,
            classifier: SectorClassifier::new(),
            schema: schema::output_schema(),
        }
    }

    pub async fn generate_profile(
        &self,
        description: &str,
        name: Option<&str>,
    ) -> Result<CompanyProfile> {
        let (profile, _) = self.generate_profile_with_source(description, name).await?;
        Ok(profile)
    }

    /// Generate a profile and report which path produced it
    pub async fn generate_profile_with_source(
        &self,
        description: &str,
        name: Option<&str>,
    ) -> Result<(CompanyProfile, ProfileSource)> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TopogenError::InvalidInput(
                "description must not be empty".to_string(),
            ));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        match self.extract(description).await {
            Ok(generated) => {
                info!(
                    "Generated profile for '{}' via {} ({})",
                    generated.name,
                    self.backend.name(),
                    generated.sector
                );
                Ok((
                    self.from_generated(description, name, generated),
                    ProfileSource::Generated,
                ))
            }
            Err(failure) => {
                warn!(
                    "Profile generation via {} failed, using rule-based fallback: {}",
                    self.backend.name(),
                    failure
                );
                Ok((
                    self.from_rules(description, name),
                    ProfileSource::RuleBased {
                        reason: failure.to_string(),
                    },
                ))
            }
        }
    }

    async fn extract(
        &self,
        description: &str,
    ) -> std::result::Result<GeneratedProfile, ExtractionFailure> {
        let request = GenerationRequest {
            instructions: PROFILE_INSTRUCTIONS.to_string(),
            description: description.to_string(),
            schema: self.schema.clone(),
        };

        let response = self.backend.generate(&request).await?;
        match schema::check(&response) {
            SchemaCheck::Valid(generated) => Ok(generated),
            SchemaCheck::Violation(violation) => Err(violation.into()),
        }
    }

    fn from_generated(
        &self,
        description: &str,
        name: Option<&str>,
        generated: GeneratedProfile,
    ) -> CompanyProfile {
        CompanyProfile::new(
            self.ids.issue(),
            name.map(str::to_string).unwrap_or(generated.name),
            description,
            generated.sector,
            generated.core_functions,
            generated.regulatory_requirements,
        )
    }

    fn from_rules(&self, description: &str, name: Option<&str>) -> CompanyProfile {
        let classification = self.classifier.classify(description);
        CompanyProfile::new(
            self.ids.issue(),
            name.unwrap_or(FALLBACK_PROFILE_NAME),
            description,
            classification.sector.as_str(),
            classification.core_functions,
            classification.regulatory_requirements,
        )
    }
}
