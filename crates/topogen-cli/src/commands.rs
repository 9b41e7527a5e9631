//! Command implementations

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use colored::Colorize;
use topogen::{
    DisabledBackend, ExpansionOutcome, GenerationBackend, OfflineTopology, ProfileSource,
    RandomIds, Topogen, TopogenConfig, TopologyRequestor,
};
use topogen_client::{OpenAiCompatibleBackend, TopologyServiceClient};

/// Wire the pipeline from configuration
pub fn build(config: &TopogenConfig, offline: bool) -> Result<Topogen> {
    let (backend, requestor): (Arc<dyn GenerationBackend>, Arc<dyn TopologyRequestor>) =
        if offline {
            tracing::info!("Offline mode: using deterministic fallbacks");
            (Arc::new(DisabledBackend), Arc::new(OfflineTopology))
        } else {
            let backend = OpenAiCompatibleBackend::from_config(&config.generation)
                .context("Failed to create generation backend")?;
            let requestor = TopologyServiceClient::from_config(&config.topology)
                .context("Failed to create topology service client")?;
            (Arc::new(backend), Arc::new(requestor))
        };

    Ok(Topogen::new(backend, requestor, Arc::new(RandomIds), config))
}

pub async fn profile(topogen: &Topogen, description: &str, name: Option<&str>) -> Result<()> {
    let (profile, source) = topogen
        .generate_profile_with_source(description, name)
        .await?;
    report_source(&source);

    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

pub async fn expand(topogen: &Topogen, description: &str, name: Option<&str>) -> Result<()> {
    let (profile, source) = topogen
        .generate_profile_with_source(description, name)
        .await?;
    report_source(&source);

    let mut organization = topogen.organization_entity(&profile);
    match topogen.expand_organization(&mut organization).await {
        ExpansionOutcome::Generated { children, report } => eprintln!(
            "{} {} components ({} connections, {} dropped)",
            "✓".green(),
            children,
            report.linked,
            report.dropped
        ),
        ExpansionOutcome::Fallback { children, reason } => eprintln!(
            "{} {} fallback components: {}",
            "!".yellow(),
            children,
            reason.dimmed()
        ),
        ExpansionOutcome::Cached { children } => {
            eprintln!("{} {} cached components", "✓".green(), children)
        }
        ExpansionOutcome::NotExpandable => {}
    }

    println!("{}", serde_json::to_string_pretty(&organization)?);
    Ok(())
}

pub fn config(config: &TopogenConfig, path: Option<&Path>, show: bool) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(TopogenConfig::default_path);

    println!("{} {}", "Config:".dimmed(), path.display());
    if show {
        let rendered =
            toml::to_string_pretty(config).context("Failed to render configuration")?;
        println!();
        println!("{}", rendered);
    }
    Ok(())
}

fn report_source(source: &ProfileSource) {
    match source {
        ProfileSource::Generated => eprintln!("{} Profile generated", "✓".green()),
        ProfileSource::RuleBased { reason } => eprintln!(
            "{} Rule-based profile: {}",
            "!".yellow(),
            reason.dimmed()
        ),
    }
}
