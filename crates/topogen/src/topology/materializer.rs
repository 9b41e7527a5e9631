//! Raw component records to fully-specified entities

use std::sync::Arc;

use rand::Rng;

use crate::{
    config::LayoutConfig,
    ids::IdentifierService,
    model::{
        name_slug, EntityMetadata, EntityType, FidelityLevel, InfrastructureEntity, Position,
        RawParsedEntity,
    },
};

/// Fills in every field a raw record leaves out.
///
/// Defaults for record `i` under parent `P`:
/// - type: web app
/// - name: `Component {i+1}`
/// - hostname: `component-{i+1}.{slug(P)}.{domain}`
/// - ip: random `10.0.x.y`
/// - position: random point inside the layout canvas
///
/// Fidelity is always virtual. Entities come back unlinked.
pub struct EntityMaterializer {
    ids: Arc<dyn IdentifierService>,
    layout: LayoutConfig,
}

impl EntityMaterializer {
    pub fn new(ids: Arc<dyn IdentifierService>, layout: LayoutConfig) -> Self {
        Self { ids, layout }
    }

    pub fn materialize<R: Rng + ?Sized>(
        &self,
        records: Vec<RawParsedEntity>,
        parent: &InfrastructureEntity,
        rng: &mut R,
    ) -> Vec<InfrastructureEntity> {
        let slug = name_slug(&parent.name);
        let mut entities = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            entities.push(self.materialize_one(index, record, &slug, &mut *rng));
        }
        entities
    }

    fn materialize_one<R: Rng + ?Sized>(
        &self,
        index: usize,
        record: RawParsedEntity,
        slug: &str,
        rng: &mut R,
    ) -> InfrastructureEntity {
        let ordinal = index + 1;

        let mut metadata = record
            .metadata
            .map(EntityMetadata::from_raw)
            .unwrap_or_default();

        let declared = present(record.entity_type);
        let parsed = declared.as_deref().map(str::parse::<EntityType>);
        let entity_type = match parsed {
            Some(Ok(entity_type)) => entity_type,
            Some(Err(_)) => {
                tracing::debug!(
                    "Unrecognised entity type {:?} for record {}, using web app",
                    declared,
                    ordinal
                );
                metadata.declared_type = declared;
                EntityType::default()
            }
            None => EntityType::default(),
        };

        let name = present(record.name).unwrap_or_else(|| format!("Component {}", ordinal));
        let hostname = present(record.hostname).unwrap_or_else(|| {
            format!("component-{}.{}.{}", ordinal, slug, self.layout.domain_suffix)
        });
        let ip = present(record.ip).unwrap_or_else(|| random_private_ip(rng));

        let position = self.random_position(rng);
        let mut entity =
            InfrastructureEntity::new(self.ids.issue(), entity_type, name, hostname, ip)
                .with_ports(record.ports.unwrap_or_default())
                .with_metadata(metadata)
                .with_position(position);
        entity.fidelity = FidelityLevel::Virtual;
        entity
    }

    fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let canvas = &self.layout.canvas;
        Position::new(
            sample(rng, canvas.x_min, canvas.x_max),
            sample(rng, canvas.y_min, canvas.y_max),
        )
    }
}

/// `None` for missing, empty or whitespace-only strings
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn random_private_ip<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("10.0.{}.{}", rng.gen::<u8>(), rng.gen::<u8>())
}

/// Uniform in `[min, max)`; a degenerate range pins to `min`
fn sample<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
