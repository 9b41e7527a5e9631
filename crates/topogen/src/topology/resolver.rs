//! Textual connection endpoints to entity references

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::model::{InfrastructureEntity, RawConnection};

/// Counts from one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    /// Edges added
    pub linked: usize,
    /// Connections with an unresolved endpoint
    pub dropped: usize,
    /// Connections naming an edge that already existed
    pub duplicates: usize,
}

/// Links materialized entities according to raw connections.
///
/// Each endpoint resolves by exact hostname first, then exact name, within the
/// given batch only. A connection with an unresolved endpoint is dropped
/// without an edge on either side.
pub struct ConnectionResolver;

impl ConnectionResolver {
    pub fn resolve(
        connections: &[RawConnection],
        entities: &mut [InfrastructureEntity],
    ) -> ResolutionReport {
        let mut report = ResolutionReport::default();

        for connection in connections {
            let (Some(from), Some(to)) = (
                Self::find(entities, &connection.from),
                Self::find(entities, &connection.to),
            ) else {
                tracing::debug!(
                    "Dropping connection {} -> {}: endpoint not found",
                    connection.from,
                    connection.to
                );
                report.dropped += 1;
                continue;
            };

            let target = entities[to].id();
            if entities[from].connect_to(target) {
                report.linked += 1;
            } else {
                report.duplicates += 1;
            }
        }

        report
    }

    fn find(entities: &[InfrastructureEntity], endpoint: &str) -> Option<usize> {
        entities
            .iter()
            .position(|e| e.hostname == endpoint)
            .or_else(|| entities.iter().position(|e| e.name == endpoint))
    }
}
