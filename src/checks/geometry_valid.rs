use geo::Validation;
use tracing::debug;

use crate::{frame::Record, geometry::area_km2, layer::BoundaryLayer};

use super::CheckContext;

/// Feature counts, empty and invalid geometries, and total area.
///
/// A feature is invalid when it fails OGC validation or when its source
/// rings were open or too short.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().map(|layer| {
        let ids = layer.feature_ids();
        let empty = layer.geoms.iter().filter(|g| g.0.is_empty()).count();
        let invalid: Vec<&str> = layer.geoms.iter().zip(&layer.malformed).zip(&ids)
            .filter(|((g, malformed), _)| !g.0.is_empty() && (**malformed || !g.is_valid()))
            .map(|(_, id)| id.as_str())
            .collect();
        let area: f64 = layer.geoms.iter().map(area_km2).sum();

        if !invalid.is_empty() {
            debug!(iso3 = ctx.iso3, level = layer.level, invalid = invalid.len(), "invalid geometries");
        }
        Record::new(ctx.iso3, layer.level)
            .with("feature_count", layer.len())
            .with("geom_empty", empty)
            .with("geom_invalid", invalid.len())
            .with("geom_invalid_ids", (!invalid.is_empty()).then(|| invalid.join(";")))
            .with("area_sqkm", (area * 1e6).round() / 1e6)
    }).collect()
}
