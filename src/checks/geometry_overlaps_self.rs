use tracing::debug;

use crate::{frame::Record, geometry::PlanarLayer, layer::BoundaryLayer};

use super::CheckContext;

/// Feature pairs within a level whose interiors share more than the tolerance.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().map(|layer| {
        let overlaps = PlanarLayer::new(&layer.geoms).overlaps(ctx.config.overlap_area_km);
        let area: f64 = overlaps.iter().map(|o| o.area_km2).sum();
        if !overlaps.is_empty() {
            let ids = layer.feature_ids();
            for o in &overlaps {
                debug!(iso3 = ctx.iso3, level = layer.level, a = %ids[o.a], b = %ids[o.b], area_km2 = o.area_km2, "overlap");
            }
        }
        Record::new(ctx.iso3, layer.level)
            .with("geom_overlaps", overlaps.len())
            .with("geom_overlaps_sqkm", (area * 1e6).round() / 1e6)
    }).collect()
}
