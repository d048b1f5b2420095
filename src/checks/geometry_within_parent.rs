use geo::BooleanOps;
use tracing::debug;

use crate::{
    frame::Record,
    geometry::area_km2,
    layer::{parent_layer, parent_rows, BoundaryLayer},
};

use super::CheckContext;

/// Features reaching outside their declared parent by more than the tolerance.
/// Features whose parent cannot be resolved are left to the P-code checks.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().filter_map(|layer| {
        let parent = parent_layer(layers, layer)?;
        let ids = layer.feature_ids();
        let outside = parent_rows(layer, parent).into_iter().enumerate()
            .filter_map(|(i, row)| row.map(|p| (i, p)))
            .filter(|&(i, p)| {
                let geom = &layer.geoms[i];
                if geom.0.is_empty() { return false }
                let excess = area_km2(&geom.difference(&parent.geoms[p]));
                let out = excess > ctx.config.overlap_area_km;
                if out {
                    debug!(iso3 = ctx.iso3, level = layer.level, feature = %ids[i], excess_km2 = excess, "outside parent");
                }
                out
            })
            .count();
        Some(Record::new(ctx.iso3, layer.level).with("geom_outside_parent", outside))
    }).collect()
}
