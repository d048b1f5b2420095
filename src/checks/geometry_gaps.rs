use geo::{MultiPolygon, Polygon};
use tracing::debug;

use crate::{
    config::Config,
    frame::Record,
    geometry::{holes, polygon_area_km2, thinness, uncovered, PlanarLayer},
    layer::BoundaryLayer,
};

use super::CheckContext;

/// Gaps inside a level's coverage and, below level 0, against the coverage
/// of the level above (the country outline when that level is not loaded).
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    let unions: Vec<MultiPolygon<f64>> = layers.iter().map(|l| PlanarLayer::new(&l.geoms).dissolve()).collect();
    let union_at = |level: u8| layers.iter().position(|l| l.level == level).map(|i| &unions[i]);

    layers.iter().zip(&unions).map(|(layer, union)| {
        let mut candidates = holes(union);
        let reference = layer.level.checked_sub(1)
            .and_then(|up| union_at(up).or_else(|| union_at(0)));
        if let Some(reference) = reference {
            candidates.extend(uncovered(reference, union));
        }
        let (count, area) = significant(&candidates, ctx.config);
        debug!(iso3 = ctx.iso3, level = layer.level, candidates = candidates.len(), gaps = count, "gap scan");

        Record::new(ctx.iso3, layer.level)
            .with("geom_gaps", count)
            .with("geom_gaps_sqkm", (area * 1e6).round() / 1e6)
    }).collect()
}

/// Count and total area of candidates that pass both sliver thresholds.
fn significant(candidates: &[Polygon<f64>], config: &Config) -> (usize, f64) {
    candidates.iter()
        .map(|poly| (polygon_area_km2(poly), poly))
        .filter(|(area, poly)| *area >= config.sliver_gap_area_km && thinness(poly) >= config.sliver_gap_thinness)
        .fold((0, 0.0), |(n, total), (area, _)| (n + 1, total + area))
}
