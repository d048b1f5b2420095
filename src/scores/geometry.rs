use anyhow::Result;
use polars::prelude::DataFrame;

use crate::config::Config;

use super::{penalty, per_level};

/// Share of features with a usable, OGC-valid geometry. An empty layer scores 0.
pub(super) fn validity(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "geometry_validity", |row| {
        let features = row.num("feature_count")?;
        if features <= 0.0 { return Some(0.0) }
        Some(penalty(row.sum(&["geom_empty", "geom_invalid"])?, features))
    })
}

/// Gaps, self-overlaps and parent escapes, relative to the feature count.
pub(super) fn topology(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "geometry_topology", |row| {
        let defects = row.sum(&["geom_gaps", "geom_overlaps", "geom_outside_parent"])?;
        Some(penalty(defects, row.num("feature_count").unwrap_or(0.0)))
    })
}
