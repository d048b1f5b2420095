//! The battery of per-level validators and the checks entry point.
//!
//! Each check is a pure function from a country's layers to one record per
//! admin level it applies to. Results are folded into a single table with
//! sequential outer joins on (`iso3`, `level`).

mod attribute_match;
mod dates;
mod geometry_gaps;
mod geometry_overlaps_self;
mod geometry_valid;
mod geometry_within_parent;
mod languages;
pub mod names;
mod table_names;
mod table_other;
mod table_pcodes;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use tracing::{debug, info};

use crate::{
    config::Config,
    frame::{outer_join, records_to_frame, write_csv, Record},
    layer::{load_layers, BoundaryLayer},
    locale::Exemplars,
};

/// Read-only state shared by every check during one country pass.
pub struct CheckContext<'a> {
    pub iso3: &'a str,
    pub config: &'a Config,
    pub exemplars: &'a dyn Exemplars,
}

/// A check: layers of one country in, one record per applicable level out.
pub type CheckFn = fn(&CheckContext, &[BoundaryLayer]) -> Vec<Record>;

/// Registered checks, in output column order.
pub const CHECKS: &[(&str, CheckFn)] = &[
    ("geometry_valid", geometry_valid::check),
    ("geometry_gaps", geometry_gaps::check),
    ("geometry_overlaps_self", geometry_overlaps_self::check),
    ("geometry_within_parent", geometry_within_parent::check),
    ("attribute_match", attribute_match::check),
    ("table_pcodes", table_pcodes::check),
    ("table_names", table_names::check),
    ("dates", dates::check),
    ("languages", languages::check),
    ("table_other", table_other::check),
];

/// Run every registered check and join the results on (`iso3`, `level`).
pub fn run_checks(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Result<DataFrame> {
    let start = records_to_frame(&[]).context("[checks] Failed to create empty checks frame")?;
    CHECKS.iter().try_fold(start, |acc, (name, check)| {
        let partial = records_to_frame(&check(ctx, layers))
            .with_context(|| format!("[checks] Failed to build results of {name}"))?;
        debug!(iso3 = ctx.iso3, check = name, rows = partial.height(), "check finished");
        outer_join(&acc, &partial)
            .with_context(|| format!("[checks] Failed to join results of {name}"))
    })
}

/// `<data_dir>/<iso3>/<iso3>_checks.csv`
pub fn checks_path(data_dir: &Path, iso3: &str) -> PathBuf {
    let iso3 = iso3.to_ascii_lowercase();
    data_dir.join(&iso3).join(format!("{iso3}_checks.csv"))
}

/// Load the layers of `iso3`, run all checks, and write the checks table.
/// Returns `None` (and writes nothing) when the country has no layers.
pub fn main(iso3: &str, data_dir: &Path, config: &Config, exemplars: &dyn Exemplars) -> Result<Option<DataFrame>> {
    let layers = load_layers(data_dir, iso3, config)?;
    if layers.is_empty() {
        info!(iso3, "no boundary layers found, skipping checks");
        return Ok(None);
    }
    let ctx = CheckContext { iso3, config, exemplars };
    let table = run_checks(&ctx, &layers)?;
    let path = checks_path(data_dir, iso3);
    write_csv(&table, &path)?;
    info!(iso3, path = %path.display(), levels = table.height(), "wrote checks");
    Ok(Some(table))
}

/// Number of `true` values.
#[inline]
pub(crate) fn count(flags: impl IntoIterator<Item = bool>) -> usize {
    flags.into_iter().filter(|&f| f).count()
}
