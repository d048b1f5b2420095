//! Score functions over the checks table, and the scoring entry point.
//!
//! Every score function reads the joined checks table and emits one
//! `[0, 1]` column per level, higher being better. Rows a dimension has
//! nothing to say about are left out rather than scored.

mod geometry;
pub mod output;
mod table;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, DataType, Series};
use tracing::{info, warn};

use crate::{
    checks::checks_path,
    config::Config,
    frame::{self, outer_join, read_csv, records_to_frame, Record, KEYS},
};

/// A score dimension: checks frame in, one keyed score column out.
pub type ScoreFn = fn(&DataFrame, &Config) -> Result<DataFrame>;

/// Registered score dimensions, in output column order.
pub const SCORES: &[(&str, ScoreFn)] = &[
    ("geometry_validity", geometry::validity),
    ("geometry_topology", geometry::topology),
    ("table_pcodes", table::pcodes),
    ("table_names", table::names),
    ("table_languages", table::languages),
    ("table_dates", table::dates),
    ("table_areas", table::areas),
];

/// `1 - min(1, defects / total)`. With nothing to count against, any defect
/// scores zero.
pub fn penalty(defects: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return if defects <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - (defects / total).min(1.0)).clamp(0.0, 1.0)
}

/// A row of the checks frame, viewed through its key and numeric cells.
pub(crate) struct Row<'a> {
    checks: &'a DataFrame,
    index: usize,
}

impl Row<'_> {
    #[inline] pub fn num(&self, name: &str) -> Option<f64> { frame::number(self.checks, self.index, name) }

    #[inline] pub fn flag(&self, name: &str) -> Option<bool> { frame::flag(self.checks, self.index, name) }

    /// Sum of the named counters, skipping nulls. `None` if every one is null.
    pub fn sum(&self, names: &[&str]) -> Option<f64> {
        names.iter().filter_map(|n| self.num(n)).fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
    }

    pub fn iso3(&self) -> Option<String> { frame::text(self.checks, self.index, KEYS[0]) }

    pub fn level(&self) -> Option<u8> { self.num(KEYS[1]).map(|l| l as u8) }
}

/// Apply `score` to every row of `checks`, producing the keyed column `name`.
/// Scores are clamped to `[0, 1]`; `None` leaves the row out.
pub(crate) fn per_level(checks: &DataFrame, name: &str, score: impl Fn(&Row) -> Option<f64>) -> Result<DataFrame> {
    for key in KEYS {
        checks.column(key).with_context(|| format!("[scores] checks table has no {key} column"))?;
    }
    let records = (0..checks.height())
        .filter_map(|index| {
            let row = Row { checks, index };
            let (iso3, level) = (row.iso3()?, row.level()?);
            let value = score(&row)?;
            Some(Record::new(&iso3, level).with(name, value.clamp(0.0, 1.0)))
        })
        .collect::<Vec<_>>();

    let mut scores = records_to_frame(&records)
        .with_context(|| format!("[scores] Failed to build {name} scores"))?;
    if records.is_empty() {
        scores.with_column(Series::new_empty(name.into(), &DataType::Float64))
            .with_context(|| format!("[scores] Failed to add empty {name} column"))?;
    }
    Ok(scores)
}

/// Run every score dimension and aggregate them into one row per country.
pub fn score_table(checks: &DataFrame, config: &Config) -> Result<DataFrame> {
    let start = records_to_frame(&[]).context("[scores] Failed to create empty scores frame")?;
    let joined = SCORES.iter().try_fold(start, |acc, (name, score)| {
        let partial = score(checks, config)?;
        outer_join(&acc, &partial).with_context(|| format!("[scores] Failed to join {name}"))
    })?;
    output::aggregate(&joined)
}

/// Composite score of the first (worst) row, or 0.0 for an empty frame.
pub fn composite(scores: &DataFrame) -> f64 {
    frame::number(scores, 0, "score").unwrap_or(0.0)
}

/// `<data_dir>/<iso3>/<iso3>_scores.csv`
pub fn scores_path(data_dir: &Path, iso3: &str) -> PathBuf {
    let iso3 = iso3.to_ascii_lowercase();
    data_dir.join(&iso3).join(format!("{iso3}_scores.csv"))
}

/// Score the checks table of `iso3` on disk and write its scores table.
///
/// A missing checks file scores 0.0 and writes nothing.
pub fn main(iso3: &str, data_dir: &Path, config: &Config) -> Result<f64> {
    let path = checks_path(data_dir, iso3);
    if !path.is_file() {
        warn!(iso3, path = %path.display(), "no checks file, scoring 0.0");
        return Ok(0.0);
    }
    let checks = read_csv(&path)?;
    let scores = score_table(&checks, config)?;
    let score = composite(&scores);
    output::write(&scores, data_dir, iso3)?;
    info!(iso3, score, "scored");
    Ok(score)
}
