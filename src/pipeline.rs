//! One country pass: load its layers, check, score, and persist both tables.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use tracing::info;
use walkdir::WalkDir;

use crate::{
    checks::{checks_path, run_checks, CheckContext},
    config::Config,
    frame::{persist_all, stage_csv},
    layer::{layer_path, load_layers},
    locale::Exemplars,
    scores::{composite, output, score_table},
};

/// Outcome of a country pass, for dataset descriptions downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryReport {
    pub iso3: String,
    /// Composite quality score in `[0, 1]`.
    pub score: f64,
    /// Feature count per loaded admin level.
    pub feature_counts: BTreeMap<u8, usize>,
}

/// Check and score `iso3`.
///
/// Both tables are computed and staged beside their destinations before
/// either is moved into place. If the second move fails the first is
/// removed again, so a country gets both files or neither. A country
/// without layers writes nothing and scores 0.0.
pub fn process_country(iso3: &str, data_dir: &Path, config: &Config, exemplars: &dyn Exemplars) -> Result<CountryReport> {
    let iso3 = iso3.to_ascii_uppercase();
    let layers = load_layers(data_dir, &iso3, config)?;
    let feature_counts = layers.iter().map(|l| (l.level, l.len())).collect();
    if layers.is_empty() {
        info!(iso3 = %iso3, "no boundary layers found");
        return Ok(CountryReport { iso3, score: 0.0, feature_counts });
    }

    let ctx = CheckContext { iso3: &iso3, config, exemplars };
    let checks = run_checks(&ctx, &layers)?;
    drop(layers);
    let scores = score_table(&checks, config)?;
    let score = composite(&scores);

    let staged = vec![
        stage_csv(&checks, &checks_path(data_dir, &iso3))?,
        output::stage(&scores, data_dir, &iso3)?,
    ];
    persist_all(staged).with_context(|| format!("[pipeline] Failed to write outputs of {iso3}"))?;
    info!(iso3 = %iso3, score, "country processed");

    Ok(CountryReport { iso3, score, feature_counts })
}

/// Country folders under `data_dir` holding at least one admin-level file,
/// as uppercase ISO3 codes in sorted order.
pub fn discover_countries(data_dir: &Path) -> Result<Vec<String>> {
    let mut countries = Vec::new();
    for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("[pipeline] Failed to list {}", data_dir.display()))?;
        let Some(name) = entry.file_name().to_str() else { continue };
        if !entry.file_type().is_dir() || name.len() != 3 || !name.chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        let iso3 = name.to_ascii_uppercase();
        if (0..=9u8).any(|level| layer_path(data_dir, &iso3, level).is_some()) {
            countries.push(iso3);
        }
    }
    Ok(countries)
}
