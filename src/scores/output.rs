use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::debug;

use crate::frame::{stage_csv, StagedCsv, KEYS};

use super::scores_path;

/// Collapse per-level scores into one row per country.
///
/// Levels are dropped and each dimension averaged across them, then `score`
/// is the mean of the dimensions. Nulls are skipped throughout. Rows are
/// rounded to three decimals and ordered worst first, ties by ISO3, with
/// unscored countries last.
pub fn aggregate(scores: &DataFrame) -> Result<DataFrame> {
    let dims: Vec<String> = scores.get_column_names().into_iter()
        .filter(|name| !KEYS.contains(&name.as_str()))
        .map(|name| name.to_string())
        .collect();
    if dims.is_empty() {
        return DataFrame::new(vec![
            Column::from(Series::new_empty(KEYS[0].into(), &DataType::String)),
            Column::from(Series::new_empty("score".into(), &DataType::Float64)),
        ]).context("[scores::output] Failed to build empty scores frame");
    }

    let means: Vec<Expr> = dims.iter().map(|d| col(d.as_str()).cast(DataType::Float64).mean()).collect();
    let dimensions: Vec<Expr> = dims.iter().map(|d| col(d.as_str())).collect();
    let rounded: Vec<Expr> = dims.iter().map(String::as_str).chain(["score"])
        .map(|d| col(d).round(3, RoundMode::HalfAwayFromZero))
        .collect();
    let score = mean_horizontal(dimensions, true).context("[scores::output] Failed to build score expression")?;

    scores.clone().lazy()
        .group_by_stable([col(KEYS[0])])
        .agg(means)
        .with_column(score.alias("score"))
        .with_columns(rounded)
        .sort(["score", KEYS[0]], SortMultipleOptions::default().with_nulls_last(true).with_maintain_order(true))
        .collect()
        .context("[scores::output] Failed to aggregate scores by country")
}

/// Stage `<iso3>_scores.csv` without moving it into place.
pub fn stage(scores: &DataFrame, data_dir: &Path, iso3: &str) -> Result<StagedCsv> {
    stage_csv(scores, &scores_path(data_dir, iso3))
}

/// Write `<iso3>_scores.csv`.
pub fn write(scores: &DataFrame, data_dir: &Path, iso3: &str) -> Result<()> {
    let staged = stage(scores, data_dir, iso3)?;
    let path = staged.path().to_path_buf();
    staged.persist()?;
    debug!(iso3, path = %path.display(), "wrote scores");
    Ok(())
}
