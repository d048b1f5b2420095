use std::collections::HashMap;

use anyhow::Result;
use polars::prelude::DataFrame;

use crate::config::Config;

use super::{penalty, per_level, Row};

const PCODE_DEFECTS: [&str; 6] = [
    "pcode_missing", "pcode_malformed", "pcode_duplicate", "pcode_prefix", "pcode_orphan", "attr_pcode_mismatch",
];

const NAME_DEFECTS: [&str; 10] = [
    "name_missing", "name_invalid_chars", "name_punctuation", "name_double_spaces", "name_strippable",
    "name_upper", "name_lower", "name_numbers", "name_adm0_mismatch", "attr_name_mismatch",
];

const LANGUAGE_FLAGS: [&str; 4] = ["lang_missing", "lang_invalid", "lang_unexpected", "lang_not_romanized"];

/// Mean of the present values, `None` if there are none.
fn mean(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values.into_iter().flatten().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn features(row: &Row) -> f64 { row.num("feature_count").unwrap_or(0.0) }

pub(super) fn pcodes(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "table_pcodes", |row| Some(penalty(row.sum(&PCODE_DEFECTS)?, features(row))))
}

/// Name defects relative to the number of name cells checked.
pub(super) fn names(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "table_names", |row| {
        let cells = row.num("name_cells").unwrap_or(0.0).max(features(row));
        Some(penalty(row.sum(&NAME_DEFECTS)?, cells))
    })
}

/// Each language flag passes (1) when its count is zero.
pub(super) fn languages(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "table_languages", |row| {
        mean(LANGUAGE_FLAGS.iter().map(|flag| row.num(flag).map(|n| if n > 0.0 { 0.0 } else { 1.0 })))
    })
}

pub(super) fn dates(checks: &DataFrame, _: &Config) -> Result<DataFrame> {
    per_level(checks, "table_dates", |row| {
        let values = row.sum(&["date_invalid", "date_order"]).map(|d| penalty(d, features(row)));
        let agreement = row.flag("date_level_mismatch").map(|m| if m { 0.0 } else { 1.0 });
        mean([values, agreement])
    })
}

/// Plausibility of each level's total area against the level above.
pub(super) fn areas(checks: &DataFrame, config: &Config) -> Result<DataFrame> {
    let mut totals: HashMap<(String, u8), f64> = HashMap::new();
    for index in 0..checks.height() {
        let row = Row { checks, index };
        if let (Some(iso3), Some(level), Some(area)) = (row.iso3(), row.level(), row.num("area_sqkm")) {
            totals.insert((iso3, level), area);
        }
    }

    per_level(checks, "table_areas", |row| {
        let level = row.level()?;
        let area = row.num("area_sqkm")?;
        let parent = *totals.get(&(row.iso3()?, level.checked_sub(1)?))?;
        if parent <= 0.0 { return None }
        let deviation = (1.0 - area / parent).abs();
        Some(if deviation <= config.area_ratio_tolerance { 1.0 } else { (1.0 - deviation).max(0.0) })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{number, records_to_frame, Record};

    fn column(scores: &DataFrame, name: &str) -> Vec<Option<f64>> {
        (0..scores.height()).map(|r| number(scores, r, name)).collect()
    }

    #[test]
    fn pcode_and_name_penalties() {
        let checks = records_to_frame(&[
            Record::new("XXX", 1).with("feature_count", 10i64)
                .with("pcode_duplicate", 2i64).with("pcode_prefix", 1i64).with("attr_pcode_mismatch", 2i64)
                .with("name_cells", 20i64).with("name_upper", 5i64),
        ]).unwrap();
        assert_eq!(column(&pcodes(&checks, &Config::default()).unwrap(), "table_pcodes"), vec![Some(0.5)]);
        assert_eq!(column(&names(&checks, &Config::default()).unwrap(), "table_names"), vec![Some(0.75)]);
    }

    #[test]
    fn language_flags_average() {
        let checks = records_to_frame(&[
            Record::new("XXX", 0).with("lang_missing", 0i64).with("lang_invalid", 3i64)
                .with("lang_unexpected", 0i64).with("lang_not_romanized", 1i64),
        ]).unwrap();
        assert_eq!(column(&languages(&checks, &Config::default()).unwrap(), "table_languages"), vec![Some(0.5)]);
    }

    #[test]
    fn dates_combine_validity_and_agreement() {
        let checks = records_to_frame(&[
            Record::new("XXX", 0).with("feature_count", 4i64).with("date_invalid", 1i64).with("date_order", 1i64)
                .with("date_level_mismatch", true),
            Record::new("XXX", 1).with("feature_count", 4i64).with("date_invalid", 0i64).with("date_order", 0i64)
                .with("date_level_mismatch", false),
        ]).unwrap();
        assert_eq!(column(&dates(&checks, &Config::default()).unwrap(), "table_dates"), vec![Some(0.25), Some(1.0)]);
    }

    #[test]
    fn areas_compare_with_the_level_above() {
        let checks = records_to_frame(&[
            Record::new("XXX", 0).with("area_sqkm", 100.0),
            Record::new("XXX", 1).with("area_sqkm", 99.0),
            Record::new("XXX", 2).with("area_sqkm", 79.2),
        ]).unwrap();
        let scores = areas(&checks, &Config::default()).unwrap();
        assert_eq!(scores.height(), 2);
        assert_eq!(number(&scores, 0, "table_areas"), Some(1.0));
        let v = number(&scores, 1, "table_areas").unwrap();
        assert!((v - 0.8).abs() < 1e-9);
    }
}
