use std::sync::OnceLock;

use regex::Regex;

use crate::{config::Config, frame::Record, layer::BoundaryLayer};

use super::CheckContext;

fn admin_column_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^adm(\d+)_(?:pcode|name\d*|ref)$").unwrap_or_else(|e| panic!("invalid column pattern: {e}")))
}

/// Whether `column` belongs to the schema of a `level` layer.
fn is_expected(column: &str, level: u8, config: &Config) -> bool {
    if config.misc_columns.iter().any(|c| c == column) { return true }
    admin_column_regex().captures(column)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .is_some_and(|k| k <= level)
}

/// Residual schema anomalies: columns outside the schema and columns with no values.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().map(|layer| {
        let columns = layer.column_names();
        let unexpected: Vec<&str> = columns.iter()
            .map(String::as_str)
            .filter(|c| !is_expected(c, layer.level, ctx.config))
            .collect();
        let empty = columns.iter().filter(|c| !layer.is_empty() && layer.null_count(c) == layer.len()).count();

        Record::new(ctx.iso3, layer.level)
            .with("other_unexpected", unexpected.len())
            .with("other_unexpected_columns", (!unexpected.is_empty()).then(|| unexpected.join(";")))
            .with("other_empty_columns", empty)
    }).collect()
}

#[cfg(test)]
mod tests {
    use polars::prelude::AnyValue;

    use super::*;
    use crate::checks::testing::{context, latin};
    use crate::layer::testing::{layer, s, square};

    #[test]
    fn schema_columns() {
        let config = Config::default();
        assert!(is_expected("adm1_name2", 2, &config));
        assert!(is_expected("adm0_pcode", 0, &config));
        assert!(is_expected("valid_on", 0, &config));
        assert!(!is_expected("adm2_pcode", 1, &config));
        assert!(!is_expected("shape_leng", 1, &config));
    }

    #[test]
    fn unexpected_and_empty_columns_are_reported() {
        let adm1 = layer(1, vec![square(0.0, 0.0, 1.0); 2], &[
            ("adm1_pcode", vec![s("XX01"), s("XX02")]),
            ("shape_leng", vec![s("1.2"), s("3.4")]),
            ("objectid", vec![None, None]),
            ("valid_to", vec![None, None]),
        ]);
        let config = Config::default();
        let r = &check(&context(&config, &latin), &[adm1])[0];
        assert_eq!(r.values, vec![
            ("other_unexpected".to_string(), AnyValue::Int64(2)),
            ("other_unexpected_columns".to_string(), AnyValue::StringOwned("shape_leng;objectid".into())),
            ("other_empty_columns".to_string(), AnyValue::Int64(2)),
        ]);
    }
}
