use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{frame::Record, layer::BoundaryLayer};

use super::CheckContext;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date cell. Accepts plain dates, RFC 3339 timestamps, naive
/// timestamps, and epoch milliseconds as served by feature services.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.len() >= 10 && text.bytes().all(|b| b.is_ascii_digit()) {
        return DateTime::from_timestamp_millis(text.parse().ok()?).map(|d| d.date_naive());
    }
    DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(text, f).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.date_naive()))
        .or_else(|| DATETIME_FORMATS.iter().find_map(|f| NaiveDateTime::parse_from_str(text, f).ok()).map(|d| d.date()))
}

/// Distinct parsed `valid_on` dates of a layer.
fn valid_on_dates(layer: &BoundaryLayer) -> BTreeSet<NaiveDate> {
    layer.text_or_null("valid_on").iter().flatten().filter_map(|d| parse_date(d)).collect()
}

/// Parseable and ordered validity dates, and agreement with the first loaded level.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    let reference = layers.first().map(valid_on_dates);

    layers.iter().map(|layer| {
        let valid_on = layer.text_or_null("valid_on");
        let valid_to = layer.text_or_null("valid_to");

        let mut invalid = 0usize;
        let mut order = 0usize;
        for (on, to) in valid_on.iter().zip(&valid_to) {
            let on_date = on.as_deref().and_then(parse_date);
            let to_blank = to.as_deref().map_or(true, |t| t.trim().is_empty());
            let to_date = to.as_deref().and_then(parse_date);
            if on_date.is_none() || (!to_blank && to_date.is_none()) {
                invalid += 1;
            } else if let (Some(on), Some(to)) = (on_date, to_date) {
                order += (on > to) as usize;
            }
        }

        let dates = valid_on_dates(layer);
        let mismatch = reference.as_ref().is_some_and(|r| *r != dates);

        Record::new(ctx.iso3, layer.level)
            .with("date_invalid", invalid)
            .with("date_order", order)
            .with("date_values", dates.len())
            .with("date_level_mismatch", mismatch)
    }).collect()
}

#[cfg(test)]
mod tests {
    use polars::prelude::AnyValue;

    use super::*;
    use crate::checks::testing::{context, latin, value};
    use crate::config::Config;
    use crate::layer::testing::{layer, s, square};

    #[test]
    fn accepted_formats() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 31);
        assert_eq!(parse_date("2020-01-31"), day);
        assert_eq!(parse_date("2020/01/31"), day);
        assert_eq!(parse_date("2020-01-31T10:00:00Z"), day);
        assert_eq!(parse_date("2020-01-31 10:00:00"), day);
        assert_eq!(parse_date("1580428800000"), day);
        assert_eq!(parse_date("31.01.2020"), None);
        assert_eq!(parse_date("2020-02-30"), None);
    }

    #[test]
    fn invalid_and_reversed_dates_are_counted() {
        let adm0 = layer(0, vec![square(0.0, 0.0, 1.0)], &[("valid_on", vec![s("2020-01-01")])]);
        let adm1 = layer(1, vec![square(0.0, 0.0, 1.0); 4], &[
            ("valid_on", vec![s("2020-01-01"), None, s("2021-05-01"), s("2020-01-01")]),
            ("valid_to", vec![None, None, s("2021-01-01"), s("soon")]),
        ]);
        let config = Config::default();
        let records = check(&context(&config, &latin), &[adm0, adm1]);

        assert_eq!(value(&records[0], "date_level_mismatch"), AnyValue::Boolean(false));
        let r = &records[1];
        assert_eq!(value(r, "date_invalid"), AnyValue::Int64(2));
        assert_eq!(value(r, "date_order"), AnyValue::Int64(1));
        assert_eq!(value(r, "date_values"), AnyValue::Int64(2));
        assert_eq!(value(r, "date_level_mismatch"), AnyValue::Boolean(true));
    }
}
