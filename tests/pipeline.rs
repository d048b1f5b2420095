use std::{collections::HashSet, fs, path::Path};

use codab::{
    checks::{self, checks_path},
    process_country,
    frame::{number, read_csv, text},
    scores::{self, scores_path},
    Config,
};
use polars::frame::DataFrame;
use serde_json::{json, Value as Json};

/// Latin letters for every language.
fn latin(_: &str, _: &str) -> Option<HashSet<char>> {
    Some(('a'..='z').chain('A'..='Z').collect())
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Json {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + w, y], [x + w, y + h], [x, y + h], [x, y]]],
    })
}

fn write_layer(dir: &Path, iso3: &str, level: u8, features: Vec<(Json, Json)>) {
    let features: Vec<Json> = features.into_iter()
        .map(|(properties, geometry)| json!({"type": "Feature", "properties": properties, "geometry": geometry}))
        .collect();
    let folder = dir.join(iso3.to_ascii_lowercase());
    fs::create_dir_all(&folder).unwrap();
    let path = folder.join(format!("{}_admin{level}.geojson", iso3.to_ascii_lowercase()));
    fs::write(path, json!({"type": "FeatureCollection", "features": features}).to_string()).unwrap();
}

/// A three-level country: one outline, two halves, four quarters. The last
/// quarter's P-code does not carry its parent's prefix.
fn write_country(dir: &Path, name_lang: &str, odd_name: &str) {
    let common = |extra: Json| {
        let mut props = json!({
            "adm0_pcode": "XX", "adm0_name": "Xland", "lang": "en",
            "valid_on": "2020-01-01", "valid_to": null, "version_no": 1,
        });
        props.as_object_mut().unwrap().extend(extra.as_object().unwrap().clone());
        props
    };

    write_layer(dir, "XXX", 0, vec![(common(json!({})), rect(0.0, 0.0, 2.0, 2.0))]);
    write_layer(dir, "XXX", 1, vec![
        (common(json!({"adm1_pcode": "XX01", "adm1_name": "West"})), rect(0.0, 0.0, 1.0, 2.0)),
        (common(json!({"adm1_pcode": "XX02", "adm1_name": "East"})), rect(1.0, 0.0, 1.0, 2.0)),
    ]);
    write_layer(dir, "XXX", 2, vec![
        (common(json!({"adm1_pcode": "XX01", "adm1_name": "West", "adm2_pcode": "XX0101", "adm2_name": "Low"})),
            rect(0.0, 0.0, 1.0, 1.0)),
        (common(json!({"adm1_pcode": "XX01", "adm1_name": "West", "adm2_pcode": "XX0102", "adm2_name": "High"})),
            rect(0.0, 1.0, 1.0, 1.0)),
        (common(json!({"adm1_pcode": "XX02", "adm1_name": "East", "adm2_pcode": "XX0201", "adm2_name": "Dale"})),
            rect(1.0, 0.0, 1.0, 1.0)),
        (common(json!({
            "adm1_pcode": "XX02", "adm1_name": "East", "adm2_pcode": "XX0302",
            "adm2_name": odd_name, "lang": name_lang,
        })), rect(1.0, 1.0, 1.0, 1.0)),
    ]);
}

fn level_value(table: &DataFrame, level: i64, column: &str) -> Option<f64> {
    let row = (0..table.height()).find(|&r| number(table, r, "level") == Some(level as f64)).unwrap();
    number(table, row, column)
}

#[test]
fn country_pass_writes_checks_and_scores() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "en", "Hill");

    let report = process_country("XXX", dir.path(), &Config::default(), &latin).unwrap();
    assert_eq!(report.feature_counts.into_iter().collect::<Vec<_>>(), vec![(0, 1), (1, 2), (2, 4)]);
    assert!(report.score > 0.0 && report.score < 1.0);

    let checks = read_csv(&checks_path(dir.path(), "XXX")).unwrap();
    let levels: Vec<Option<f64>> = (0..checks.height()).map(|r| number(&checks, r, "level")).collect();
    assert_eq!(levels, vec![Some(0.0), Some(1.0), Some(2.0)]);
    assert_eq!(level_value(&checks, 2, "geom_gaps"), Some(0.0));
    assert_eq!(level_value(&checks, 2, "geom_overlaps"), Some(0.0));
    assert_eq!(level_value(&checks, 2, "geom_outside_parent"), Some(0.0));

    let scores = read_csv(&scores_path(dir.path(), "XXX")).unwrap();
    assert_eq!(scores.height(), 1);
    assert_eq!(text(&scores, 0, "iso3").as_deref(), Some("XXX"));
    assert_eq!(number(&scores, 0, "score"), Some(report.score));
    assert_eq!(number(&scores, 0, "geometry_validity"), Some(1.0));
}

#[test]
fn pcode_prefix_is_flagged_on_the_child_level() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "en", "Hill");

    let table = checks::main("XXX", dir.path(), &Config::default(), &latin).unwrap().unwrap();
    assert_eq!(level_value(&table, 1, "pcode_prefix"), Some(0.0));
    assert_eq!(level_value(&table, 2, "pcode_prefix"), Some(1.0));
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "en", "Hill");
    let config = Config::default();

    process_country("XXX", dir.path(), &config, &latin).unwrap();
    let first = (fs::read(checks_path(dir.path(), "XXX")).unwrap(), fs::read(scores_path(dir.path(), "XXX")).unwrap());
    process_country("XXX", dir.path(), &config, &latin).unwrap();
    let second = (fs::read(checks_path(dir.path(), "XXX")).unwrap(), fs::read(scores_path(dir.path(), "XXX")).unwrap());

    assert_eq!(first, second);
    assert!(first.0.starts_with(&[0xEF, 0xBB, 0xBF]));
}

#[test]
fn stages_run_separately_agree_with_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "en", "Hill");
    let config = Config::default();

    checks::main("XXX", dir.path(), &config, &latin).unwrap();
    let staged = scores::main("XXX", dir.path(), &config).unwrap();
    let report = process_country("XXX", dir.path(), &config, &latin).unwrap();
    assert!((staged - report.score).abs() < 1e-9);
}

#[test]
fn excluded_language_never_reports_characters() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "zgh", "ⵜⴰⵎⴰⵣⵉⵖⵜ");

    let flagged = checks::main("XXX", dir.path(), &Config::default(), &latin).unwrap().unwrap();
    assert_eq!(level_value(&flagged, 2, "name_invalid_chars"), Some(1.0));

    let config = Config { exclude_check: vec!["zgh".into()], ..Config::default() };
    let bypassed = checks::main("XXX", dir.path(), &config, &latin).unwrap().unwrap();
    assert_eq!(level_value(&bypassed, 2, "name_invalid_chars"), Some(0.0));
}

#[test]
fn max_level_override_limits_the_levels_checked() {
    let dir = tempfile::tempdir().unwrap();
    write_country(dir.path(), "en", "Hill");
    let mut config = Config::default();
    config.max_level.insert("XXX".into(), 1);

    let table = checks::main("XXX", dir.path(), &config, &latin).unwrap().unwrap();
    assert_eq!(table.height(), 2);
}
