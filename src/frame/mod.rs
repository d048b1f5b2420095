//! Keyed frames exchanged between the checks and scoring stages.
//!
//! Check and score outputs are polars `DataFrame`s whose rows are identified
//! by (`iso3`, `level`). They are folded together with full outer joins that
//! reject repeated keys instead of deduplicating them.

mod csv;

use polars::prelude::*;
use thiserror::Error;

pub use csv::{persist_all, read_csv, stage_csv, write_csv, write_csv_bytes, StagedCsv};

/// Key columns shared by every check and score frame.
pub const KEYS: [&str; 2] = ["iso3", "level"];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("duplicate key ({0}) in join input")]
    DuplicateKey(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("column {0} present on both sides of a join")]
    ColumnConflict(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Plain values that can be stored in a frame cell.
pub trait IntoCell {
    fn into_cell(self) -> AnyValue<'static>;
}

impl IntoCell for AnyValue<'static> { fn into_cell(self) -> AnyValue<'static> { self } }
impl IntoCell for bool { fn into_cell(self) -> AnyValue<'static> { AnyValue::Boolean(self) } }
impl IntoCell for i64 { fn into_cell(self) -> AnyValue<'static> { AnyValue::Int64(self) } }
impl IntoCell for u8 { fn into_cell(self) -> AnyValue<'static> { AnyValue::Int64(self as i64) } }
impl IntoCell for usize { fn into_cell(self) -> AnyValue<'static> { AnyValue::Int64(self as i64) } }
impl IntoCell for f64 { fn into_cell(self) -> AnyValue<'static> { AnyValue::Float64(self) } }
impl IntoCell for &str { fn into_cell(self) -> AnyValue<'static> { AnyValue::StringOwned(self.into()) } }
impl IntoCell for String { fn into_cell(self) -> AnyValue<'static> { AnyValue::StringOwned(self.into()) } }

impl<T: IntoCell> IntoCell for Option<T> {
    fn into_cell(self) -> AnyValue<'static> { self.map_or(AnyValue::Null, IntoCell::into_cell) }
}

/// One output row of a check or score function, keyed by (country, level).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub iso3: String,
    pub level: u8,
    pub values: Vec<(String, AnyValue<'static>)>,
}

impl Record {
    pub fn new(iso3: &str, level: u8) -> Self {
        Self { iso3: iso3.to_string(), level, values: Vec::new() }
    }

    /// Append a named value.
    pub fn with(mut self, name: &str, value: impl IntoCell) -> Self {
        self.values.push((name.to_string(), value.into_cell()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AnyValue<'static>> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Build a typed column from cells.
///
/// Mixed numeric cells widen to the common type. A column of only nulls is
/// typed as text, and cells without a common type are rendered as text.
pub(crate) fn cells_to_column(name: &str, cells: &[AnyValue<'static>]) -> Column {
    let text = || {
        let values: Vec<Option<String>> = cells.iter().map(cell_text).collect();
        Series::new(name.into(), values)
    };
    let series = match Series::from_any_values(name.into(), cells, false) {
        Ok(series) if series.dtype() == &DataType::Null => text(),
        Ok(series) => series,
        Err(_) => text(),
    };
    Column::from(series)
}

fn cell_text(cell: &AnyValue) -> Option<String> {
    match cell {
        AnyValue::Null => None,
        other => Some(other.get_str().map_or_else(|| other.to_string(), str::to_string)),
    }
}

/// Assemble records into a keyed frame.
///
/// Value columns appear in first-seen order; a record lacking a column gets
/// a null there. No records yields the two key columns and no rows.
pub fn records_to_frame(records: &[Record]) -> Result<DataFrame, FrameError> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in &record.values {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
    }

    let mut columns = vec![
        Column::from(Series::new(KEYS[0].into(), records.iter().map(|r| r.iso3.as_str()).collect::<Vec<_>>())),
        Column::from(Series::new(KEYS[1].into(), records.iter().map(|r| r.level as i64).collect::<Vec<_>>())),
    ];
    for name in names {
        let cells: Vec<AnyValue<'static>> = records.iter()
            .map(|r| r.get(name).cloned().unwrap_or(AnyValue::Null))
            .collect();
        columns.push(cells_to_column(name, &cells));
    }

    Ok(DataFrame::new(columns)?)
}

/// Fail if any (`iso3`, `level`) pair occurs more than once.
pub fn ensure_unique_keys(df: &DataFrame) -> Result<(), FrameError> {
    let repeated = keyed(df)?
        .group_by([col(KEYS[0]), col(KEYS[1])])
        .agg([len().alias("rows")])
        .filter(col("rows").gt(lit(1)))
        .collect()?;
    if repeated.height() == 0 { return Ok(()) }

    let iso3 = text(&repeated, 0, KEYS[0]).unwrap_or_default();
    let level = number(&repeated, 0, KEYS[1]).map_or(String::new(), |l| l.to_string());
    Err(FrameError::DuplicateKey(format!("{iso3}, {level}")))
}

/// Lazy view of a keyed frame with the key columns in their canonical types.
fn keyed(df: &DataFrame) -> Result<LazyFrame, FrameError> {
    for key in KEYS {
        df.column(key).map_err(|_| FrameError::MissingColumn(key.to_string()))?;
    }
    Ok(df.clone().lazy().with_columns([
        col(KEYS[0]).cast(DataType::String),
        col(KEYS[1]).cast(DataType::Int64),
    ]))
}

/// Full outer join on (`iso3`, `level`).
///
/// Key cells are coalesced and rows keep the order in which keys are first
/// seen, left before right. Repeated keys on either side, and value columns
/// present on both sides, are errors.
pub fn outer_join(left: &DataFrame, right: &DataFrame) -> Result<DataFrame, FrameError> {
    ensure_unique_keys(left)?;
    ensure_unique_keys(right)?;

    let left_names = left.get_column_names();
    if let Some(shared) = right.get_column_names().into_iter()
        .find(|name| !KEYS.contains(&name.as_str()) && left_names.contains(name))
    {
        return Err(FrameError::ColumnConflict(shared.to_string()));
    }

    let mut args = JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns);
    args.validation = JoinValidation::OneToOne;
    args.maintain_order = MaintainOrderJoin::LeftRight;
    let on = [col(KEYS[0]), col(KEYS[1])];

    Ok(keyed(left)?.join(keyed(right)?, on.clone(), on, args).collect()?)
}

/// Numeric view of a cell: integers, floats, booleans as 0/1, and numeric text.
pub fn number(df: &DataFrame, row: usize, name: &str) -> Option<f64> {
    let value = df.column(name).ok()?.get(row).ok()?;
    value.extract::<f64>().filter(|v| !v.is_nan())
}

/// Text view of a cell; null cells and absent columns give `None`.
pub fn text(df: &DataFrame, row: usize, name: &str) -> Option<String> {
    cell_text(&df.column(name).ok()?.get(row).ok()?)
}

/// Boolean view of a cell; numbers are true when non-zero.
pub fn flag(df: &DataFrame, row: usize, name: &str) -> Option<bool> {
    match df.column(name).ok()?.get(row).ok()? {
        AnyValue::Boolean(b) => Some(b),
        AnyValue::Null => None,
        other => match other.get_str().map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "true" => Some(true),
            Some(s) if s == "false" => Some(false),
            Some(_) => None,
            None => other.extract::<f64>().map(|v| v != 0.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn frame(records: Vec<Record>) -> DataFrame { records_to_frame(&records).unwrap() }

    fn levels(df: &DataFrame) -> Vec<i64> {
        (0..df.height()).map(|r| number(df, r, "level").unwrap() as i64).collect()
    }

    #[test]
    fn records_fill_missing_columns_with_null() {
        let df = frame(vec![
            Record::new("AFG", 0).with("a", 1i64),
            Record::new("AFG", 1).with("b", "x"),
        ]);
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["iso3", "level", "a", "b"]);
        assert_eq!(text(&df, 0, "b"), None);
        assert_eq!(text(&df, 1, "b"), Some("x".into()));
        assert_eq!(number(&df, 1, "level"), Some(1.0));
    }

    #[test]
    fn null_only_columns_are_text() {
        let df = frame(vec![Record::new("AFG", 0).with("ids", Option::<String>::None)]);
        assert_eq!(df.column("ids").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn outer_join_keeps_union_of_keys_in_first_seen_order() {
        let left = frame(vec![
            Record::new("AFG", 0).with("a", 1i64),
            Record::new("AFG", 1).with("a", 2i64),
        ]);
        let right = frame(vec![
            Record::new("AFG", 2).with("b", 30i64),
            Record::new("AFG", 1).with("b", 20i64),
        ]);

        let joined = outer_join(&left, &right).unwrap();
        let names: Vec<String> = joined.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["iso3", "level", "a", "b"]);
        assert_eq!(levels(&joined), vec![0, 1, 2]);
        assert_eq!(number(&joined, 0, "b"), None);
        assert_eq!(number(&joined, 1, "b"), Some(20.0));
        assert_eq!(number(&joined, 2, "a"), None);
        assert_eq!(text(&joined, 2, "iso3"), Some("AFG".into()));
    }

    #[test]
    fn outer_join_rejects_duplicate_keys() {
        let left = frame(vec![Record::new("AFG", 0).with("a", 1i64)]);
        let right = frame(vec![
            Record::new("AFG", 0).with("b", 1i64),
            Record::new("AFG", 0).with("b", 2i64),
        ]);
        assert!(matches!(outer_join(&left, &right), Err(FrameError::DuplicateKey(_))));
        assert!(matches!(outer_join(&right, &left), Err(FrameError::DuplicateKey(_))));
    }

    #[test]
    fn duplicates_in_the_first_input_are_caught_against_an_empty_frame() {
        let empty = records_to_frame(&[]).unwrap();
        let first = frame(vec![
            Record::new("AFG", 1).with("a", 1i64),
            Record::new("AFG", 1).with("a", 2i64),
        ]);
        assert!(matches!(outer_join(&empty, &first), Err(FrameError::DuplicateKey(_))));
    }

    #[test]
    fn outer_join_rejects_shared_value_columns() {
        let left = frame(vec![Record::new("AFG", 0).with("a", 1i64)]);
        let right = frame(vec![Record::new("AFG", 0).with("a", 2i64)]);
        assert!(matches!(outer_join(&left, &right), Err(FrameError::ColumnConflict(c)) if c == "a"));
    }

    #[test]
    fn keys_match_across_integer_widths() {
        let left = DataFrame::new(vec![
            Column::from(Series::new("iso3".into(), vec!["AFG"])),
            Column::from(Series::new("level".into(), vec![1i32])),
            Column::from(Series::new("a".into(), vec![5i64])),
        ]).unwrap();
        let right = frame(vec![Record::new("AFG", 1).with("b", 6i64)]);
        let joined = outer_join(&left, &right).unwrap();
        assert_eq!(joined.height(), 1);
        assert_eq!(number(&joined, 0, "b"), Some(6.0));
    }

    #[test]
    fn flags_read_booleans_text_and_numbers() {
        let df = frame(vec![
            Record::new("AFG", 0).with("m", true).with("t", "false").with("n", 2i64),
        ]);
        assert_eq!(flag(&df, 0, "m"), Some(true));
        assert_eq!(flag(&df, 0, "t"), Some(false));
        assert_eq!(flag(&df, 0, "n"), Some(true));
        assert_eq!(flag(&df, 0, "absent"), None);
    }

    proptest! {
        #[test]
        fn folded_joins_cover_every_level_once(subsets in proptest::collection::vec(
            proptest::collection::btree_set(0u8..6, 0..6), 1..8,
        )) {
            let folded = subsets.iter().enumerate().try_fold(records_to_frame(&[]).unwrap(), |acc, (i, levels)| {
                let records: Vec<Record> = levels.iter()
                    .map(|&level| Record::new("XXX", level).with(&format!("c{i}"), i as i64))
                    .collect();
                outer_join(&acc, &records_to_frame(&records).unwrap())
            }).unwrap();

            let expected: std::collections::BTreeSet<i64> = subsets.iter().flatten().map(|&l| l as i64).collect();
            let mut seen = levels(&folded);
            prop_assert_eq!(seen.len(), expected.len());
            seen.sort_unstable();
            prop_assert_eq!(seen, expected.into_iter().collect::<Vec<_>>());

            for (i, levels) in subsets.iter().enumerate() {
                for row in 0..folded.height() {
                    let level = number(&folded, row, "level").unwrap() as u8;
                    let cell = number(&folded, row, &format!("c{i}"));
                    prop_assert_eq!(cell.is_some(), levels.contains(&level));
                }
            }
        }
    }
}
