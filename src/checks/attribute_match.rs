use crate::{
    frame::Record,
    layer::{name_column, parent_layer, parent_rows, pcode_column, BoundaryLayer},
};

use super::{count, CheckContext};

/// Inherited `adm{k}_pcode` / `adm{k}_name` values that disagree with the parent row.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().filter_map(|layer| {
        let parent = parent_layer(layers, layer)?;
        let rows = parent_rows(layer, parent);

        let mismatches = |column: &str| -> Vec<bool> {
            let own = layer.text_or_null(column);
            let theirs = parent.text_or_null(column);
            rows.iter().zip(own)
                .map(|(row, value)| row.is_some_and(|p| value != theirs[p]))
                .collect()
        };
        let any = |columns: Vec<String>| -> usize {
            let flags: Vec<Vec<bool>> = columns.iter().map(|c| mismatches(c)).collect();
            count((0..layer.len()).map(|i| flags.iter().any(|f| f[i])))
        };

        let ancestors = 0..layer.level;
        Some(Record::new(ctx.iso3, layer.level)
            .with("attr_pcode_mismatch", any(ancestors.clone().map(pcode_column).collect()))
            .with("attr_name_mismatch", any(ancestors.map(|k| name_column(k, 0)).collect())))
    }).collect()
}

#[cfg(test)]
mod tests {
    use polars::prelude::AnyValue;

    use super::*;
    use crate::checks::testing::{context, latin};
    use crate::config::Config;
    use crate::layer::testing::{layer, s, square};

    #[test]
    fn inherited_names_and_codes_must_match_parent() {
        let adm1 = layer(1, vec![square(0.0, 0.0, 1.0); 2], &[
            ("adm0_pcode", vec![s("XX"), s("XX")]),
            ("adm0_name", vec![s("Xland"), s("Xland")]),
            ("adm1_pcode", vec![s("XX01"), s("XX02")]),
            ("adm1_name", vec![s("North"), s("South")]),
        ]);
        let adm2 = layer(2, vec![square(0.0, 0.0, 1.0); 3], &[
            ("adm0_pcode", vec![s("XX"), s("XY"), s("XX")]),
            ("adm0_name", vec![s("Xland"), s("Xland"), s("Xland")]),
            ("adm1_pcode", vec![s("XX01"), s("XX02"), s("XX02")]),
            ("adm1_name", vec![s("North"), s("South"), s("Sud")]),
            ("adm2_pcode", vec![s("XX0101"), s("XX0201"), s("XX0202")]),
        ]);
        let config = Config::default();
        let records = check(&context(&config, &latin), &[adm1, adm2]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].values, vec![
            ("attr_pcode_mismatch".to_string(), AnyValue::Int64(1)),
            ("attr_name_mismatch".to_string(), AnyValue::Int64(1)),
        ]);
    }
}
