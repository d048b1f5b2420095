use std::collections::BTreeSet;

use crate::{
    frame::Record,
    layer::{lang_column, BoundaryLayer},
    locale::tag_is_valid,
};

use super::CheckContext;

/// Language tags used across the name slots: validity, expectation, and
/// whether the primary `lang` is a romanized language.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    let config = ctx.config;
    layers.iter().map(|layer| {
        let codes: BTreeSet<String> = (0..config.language_count)
            .filter_map(|slot| layer.text(&lang_column(slot)))
            .flatten()
            .flatten()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        let primary = layer.text_or_null(&lang_column(0));
        let missing = primary.iter().filter(|t| t.as_deref().map_or(true, |t| t.trim().is_empty())).count();
        let invalid = codes.iter().filter(|t| !tag_is_valid(t)).count();
        let unexpected = codes.iter().filter(|t| tag_is_valid(t) && !config.is_expected(t, ctx.iso3)).count();
        let not_romanized = primary.iter().flatten()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && !config.is_romanized(t))
            .count();

        Record::new(ctx.iso3, layer.level)
            .with("lang_codes", (!codes.is_empty()).then(|| codes.iter().cloned().collect::<Vec<_>>().join(";")))
            .with("lang_missing", missing)
            .with("lang_invalid", invalid)
            .with("lang_unexpected", unexpected)
            .with("lang_not_romanized", not_romanized)
    }).collect()
}
