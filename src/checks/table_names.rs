use crate::{
    frame::Record,
    layer::{lang_column, name_column, BoundaryLayer},
};

use super::{
    count,
    names::{has_double_spaces, has_numbers, has_strippable_spaces, is_lower, is_upper, NameChecker},
    CheckContext,
};

/// Counters over the own-level name cells of one layer.
#[derive(Debug, Default)]
struct NameCounts {
    cells: usize,
    invalid_chars: usize,
    punctuation: usize,
    double_spaces: usize,
    strippable: usize,
    upper: usize,
    lower: usize,
    numbers: usize,
    adm0_mismatch: usize,
}

/// Well-formedness of every localized `adm{level}_name*` column, read with
/// the language tag of its slot.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    let names = NameChecker::new(ctx.config, ctx.exemplars);

    layers.iter().map(|layer| {
        let mut c = NameCounts::default();
        for slot in 0..ctx.config.language_count {
            let Some(values) = layer.text(&name_column(layer.level, slot)) else { continue };
            let langs = layer.text_or_null(&lang_column(slot));

            for (name, lang) in values.iter().zip(&langs) {
                let name = name.as_deref();
                if name.map_or(true, |n| n.trim().is_empty()) { continue }
                let lang = lang.as_deref().map(str::trim).unwrap_or_default();

                c.cells += 1;
                c.invalid_chars += names.is_invalid(lang, name, ctx.iso3) as usize;
                c.punctuation += names.is_punctuation(lang, name, ctx.iso3) as usize;
                c.double_spaces += has_double_spaces(name) as usize;
                c.strippable += has_strippable_spaces(name) as usize;
                c.numbers += has_numbers(name) as usize;
                if ctx.config.is_romanized(lang) {
                    c.upper += is_upper(name) as usize;
                    c.lower += is_lower(name) as usize;
                }
                if layer.level == 0 {
                    c.adm0_mismatch += names.is_invalid_adm0(lang, name, ctx.iso3) as usize;
                }
            }
        }
        let primary = layer.text_or_null(&name_column(layer.level, 0));
        let missing = count(primary.iter().map(|n| n.as_deref().map_or(true, |n| n.trim().is_empty())));

        Record::new(ctx.iso3, layer.level)
            .with("name_cells", c.cells)
            .with("name_missing", missing)
            .with("name_invalid_chars", c.invalid_chars)
            .with("name_punctuation", c.punctuation)
            .with("name_double_spaces", c.double_spaces)
            .with("name_strippable", c.strippable)
            .with("name_upper", c.upper)
            .with("name_lower", c.lower)
            .with("name_numbers", c.numbers)
            .with("name_adm0_mismatch", c.adm0_mismatch)
    }).collect()
}
