use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use crate::{
    frame::Record,
    layer::{parent_layer, parent_rows, pcode_column, BoundaryLayer},
};

use super::{count, CheckContext};

fn pcode_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]*$").unwrap_or_else(|e| panic!("invalid P-code pattern: {e}")))
}

/// Whether `pcode` is two country letters followed by uppercase alphanumerics.
pub fn is_well_formed(pcode: &str) -> bool {
    pcode_regex().is_match(pcode)
}

/// P-code presence, format, uniqueness, hierarchy prefix, and parent existence.
///
/// A code violates the hierarchy when it does not start with the code of
/// every ancestor recorded on its row. A missing parent code is a violation.
pub(super) fn check(ctx: &CheckContext, layers: &[BoundaryLayer]) -> Vec<Record> {
    layers.iter().map(|layer| {
        let pcodes: Vec<Option<String>> = layer.pcodes().into_iter()
            .map(|p| p.filter(|p| !p.trim().is_empty()))
            .collect();
        let present = || pcodes.iter().flatten();

        // Every higher level's code column; only the parent's must be filled.
        let ancestors: Vec<(bool, Vec<Option<String>>)> = (0..layer.level).rev()
            .filter_map(|k| {
                let required = k + 1 == layer.level;
                let column = pcode_column(k);
                if required { Some((true, layer.text_or_null(&column))) } else { layer.text(&column).map(|c| (false, c)) }
            })
            .collect();

        let mut seen = HashSet::new();
        let duplicates = count(present().map(|p| !seen.insert(p.as_str())));

        let prefix = count(pcodes.iter().enumerate()
            .filter_map(|(row, own)| own.as_ref().map(|own| (row, own)))
            .map(|(row, own)| !ancestors.iter().all(|(required, column)| {
                match column[row].as_deref().filter(|p| !p.is_empty()) {
                    Some(p) => own.starts_with(p),
                    None => !required,
                }
            })));

        let orphans = parent_layer(layers, layer).map(|parent| count(parent_rows(layer, parent).iter().map(Option::is_none)));

        Record::new(ctx.iso3, layer.level)
            .with("pcode_missing", count(pcodes.iter().map(Option::is_none)))
            .with("pcode_malformed", count(present().map(|p| !is_well_formed(p))))
            .with("pcode_duplicate", duplicates)
            .with("pcode_prefix", prefix)
            .with("pcode_orphan", orphans)
    }).collect()
}
