//! Locale lookups used by the name and language checks.

use std::{
    collections::{BTreeMap, HashSet},
    sync::OnceLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

/// Source of the characters a language is expected to be written with.
pub trait Exemplars {
    /// Standard exemplar characters for `tag` as used in `iso3`, including
    /// case mappings. `None` means the language is unknown and should not be
    /// checked.
    fn exemplar_characters(&self, tag: &str, iso3: &str) -> Option<HashSet<char>>;
}

impl<F> Exemplars for F
where
    F: Fn(&str, &str) -> Option<HashSet<char>>,
{
    fn exemplar_characters(&self, tag: &str, iso3: &str) -> Option<HashSet<char>> {
        self(tag, iso3)
    }
}

#[derive(Deserialize)]
struct ExemplarFile {
    languages: BTreeMap<String, String>,
}

/// Exemplar sets loaded from a TOML table of `language = "characters"`.
#[derive(Debug, Clone, Default)]
pub struct CldrExemplars {
    sets: BTreeMap<String, HashSet<char>>,
}

impl CldrExemplars {
    /// The sets bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("exemplars.toml"))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ExemplarFile = toml::from_str(text).context("[locale] Failed to parse exemplar table")?;
        Ok(file.languages.iter().fold(Self::default(), |acc, (tag, chars)| acc.with_language(tag, chars)))
    }

    /// Add or replace a language's set. Upper- and lowercase forms are both added.
    pub fn with_language(mut self, tag: &str, chars: &str) -> Self {
        let set = chars.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(|c| std::iter::once(c).chain(c.to_uppercase()).chain(c.to_lowercase()))
            .collect();
        self.sets.insert(tag.to_ascii_lowercase(), set);
        self
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

impl Exemplars for CldrExemplars {
    fn exemplar_characters(&self, tag: &str, _iso3: &str) -> Option<HashSet<char>> {
        let tag = tag.trim().to_ascii_lowercase();
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        self.sets.get(&tag).or_else(|| self.sets.get(primary)).cloned()
    }
}

#[derive(Deserialize)]
struct CountryFile {
    names: BTreeMap<String, BTreeMap<String, String>>,
}

/// Official country names bundled with the crate, per ISO3 and language.
pub fn official_country_names() -> &'static BTreeMap<String, BTreeMap<String, String>> {
    static NAMES: OnceLock<BTreeMap<String, BTreeMap<String, String>>> = OnceLock::new();
    NAMES.get_or_init(|| {
        toml::from_str::<CountryFile>(include_str!("countries.toml"))
            .map(|file| file.names)
            .unwrap_or_else(|e| panic!("invalid bundled country names: {e}"))
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^(?P<lang>[a-z]{2,3}(?:-[a-z]{3}){0,3})",
            r"(?:-[a-z]{4})?",
            r"(?:-(?:[a-z]{2}|[0-9]{3}))?",
            r"(?:-(?:[a-z0-9]{5,8}|[0-9][a-z0-9]{3}))*",
            r"(?:-[0-9a-wy-z](?:-[a-z0-9]{2,8})+)*",
            r"(?:-x(?:-[a-z0-9]{1,8})+)?$",
        )).unwrap_or_else(|e| panic!("invalid language tag pattern: {e}"))
    })
}

/// Whether `tag` is a well-formed BCP-47 language tag whose primary subtag
/// has two or three letters and lies outside the private-use range `qaa`..`qtz`.
pub fn tag_is_valid(tag: &str) -> bool {
    let Some(caps) = tag_regex().captures(tag) else { return false };
    let primary = caps["lang"].split('-').next().unwrap_or_default().to_ascii_lowercase();
    !(primary.len() == 3 && ("qaa"..="qtz").contains(&primary.as_str()))
}
