use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::locale::official_country_names;

/// Runtime settings for the checks and scoring engine.
///
/// Every field has a default, so a TOML file only needs to list overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deepest admin level searched for when loading layers.
    pub admin_levels: u8,
    /// Per-ISO3 reduced maximum admin level.
    pub max_level: BTreeMap<String, u8>,
    /// Number of localized name slots (`adm{k}_name`, `adm{k}_name1`, ...).
    pub language_count: usize,
    pub official_languages: Vec<String>,
    pub romanized_languages: Vec<String>,
    /// Extra language tags expected for a country, on top of the official ones.
    pub country_languages: BTreeMap<String, Vec<String>>,
    /// Languages never subjected to character-set checks.
    pub exclude_check: Vec<String>,
    /// Extra codepoints per `"{lang}-{ISO3}"`, written as `U+XXXX`.
    pub auxiliary_codes: BTreeMap<String, Vec<String>>,
    /// Punctuation allowed inside names.
    pub punctuation: String,
    /// Official country names per ISO3 and language, overriding the bundled ones.
    pub official_names: BTreeMap<String, BTreeMap<String, String>>,
    /// Columns that are part of the schema besides the `adm{k}_*` family.
    pub misc_columns: Vec<String>,
    pub sliver_gap_area_km: f64,
    pub sliver_gap_thinness: f64,
    pub overlap_area_km: f64,
    pub area_ratio_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            admin_levels: 5,
            max_level: [("CAF", 3), ("MMR", 3), ("TCD", 2), ("UKR", 3)].into_iter()
                .map(|(iso3, level)| (iso3.to_string(), level))
                .collect(),
            language_count: 4,
            official_languages: strings(&["ar", "en", "es", "fr", "ru", "zh"]),
            romanized_languages: strings(&["en", "es", "fr", "hu", "id", "nl", "pl", "pt", "ro", "sk"]),
            country_languages: BTreeMap::new(),
            exclude_check: Vec::new(),
            auxiliary_codes: BTreeMap::new(),
            punctuation: " -'’().,/".to_string(),
            official_names: BTreeMap::new(),
            misc_columns: strings(&[
                "area_sqkm", "geometry", "iso2", "iso3", "lang", "lang1", "lang2", "lang3",
                "valid_on", "valid_to", "version_no",
            ]),
            sliver_gap_area_km: 0.000_1,
            sliver_gap_thinness: 0.001,
            overlap_area_km: 0.000_1,
            area_ratio_tolerance: 0.02,
        }
    }
}

impl Config {
    /// Parse a TOML document, falling back to defaults for missing keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("[config] Failed to parse configuration")
    }

    /// Read a TOML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Deepest admin level to check for `iso3`.
    pub fn max_level(&self, iso3: &str) -> u8 {
        self.max_level.get(&iso3.to_ascii_uppercase()).copied().unwrap_or(self.admin_levels)
    }

    #[inline] pub fn is_official(&self, lang: &str) -> bool { self.official_languages.iter().any(|l| l == lang) }

    #[inline] pub fn is_romanized(&self, lang: &str) -> bool { self.romanized_languages.iter().any(|l| l == lang) }

    #[inline] pub fn is_excluded(&self, lang: &str) -> bool { self.exclude_check.iter().any(|l| l == lang) }

    /// Whether `lang` is an expected tag for `iso3`.
    pub fn is_expected(&self, lang: &str, iso3: &str) -> bool {
        self.is_official(lang)
            || self.country_languages.get(&iso3.to_ascii_uppercase())
                .is_some_and(|langs| langs.iter().any(|l| l == lang))
    }

    /// Auxiliary characters configured for `lang` in `iso3`. Malformed codes are ignored.
    pub fn auxiliary_chars(&self, lang: &str, iso3: &str) -> Vec<char> {
        self.auxiliary_codes.get(&format!("{lang}-{}", iso3.to_ascii_uppercase()))
            .map(|codes| codes.iter().filter_map(|code| parse_codepoint(code)).collect())
            .unwrap_or_default()
    }

    /// Official country name for `iso3` in `lang`. Configured names take
    /// precedence over the bundled table.
    pub fn official_name(&self, iso3: &str, lang: &str) -> Option<&str> {
        let iso3 = iso3.to_ascii_uppercase();
        self.official_names.get(&iso3).and_then(|names| names.get(lang))
            .or_else(|| official_country_names().get(&iso3)?.get(lang))
            .map(String::as_str)
    }

    #[inline] pub fn is_punctuation(&self, c: char) -> bool { self.punctuation.contains(c) }
}

/// Parse `U+02BC` / `0x02BC` style codepoints.
fn parse_codepoint(code: &str) -> Option<char> {
    let hex = code.get(2..)?;
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}
