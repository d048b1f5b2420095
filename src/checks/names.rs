//! Per-cell predicates for localized admin names.
//!
//! Blank or missing names are never flagged. Character-set predicates skip
//! malformed or excluded language tags and languages without exemplar data.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

use ahash::AHashMap;

use crate::{config::Config, locale::{tag_is_valid, Exemplars}};

/// Name checks bound to a configuration and an exemplar source.
pub struct NameChecker<'a> {
    config: &'a Config,
    exemplars: &'a dyn Exemplars,
    cache: RefCell<AHashMap<(String, String), Option<Rc<HashSet<char>>>>>,
}

/// The name, if it has any non-whitespace content.
#[inline]
fn text(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.trim().is_empty())
}

impl<'a> NameChecker<'a> {
    pub fn new(config: &'a Config, exemplars: &'a dyn Exemplars) -> Self {
        Self { config, exemplars, cache: RefCell::new(AHashMap::new()) }
    }

    /// Exemplar plus auxiliary characters for a checkable language, or `None`.
    fn char_set(&self, lang: &str, iso3: &str) -> Option<Rc<HashSet<char>>> {
        if !tag_is_valid(lang) || self.config.is_excluded(lang) { return None }
        let key = (lang.to_string(), iso3.to_string());
        if let Some(hit) = self.cache.borrow().get(&key) { return hit.clone() }

        let set = self.exemplars.exemplar_characters(lang, iso3).map(|mut set| {
            set.extend(self.config.auxiliary_chars(lang, iso3));
            Rc::new(set)
        });
        self.cache.borrow_mut().insert(key, set.clone());
        set
    }

    /// Characters of `name` outside the language's set and the allowed
    /// punctuation, in order of first appearance.
    pub fn get_invalid_chars(&self, lang: &str, name: Option<&str>, iso3: &str) -> String {
        let (Some(name), Some(set)) = (text(name), self.char_set(lang, iso3)) else { return String::new() };
        let mut out = String::new();
        for c in name.chars().filter(|c| !set.contains(c) && !self.config.is_punctuation(*c)) {
            if !out.contains(c) { out.push(c) }
        }
        out
    }

    /// Whether `name` has any character outside its language's set.
    pub fn is_invalid(&self, lang: &str, name: Option<&str>, iso3: &str) -> bool {
        let (Some(name), Some(set)) = (text(name), self.char_set(lang, iso3)) else { return false };
        name.chars().any(|c| !set.contains(&c) && !self.config.is_punctuation(c))
    }

    /// Whether `name` contains no letters of its language at all.
    pub fn is_punctuation(&self, lang: &str, name: Option<&str>, iso3: &str) -> bool {
        let (Some(name), Some(set)) = (text(name), self.char_set(lang, iso3)) else { return false };
        name.chars().all(|c| !set.contains(&c))
    }

    /// Whether an admin-0 name differs from the official country name.
    /// Only official languages with a known name are compared.
    pub fn is_invalid_adm0(&self, lang: &str, name: Option<&str>, iso3: &str) -> bool {
        if !self.config.is_official(lang) { return false }
        match self.config.official_name(iso3, lang) {
            Some(official) => name != Some(official),
            None => false,
        }
    }
}

/// All cased characters are uppercase.
pub fn is_upper(name: Option<&str>) -> bool {
    text(name).is_some_and(|n| n == n.to_uppercase() && n.to_lowercase() != n.to_uppercase())
}

/// All cased characters are lowercase.
pub fn is_lower(name: Option<&str>) -> bool {
    text(name).is_some_and(|n| n == n.to_lowercase() && n.to_lowercase() != n.to_uppercase())
}

pub fn has_numbers(name: Option<&str>) -> bool {
    text(name).is_some_and(|n| n.chars().any(char::is_numeric))
}

pub fn has_double_spaces(name: Option<&str>) -> bool {
    text(name).is_some_and(|n| n.contains("  "))
}

/// Leading or trailing whitespace.
pub fn has_strippable_spaces(name: Option<&str>) -> bool {
    text(name).is_some_and(|n| n != n.trim())
}
