//! Explicit name overrides for renamed and merged administrative units.

use super::canonicalize;
use std::collections::BTreeMap;

/// Historical census spellings mapped to the boundary file's names.
///
/// Uttarakhand is listed both ways since boundary files use either name; an
/// entry whose target is not a feature is skipped during resolution.
const DEFAULT_OVERRIDES: &[(&str, &str)] = &[
    ("ANDAMAN AND NICOBAR ISLANDS", "Andaman and Nicobar"),
    ("DADRA AND NAGAR HAVELI", "Dādra and Nagar Haveli and Damān and Diu"),
    ("DAMAN AND DIU", "Dādra and Nagar Haveli and Damān and Diu"),
    ("NCT OF DELHI", "Delhi"),
    ("ORISSA", "Odisha"),
    ("PONDICHERRY", "Puducherry"),
    ("UTTARAKHAND", "Uttaranchal"),
    ("UTTARANCHAL", "Uttarakhand"),
];

/// Raw name to canonical key, consulted before canonical matching.
///
/// Both sides are canonicalized on insert, so lookups are insensitive to
/// casing and spacing. Several raw names may share one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<String, String>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of known historical renames.
    pub fn defaults() -> Self {
        Self::from_pairs(DEFAULT_OVERRIDES.iter().copied())
    }

    /// Builds a table from `(raw name, target feature name)` pairs.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut table = Self::new();
        for (raw, target) in pairs {
            table.insert(raw.as_ref(), target.as_ref());
        }
        table
    }

    /// Adds or replaces one override.
    pub fn insert(&mut self, raw: &str, target: &str) {
        let raw = canonicalize(raw);
        if raw.is_empty() {
            return;
        }
        self.entries.insert(raw, canonicalize(target));
    }

    /// Merges another table into this one; entries of `other` win.
    pub fn extend(&mut self, other: &OverrideTable) {
        for (raw, target) in &other.entries {
            self.entries.insert(raw.clone(), target.clone());
        }
    }

    /// Target key for a raw name, if one is registered.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(&canonicalize(raw)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
