//! Entity name canonicalization and reconciliation.
//!
//! Tabular sources and boundary files spell the same state in different
//! ways ("WEST BENGAL" vs "West Bengal") and some administrative units have
//! been renamed or merged since the census was taken. The resolver maps
//! both sides onto one canonical key so they can be joined.

pub mod overrides;

pub use overrides::OverrideTable;

use crate::models::{FeatureMatch, GeoFeature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Produces the canonical key for a free-text entity name.
///
/// Trims, lowercases, and replaces spaces and hyphens with underscores.
/// Never fails; an empty name gives an empty key.
pub fn canonicalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// How a resolved name was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Through the explicit override table.
    Override,
    /// By canonical string equality.
    Exact,
}

/// Outcome of resolving one tabular name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    Resolved { key: String, via: MatchSource },
    Unresolved { raw: String },
}

impl Resolution {
    /// The resolved key, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { key, .. } => Some(key),
            Resolution::Unresolved { .. } => None,
        }
    }
}

/// Result of reconciling every tabular name against a feature collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// One entry per feature, in feature order.
    pub features: Vec<FeatureMatch>,
    /// Tabular names with no matching feature, in first-seen order.
    pub unresolved: Vec<String>,
    /// Resolved key to every distinct raw name that mapped onto it.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl ResolutionReport {
    /// Names of features that no tabular entity mapped onto.
    pub fn unresolved_features(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|m| m.key.is_none())
            .map(|m| m.feature.clone())
            .collect()
    }
}

/// Resolves tabular entity names to boundary feature keys.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    overrides: OverrideTable,
}

impl NameResolver {
    pub fn new(overrides: OverrideTable) -> Self {
        Self { overrides }
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Resolves one tabular name against the available feature names.
    ///
    /// The override table is consulted first, and only counts when its
    /// target is among the features; otherwise canonical equality decides.
    pub fn resolve<S: AsRef<str>>(&self, tabular_name: &str, feature_names: &[S]) -> Resolution {
        let available: BTreeSet<String> = feature_names
            .iter()
            .map(|name| canonicalize(name.as_ref()))
            .collect();
        self.resolve_in(tabular_name, &available)
    }

    /// Resolves against an already canonicalized feature key set.
    pub fn resolve_in(&self, tabular_name: &str, available: &BTreeSet<String>) -> Resolution {
        if let Some(target) = self.overrides.lookup(tabular_name) {
            if available.contains(target) {
                return Resolution::Resolved {
                    key: target.to_string(),
                    via: MatchSource::Override,
                };
            }
            debug!(
                "Override for '{}' points at '{}', which is not among the features",
                tabular_name, target
            );
        }

        let key = canonicalize(tabular_name);
        if !key.is_empty() && available.contains(&key) {
            Resolution::Resolved {
                key,
                via: MatchSource::Exact,
            }
        } else {
            Resolution::Unresolved {
                raw: tabular_name.to_string(),
            }
        }
    }

    /// Reconciles every tabular name against a feature collection.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        tabular_names: &[S],
        features: &[GeoFeature],
    ) -> ResolutionReport {
        let available: BTreeSet<String> =
            features.iter().map(|f| canonicalize(&f.name)).collect();

        let mut report = ResolutionReport::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut matched: BTreeSet<String> = BTreeSet::new();

        for name in tabular_names {
            let name = name.as_ref();
            if canonicalize(name).is_empty() || !seen.insert(name) {
                continue;
            }
            match self.resolve_in(name, &available) {
                Resolution::Resolved { key, .. } => {
                    report
                        .aliases
                        .entry(key.clone())
                        .or_default()
                        .push(name.to_string());
                    matched.insert(key);
                }
                Resolution::Unresolved { raw } => report.unresolved.push(raw),
            }
        }

        report.features = features
            .iter()
            .map(|f| {
                let key = canonicalize(&f.name);
                FeatureMatch {
                    feature: f.name.clone(),
                    key: matched.contains(&key).then_some(key),
                }
            })
            .collect();

        report
    }
}
