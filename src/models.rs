//! Data models for the census analytics engine.
//!
//! This module contains the records fed into the engine (rows and
//! boundary features), the query parameters callers pass in, and the
//! structured results handed back to the report layer.

use crate::analysis::{Comparison, CorrelationMatrix};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Granularity of a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// One or more rows per state.
    #[default]
    State,
    /// One row per district, each carrying its parent state.
    District,
}

impl Level {
    /// Plural noun used in generated text.
    pub fn plural(&self) -> &'static str {
        match self {
            Level::State => "states",
            Level::District => "districts",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::State => write!(f, "State"),
            Level::District => write!(f, "District"),
        }
    }
}

/// One record from the tabular source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Entity name as written in the source (state or district).
    pub entity: String,
    /// Parent state name, present on district rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Attribute column name to numeric value; `None` is a null cell.
    pub values: BTreeMap<String, Option<f64>>,
}

impl RawRow {
    /// Creates a row with no attribute values.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            parent: None,
            values: BTreeMap::new(),
        }
    }

    /// Sets the parent state name.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds one attribute value.
    pub fn with_value(mut self, column: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(column.into(), value);
        self
    }

    /// Returns the value for an attribute, treating NaN as missing.
    pub fn value(&self, attribute: &str) -> Option<f64> {
        self.values
            .get(attribute)
            .copied()
            .flatten()
            .filter(|v| !v.is_nan())
    }
}

/// A loaded tabular source: its attribute columns and rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub level: Level,
    /// Attribute columns in source order.
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// One boundary record from the geographic source.
///
/// Only the name is used; geometry is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoFeature {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub geometry: serde_json::Value,
}

impl GeoFeature {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry: serde_json::Value::Null,
        }
    }
}

/// Canonical state or district derived from rows and features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical key (lowercase, underscore separated).
    pub key: String,
    /// Human readable name.
    pub display_name: String,
    /// Canonical key of the parent state, for districts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Subset of entities a query is evaluated over.
///
/// The default scope covers every entity in the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Only these canonical keys.
    pub keys: Option<BTreeSet<String>>,
    /// Only districts whose parent state has this canonical key.
    pub parent: Option<String>,
    /// Only entities whose display name contains this text (case-insensitive).
    pub search: Option<String>,
}

impl Scope {
    /// Scope covering every entity.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the scope to the given canonical keys.
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts the scope to districts of one state.
    pub fn within(mut self, parent_key: impl Into<String>) -> Self {
        self.parent = Some(parent_key.into());
        self
    }

    /// Restricts the scope to names containing `term`.
    pub fn matching(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() {
            None
        } else {
            Some(term)
        };
        self
    }

    /// Whether the scope places no restriction at all.
    pub fn is_unrestricted(&self) -> bool {
        self.keys.is_none() && self.parent.is_none() && self.search.is_none()
    }

    /// Tests an entity against every restriction of the scope.
    pub fn admits(&self, entity: &Entity) -> bool {
        if let Some(ref keys) = self.keys {
            if !keys.contains(&entity.key) {
                return false;
            }
        }
        if let Some(ref parent) = self.parent {
            if entity.parent.as_deref() != Some(parent.as_str()) {
                return false;
            }
        }
        if let Some(ref term) = self.search {
            let needle = term.trim().to_lowercase();
            if !entity.display_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// Sort direction for rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Highest value first.
    #[default]
    Descending,
    /// Lowest value first.
    Ascending,
}

/// One ranked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub key: String,
    pub name: String,
    pub value: f64,
}

/// Strength of the linear relationship between two attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    #[default]
    Unrelated,
    SomewhatRelated,
    Related,
}

impl Relation {
    /// Classifies a Pearson coefficient by its magnitude.
    pub fn from_coefficient(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude < 0.2 {
            Relation::Unrelated
        } else if magnitude <= 0.7 {
            Relation::SomewhatRelated
        } else {
            Relation::Related
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Unrelated => write!(f, "Unrelated"),
            Relation::SomewhatRelated => write!(f, "Somewhat related"),
            Relation::Related => write!(f, "Related"),
        }
    }
}

/// Result of correlating two attributes across a set of entities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson coefficient; `None` when fewer than two pairs exist.
    pub coefficient: Option<f64>,
    pub relation: Relation,
    /// Number of entities with both values present.
    pub pair_count: usize,
}

impl CorrelationResult {
    /// Result for a paired set too small to correlate.
    pub fn insufficient(pair_count: usize) -> Self {
        Self {
            coefficient: None,
            relation: Relation::Unrelated,
            pair_count,
        }
    }
}

/// Deviation of one entity from the population benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub vs_mean: f64,
    pub vs_median: f64,
    pub vs_max: f64,
}

/// Kind of a generated insight, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    TopPerformer,
    Average,
    PerformanceGap,
    /// Count of entities at or above the 75th percentile.
    EducationFocus,
    /// Standard deviation for employment attributes.
    EmploymentPattern,
    /// Standard deviation for every other attribute.
    Variability,
    ImprovementOpportunity,
}

impl InsightKind {
    pub fn title(&self) -> &'static str {
        match self {
            InsightKind::TopPerformer => "Top Performer",
            InsightKind::Average => "Average",
            InsightKind::PerformanceGap => "Performance Gap",
            InsightKind::EducationFocus => "Education Focus",
            InsightKind::EmploymentPattern => "Employment Pattern",
            InsightKind::Variability => "Variability",
            InsightKind::ImprovementOpportunity => "Improvement Potential",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One structured summary statement about an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    /// Short headline, e.g. an entity name or a formatted value.
    pub headline: String,
    /// Numeric value behind the headline, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Supporting sentence.
    pub detail: String,
}

/// Descriptive statistics of one attribute over a population.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub p75: f64,
}

/// Outcome of matching one geographic feature to a tabular entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMatch {
    /// Feature name as written in the boundary source.
    pub feature: String,
    /// Entity key, or `None` when no tabular entity maps to the feature.
    pub key: Option<String>,
}

/// Metadata about the analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the tabular source.
    pub data_source: String,
    /// Path of the boundary source, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_source: Option<String>,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    pub level: Level,
    /// Number of distinct entities in the snapshot.
    pub entity_count: usize,
    /// Number of attribute columns in the snapshot.
    pub attribute_count: usize,
    /// Rows dropped for having a blank entity name.
    #[serde(default)]
    pub skipped_rows: usize,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// Everything computed for one chosen attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeAnalysis {
    pub attribute: String,
    /// Short human label for the attribute.
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub summary: PopulationSummary,
    pub ranking: Vec<RankedEntity>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub gaps: BTreeMap<String, Gap>,
    pub insights: Vec<Insight>,
}

/// Correlation of the chosen attribute against a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationSection {
    pub attribute: String,
    pub other: String,
    pub result: CorrelationResult,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Category label to ordered attribute columns.
    pub taxonomy: Vec<(String, Vec<String>)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AttributeAnalysis>,
    /// The chosen attribute against each requested second attribute.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub correlations: Vec<CorrelationSection>,
    /// Pairwise correlations within the chosen attribute's category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<CorrelationMatrix>,
    /// Side-by-side comparison of explicitly selected entities.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comparison: Vec<Comparison>,
    /// Boundary features no tabular entity mapped onto.
    pub unresolved_features: Vec<String>,
    /// Tabular names with no matching boundary feature.
    pub unresolved_entities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(key: &str, name: &str, parent: Option<&str>) -> Entity {
        Entity {
            key: key.to_string(),
            display_name: name.to_string(),
            parent: parent.map(String::from),
        }
    }

    #[test]
    fn test_relation_thresholds() {
        assert_eq!(Relation::from_coefficient(0.0), Relation::Unrelated);
        assert_eq!(Relation::from_coefficient(-0.19), Relation::Unrelated);
        assert_eq!(Relation::from_coefficient(0.2), Relation::SomewhatRelated);
        assert_eq!(Relation::from_coefficient(-0.7), Relation::SomewhatRelated);
        assert_eq!(Relation::from_coefficient(0.71), Relation::Related);
        assert_eq!(Relation::from_coefficient(-1.0), Relation::Related);
    }

    #[test]
    fn test_row_value_treats_nan_as_missing() {
        let row = RawRow::new("Goa")
            .with_value("a", Some(1.5))
            .with_value("b", None)
            .with_value("c", Some(f64::NAN));

        assert_eq!(row.value("a"), Some(1.5));
        assert_eq!(row.value("b"), None);
        assert_eq!(row.value("c"), None);
        assert_eq!(row.value("missing"), None);
    }

    #[test]
    fn test_scope_admits() {
        let pune = entity("pune", "Pune", Some("maharashtra"));
        let patna = entity("patna", "Patna", Some("bihar"));

        assert!(Scope::all().admits(&pune));
        assert!(Scope::all().within("maharashtra").admits(&pune));
        assert!(!Scope::all().within("maharashtra").admits(&patna));
        assert!(Scope::all().with_keys(["patna"]).admits(&patna));
        assert!(!Scope::all().with_keys(["patna"]).admits(&pune));
        assert!(Scope::all().matching("PAT").admits(&patna));
        assert!(!Scope::all().matching("pat").admits(&pune));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let scope = Scope::all().matching("   ");
        assert!(scope.is_unrestricted());
    }

    #[test]
    fn test_insight_kind_title() {
        assert_eq!(InsightKind::TopPerformer.to_string(), "Top Performer");
        assert_eq!(
            InsightKind::ImprovementOpportunity.title(),
            "Improvement Potential"
        );
    }

    #[test]
    fn test_relation_serializes_kebab_case() {
        let json = serde_json::to_string(&Relation::SomewhatRelated).unwrap();
        assert_eq!(json, "\"somewhat-related\"");
    }
}
