//! Rankings, correlation, gap analysis, and insight generation.
//!
//! Every query is a pure function of an immutable [`Snapshot`] plus the
//! call's parameters. Missing attributes come back as
//! [`QueryError::AttributeNotFound`]; an engine without a snapshot answers
//! every query with an empty result.

use super::aggregator::{self, mean_by_entity, sorted_entries, KeyedRow, Population};
use super::stats;
use crate::error::QueryError;
use crate::models::{
    CorrelationResult, Direction, Gap, Insight, InsightKind, Level, PopulationSummary,
    RankedEntity, Relation, Scope,
};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Three-way bucket of a normalized ranking value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBand {
    High,
    Middle,
    Low,
}

impl RankBand {
    pub fn from_normalized(normalized: f64) -> Self {
        if normalized > 0.7 {
            RankBand::High
        } else if normalized > 0.4 {
            RankBand::Middle
        } else {
            RankBand::Low
        }
    }
}

/// Five-way bucket used when comparing selected entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonTier {
    Weak,
    BelowAverage,
    Average,
    Good,
    Strong,
}

impl ComparisonTier {
    /// Tier of a value normalized into `[0, 1]`.
    pub fn from_normalized(normalized: f64) -> Self {
        Self::bucket(normalized, [0.8, 0.6, 0.4, 0.2])
    }

    /// Tier of a percentage difference from the mean.
    pub fn from_relative(percent: f64) -> Self {
        Self::bucket(percent, [15.0, 5.0, -5.0, -15.0])
    }

    fn bucket(value: f64, cuts: [f64; 4]) -> Self {
        if value > cuts[0] {
            ComparisonTier::Strong
        } else if value > cuts[1] {
            ComparisonTier::Good
        } else if value > cuts[2] {
            ComparisonTier::Average
        } else if value > cuts[3] {
            ComparisonTier::BelowAverage
        } else {
            ComparisonTier::Weak
        }
    }
}

/// How selected entities are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Raw values, tiered within the compared set.
    #[default]
    Absolute,
    /// Percent difference from the full-population mean.
    Relative,
}

/// One entity in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub key: String,
    pub name: String,
    pub value: f64,
    /// Percent difference from the population mean (relative mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    /// `None` when the difference is undefined (zero mean).
    pub tier: Option<ComparisonTier>,
}

/// Pairwise correlations of several attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub attributes: Vec<String>,
    /// `cells[i][j]` correlates `attributes[i]` with `attributes[j]`.
    pub cells: Vec<Vec<CorrelationResult>>,
}

/// Which fourth insight an attribute gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightContext {
    Education,
    Employment,
    General,
}

impl InsightContext {
    /// Detect from the attribute's category label, then its column name.
    pub fn detect(attribute: &str, category: Option<&str>) -> Self {
        let haystacks = [category.unwrap_or_default(), attribute];

        let mentions = |words: &[&str]| {
            haystacks.iter().any(|h| {
                let h = h.to_lowercase();
                words.iter().any(|w| h.contains(w))
            })
        };

        if mentions(&["literacy", "literate", "education"]) {
            InsightContext::Education
        } else if mentions(&["employment", "worker"]) {
            InsightContext::Employment
        } else {
            InsightContext::General
        }
    }
}

/// Bands for a ranking, normalized against its own min and max.
pub fn band_ranking(ranking: &[RankedEntity]) -> Vec<RankBand> {
    let (min, max) = min_max(ranking.iter().map(|r| r.value));
    ranking
        .iter()
        .map(|r| RankBand::from_normalized(stats::normalize(r.value, min, max)))
        .collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Query interface over an optional snapshot.
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngine<'a> {
    snapshot: Option<&'a Snapshot>,
}

impl<'a> From<&'a Snapshot> for MetricsEngine<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self::new(Some(snapshot))
    }
}

impl<'a> MetricsEngine<'a> {
    /// An engine over `snapshot`; `None` means nothing is loaded yet.
    pub fn new(snapshot: Option<&'a Snapshot>) -> Self {
        Self { snapshot }
    }

    fn level(&self) -> Level {
        self.snapshot.map(Snapshot::level).unwrap_or_default()
    }

    fn name(&self, key: &str) -> String {
        match self.snapshot {
            Some(snapshot) => snapshot.display_name(key).to_string(),
            None => key.to_string(),
        }
    }

    /// The loaded snapshot, provided it has `attribute` as a column.
    fn snapshot_for(&self, attribute: &str) -> Result<Option<&'a Snapshot>, QueryError> {
        match self.snapshot {
            Some(snapshot) if !snapshot.has_column(attribute) => {
                Err(QueryError::AttributeNotFound {
                    attribute: attribute.to_string(),
                })
            }
            snapshot => Ok(snapshot),
        }
    }

    /// Per-entity means of `attribute` over the whole snapshot.
    fn full_population(&self, attribute: &str) -> Result<Population, QueryError> {
        Ok(self
            .snapshot_for(attribute)?
            .map(|snapshot| mean_by_entity(snapshot.rows(), attribute))
            .unwrap_or_default())
    }

    /// Per-entity means of `attribute` restricted to `scope`.
    pub fn population(&self, attribute: &str, scope: &Scope) -> Result<Population, QueryError> {
        let population = self.full_population(attribute)?;
        Ok(self.restrict(population, scope))
    }

    fn restrict(&self, mut population: Population, scope: &Scope) -> Population {
        if scope.is_unrestricted() {
            return population;
        }
        if let Some(snapshot) = self.snapshot {
            population.retain(|key, _| snapshot.entity(key).is_some_and(|e| scope.admits(e)));
        }
        population
    }

    /// Entities sorted by value in `direction`, ties broken by key.
    pub fn rank(
        &self,
        scope: &Scope,
        attribute: &str,
        direction: Direction,
    ) -> Result<Vec<RankedEntity>, QueryError> {
        let population = self.population(attribute, scope)?;

        Ok(sorted_entries(&population, direction)
            .into_iter()
            .map(|(key, value)| RankedEntity {
                name: self.name(&key),
                key,
                value,
            })
            .collect())
    }

    /// Rows of entities admitted by `scope`.
    fn scoped_rows(&self, attribute: &str, scope: &Scope) -> Result<Vec<KeyedRow>, QueryError> {
        let Some(snapshot) = self.snapshot_for(attribute)? else {
            return Ok(Vec::new());
        };
        Ok(snapshot
            .rows()
            .iter()
            .filter(|r| {
                scope.is_unrestricted() || snapshot.entity(&r.key).is_some_and(|e| scope.admits(e))
            })
            .cloned()
            .collect())
    }

    /// Keys of the `n` highest entities in scope.
    pub fn top_n(&self, scope: &Scope, attribute: &str, n: usize) -> Result<Vec<String>, QueryError> {
        let rows = self.scoped_rows(attribute, scope)?;
        Ok(aggregator::top_n(&rows, attribute, n))
    }

    /// Keys of the `n` lowest entities in scope.
    pub fn bottom_n(
        &self,
        scope: &Scope,
        attribute: &str,
        n: usize,
    ) -> Result<Vec<String>, QueryError> {
        let rows = self.scoped_rows(attribute, scope)?;
        Ok(aggregator::bottom_n(&rows, attribute, n))
    }

    /// Pearson correlation of two attributes over entities with both values.
    pub fn correlate(
        &self,
        attribute_a: &str,
        attribute_b: &str,
        scope: &Scope,
    ) -> Result<CorrelationResult, QueryError> {
        let a = self.population(attribute_a, scope)?;
        let b = self.population(attribute_b, scope)?;
        Ok(correlate_populations(&a, &b))
    }

    /// Correlation of every attribute pair, diagonal included.
    pub fn correlation_matrix(
        &self,
        attributes: &[String],
        scope: &Scope,
    ) -> Result<CorrelationMatrix, QueryError> {
        let populations = attributes
            .iter()
            .map(|a| self.population(a, scope))
            .collect::<Result<Vec<_>, _>>()?;

        let cells = populations
            .iter()
            .map(|row| {
                populations
                    .iter()
                    .map(|col| correlate_populations(row, col))
                    .collect()
            })
            .collect();

        Ok(CorrelationMatrix {
            attributes: attributes.to_vec(),
            cells,
        })
    }

    /// Each scoped entity's deviation from the full-population benchmarks.
    ///
    /// Mean, median, and max are computed over every entity with a value,
    /// so a filtered subset is still compared against the whole.
    pub fn gap_analysis(
        &self,
        scope: &Scope,
        attribute: &str,
    ) -> Result<BTreeMap<String, Gap>, QueryError> {
        let full = self.full_population(attribute)?;
        let values: Vec<f64> = full.values().copied().collect();
        let Some(summary) = stats::summarize(&values) else {
            return Ok(BTreeMap::new());
        };

        Ok(self
            .restrict(full, scope)
            .into_iter()
            .map(|(key, value)| {
                let gap = Gap {
                    vs_mean: value - summary.mean,
                    vs_median: value - summary.median,
                    vs_max: value - summary.max,
                };
                (key, gap)
            })
            .collect())
    }

    /// Descriptive statistics of the scoped population.
    pub fn summary(
        &self,
        attribute: &str,
        scope: &Scope,
    ) -> Result<Option<PopulationSummary>, QueryError> {
        let population = self.population(attribute, scope)?;
        let values: Vec<f64> = population.values().copied().collect();
        Ok(stats::summarize(&values))
    }

    /// Scoped entities compared in absolute or relative terms.
    pub fn compare(
        &self,
        scope: &Scope,
        attribute: &str,
        mode: ComparisonMode,
    ) -> Result<Vec<Comparison>, QueryError> {
        let full = self.full_population(attribute)?;
        let national_mean = stats::mean(&full.values().copied().collect::<Vec<_>>());
        let selected = self.restrict(full, scope);
        let (min, max) = min_max(selected.values().copied());

        Ok(sorted_entries(&selected, Direction::Descending)
            .into_iter()
            .map(|(key, value)| {
                let (difference, tier) = match mode {
                    ComparisonMode::Absolute => (
                        None,
                        Some(ComparisonTier::from_normalized(stats::normalize(
                            value, min, max,
                        ))),
                    ),
                    ComparisonMode::Relative => {
                        let difference = national_mean
                            .filter(|m| *m != 0.0)
                            .map(|m| (value - m) / m * 100.0);
                        (difference, difference.map(ComparisonTier::from_relative))
                    }
                };
                Comparison {
                    name: self.name(&key),
                    key,
                    value,
                    difference,
                    tier,
                }
            })
            .collect())
    }

    /// The five fixed insights for one attribute.
    ///
    /// Returns exactly five insights, or none when no snapshot is loaded.
    /// A scope with no values yields [`QueryError::NoData`].
    pub fn insights(&self, attribute: &str, scope: &Scope) -> Result<Vec<Insight>, QueryError> {
        let Some(snapshot) = self.snapshot else {
            return Ok(Vec::new());
        };
        let population = self.population(attribute, scope)?;
        let category = snapshot.taxonomy().category_of(attribute);
        let context = InsightContext::detect(attribute, category);
        debug!("Insight context for '{}': {:?}", attribute, context);

        let insights = self
            .build_insights(&population, context)
            .ok_or_else(|| QueryError::NoData {
                attribute: attribute.to_string(),
            })?;
        Ok(insights.into())
    }

    fn build_insights(&self, population: &Population, context: InsightContext) -> Option<[Insight; 5]> {
        let (top_key, top_value) = sorted_entries(population, Direction::Descending)
            .into_iter()
            .next()?;
        let (bottom_key, bottom_value) = sorted_entries(population, Direction::Ascending)
            .into_iter()
            .next()?;
        let values: Vec<f64> = population.values().copied().collect();
        let summary = stats::summarize(&values)?;

        let plural = self.level().plural();
        let top_name = self.name(&top_key);
        let bottom_name = self.name(&bottom_key);
        let above = values.iter().filter(|v| **v > summary.mean).count();
        let gap = top_value - bottom_value;

        let context_insight = match context {
            InsightContext::Education => {
                let at_or_above = values.iter().filter(|v| **v >= summary.p75).count();
                Insight {
                    kind: InsightKind::EducationFocus,
                    headline: format!("{} {}", at_or_above, plural),
                    value: Some(at_or_above as f64),
                    detail: format!("At or above the 75th percentile ({:.1}%)", summary.p75),
                }
            }
            InsightContext::Employment => Insight {
                kind: InsightKind::EmploymentPattern,
                headline: format!("±{:.1}%", summary.std_dev),
                value: Some(summary.std_dev),
                detail: format!("Standard deviation across {}", plural),
            },
            InsightContext::General => Insight {
                kind: InsightKind::Variability,
                headline: format!("±{:.1}%", summary.std_dev),
                value: Some(summary.std_dev),
                detail: format!("Variation across {}", plural),
            },
        };

        Some([
            Insight {
                kind: InsightKind::TopPerformer,
                headline: top_name.clone(),
                value: Some(top_value),
                detail: format!("{:.1}%", top_value),
            },
            Insight {
                kind: InsightKind::Average,
                headline: format!("{:.1}%", summary.mean),
                value: Some(summary.mean),
                detail: format!("{}/{} {} above average", above, summary.count, plural),
            },
            Insight {
                kind: InsightKind::PerformanceGap,
                headline: format!("{:.1}%", gap),
                value: Some(gap),
                detail: format!("Between {} and {}", top_name, bottom_name),
            },
            context_insight,
            Insight {
                kind: InsightKind::ImprovementOpportunity,
                headline: bottom_name,
                value: Some(bottom_value),
                detail: format!("{:.1}% - Has growth opportunity", bottom_value),
            },
        ])
    }
}

/// Pearson correlation over the keys present in both populations.
pub fn correlate_populations(a: &Population, b: &Population) -> CorrelationResult {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|(key, va)| b.get(key).map(|vb| (*va, *vb)))
        .collect();

    match stats::pearson(&pairs) {
        Some(r) => CorrelationResult {
            coefficient: Some(r),
            relation: Relation::from_coefficient(r),
            pair_count: pairs.len(),
        },
        None => CorrelationResult::insufficient(pairs.len()),
    }
}
