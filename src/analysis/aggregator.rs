//! Per-entity aggregation and extremal selection.
//!
//! This module collapses raw rows into one value per entity for a chosen
//! attribute and picks the highest and lowest entities from the result.

use crate::models::{Direction, RawRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Entity key to aggregated attribute value.
pub type Population = BTreeMap<String, f64>;

/// A raw row tagged with the canonical key of its entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRow {
    pub key: String,
    pub row: RawRow,
}

impl KeyedRow {
    pub fn new(key: impl Into<String>, row: RawRow) -> Self {
        Self {
            key: key.into(),
            row,
        }
    }
}

/// Group the valid values of one attribute by entity key.
///
/// Rows with a null or missing value are skipped.
pub fn group_by_entity(rows: &[KeyedRow], attribute: &str) -> BTreeMap<String, Vec<f64>> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for keyed in rows {
        if let Some(value) = keyed.row.value(attribute) {
            grouped.entry(keyed.key.clone()).or_default().push(value);
        }
    }

    grouped
}

/// Mean of an attribute per entity.
///
/// Entities without a single valid value are omitted rather than zeroed.
pub fn mean_by_entity(rows: &[KeyedRow], attribute: &str) -> Population {
    group_by_entity(rows, attribute)
        .into_iter()
        .map(|(key, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (key, mean)
        })
        .collect()
}

/// Compare two entries by value in `direction`, then by key ascending.
pub fn compare_entries(a: (&str, f64), b: (&str, f64), direction: Direction) -> Ordering {
    let by_value = match direction {
        Direction::Descending => b.1.partial_cmp(&a.1),
        Direction::Ascending => a.1.partial_cmp(&b.1),
    }
    .unwrap_or(Ordering::Equal);

    by_value.then_with(|| a.0.cmp(b.0))
}

/// Population entries sorted by value, ties broken by key.
pub fn sorted_entries(population: &Population, direction: Direction) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = population
        .iter()
        .map(|(key, value)| (key.clone(), *value))
        .collect();

    entries.sort_by(|a, b| compare_entries((&a.0, a.1), (&b.0, b.1), direction));
    entries
}

/// Keys of the `n` entities with the highest mean.
pub fn top_n(rows: &[KeyedRow], attribute: &str, n: usize) -> Vec<String> {
    select(&mean_by_entity(rows, attribute), n, Direction::Descending)
}

/// Keys of the `n` entities with the lowest mean.
pub fn bottom_n(rows: &[KeyedRow], attribute: &str, n: usize) -> Vec<String> {
    select(&mean_by_entity(rows, attribute), n, Direction::Ascending)
}

/// The first `n` keys of a population in `direction`.
///
/// Returns every key when fewer than `n` are available.
pub fn select(population: &Population, n: usize, direction: Direction) -> Vec<String> {
    sorted_entries(population, direction)
        .into_iter()
        .take(n)
        .map(|(key, _)| key)
        .collect()
}

/// The top `n` entries plus the summed value of everyone else.
///
/// The remainder is `None` when the top slice already covers the population.
pub fn top_with_remainder(population: &Population, n: usize) -> (Vec<(String, f64)>, Option<f64>) {
    let mut entries = sorted_entries(population, Direction::Descending);
    let rest = if entries.len() > n {
        entries.split_off(n)
    } else {
        Vec::new()
    };

    let remainder = if rest.is_empty() {
        None
    } else {
        Some(rest.iter().map(|(_, v)| v).sum())
    };

    (entries, remainder)
}

/// Trim a long ranking to its head and tail.
///
/// Rankings no longer than `threshold` are returned unchanged.
pub fn display_slice<T: Clone>(ranking: &[T], head: usize, tail: usize, threshold: usize) -> Vec<T> {
    if ranking.len() <= threshold || head + tail >= ranking.len() {
        return ranking.to_vec();
    }

    let mut slice = ranking[..head].to_vec();
    slice.extend_from_slice(&ranking[ranking.len() - tail..]);
    slice
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn row(key: &str, value: Option<f64>) -> KeyedRow {
        KeyedRow::new(key, RawRow::new(key).with_value("x", value))
    }

    fn population(entries: &[(&str, f64)]) -> Population {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_mean_by_entity_skips_nulls() {
        let rows = vec![
            row("alpha", Some(10.0)),
            row("alpha", Some(20.0)),
            row("alpha", None),
            row("beta", None),
            row("gamma", Some(5.0)),
        ];

        let means = mean_by_entity(&rows, "x");

        assert_eq!(means.get("alpha"), Some(&15.0));
        assert_eq!(means.get("beta"), None);
        assert_eq!(means.get("gamma"), Some(&5.0));
    }

    #[test]
    fn test_missing_attribute_gives_empty_population() {
        let rows = vec![row("alpha", Some(1.0))];
        assert!(mean_by_entity(&rows, "y").is_empty());
    }

    #[test]
    fn test_top_and_bottom_n() {
        let rows = vec![
            row("alpha", Some(10.0)),
            row("beta", Some(20.0)),
            row("gamma", Some(30.0)),
            row("delta", Some(40.0)),
        ];

        assert_eq!(top_n(&rows, "x", 2), vec!["delta", "gamma"]);
        assert_eq!(bottom_n(&rows, "x", 2), vec!["alpha", "beta"]);
        assert_eq!(top_n(&rows, "x", 10).len(), 4);
    }

    #[test]
    fn test_ties_break_by_key() {
        let pop = population(&[("beta", 1.0), ("alpha", 1.0), ("gamma", 2.0)]);

        assert_eq!(select(&pop, 3, Direction::Descending), vec!["gamma", "alpha", "beta"]);
        assert_eq!(select(&pop, 3, Direction::Ascending), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_top_with_remainder() {
        let pop = population(&[("a", 5.0), ("b", 4.0), ("c", 3.0), ("d", 2.0)]);

        let (top, rest) = top_with_remainder(&pop, 2);
        assert_eq!(top, vec![("a".to_string(), 5.0), ("b".to_string(), 4.0)]);
        assert_eq!(rest, Some(5.0));

        let (top, rest) = top_with_remainder(&pop, 7);
        assert_eq!(top.len(), 4);
        assert_eq!(rest, None);
    }

    #[test]
    fn test_display_slice() {
        let ranking: Vec<u32> = (0..25).collect();
        let slice = display_slice(&ranking, 15, 5, 20);

        assert_eq!(slice.len(), 20);
        assert_eq!(slice[14], 14);
        assert_eq!(slice[15], 20);
        assert_eq!(slice[19], 24);

        let short: Vec<u32> = (0..20).collect();
        assert_eq!(display_slice(&short, 15, 5, 20), short);
    }

    proptest! {
        #[test]
        fn top_and_bottom_are_disjoint(
            values in proptest::collection::vec(-1000.0f64..1000.0, 1..40),
            n in 0usize..10,
        ) {
            let pop: Population = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("e{:02}", i), *v))
                .collect();
            prop_assume!(pop.len() > 2 * n);

            let top: BTreeSet<_> = select(&pop, n, Direction::Descending).into_iter().collect();
            let bottom: BTreeSet<_> = select(&pop, n, Direction::Ascending).into_iter().collect();
            prop_assert!(top.is_disjoint(&bottom));
        }
    }
}
