//! The immutable dataset every engine query reads from.
//!
//! A [`Snapshot`] is built once from the loaded rows and boundary features:
//! names are resolved to canonical keys, entities are derived, and the
//! attribute taxonomy is computed. It is never mutated afterwards. A reload
//! builds a fresh snapshot and swaps it into a [`SnapshotStore`].

use crate::analysis::KeyedRow;
use crate::error::SnapshotError;
use crate::models::{Dataset, Entity, GeoFeature, Level, RawRow};
use crate::resolver::{canonicalize, NameResolver, Resolution, ResolutionReport};
use crate::taxonomy::{categorize, CategoryRule, Taxonomy};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// How attribute columns are grouped into categories.
#[derive(Debug, Clone)]
pub enum TaxonomySource {
    /// Ordered keyword rules, first match wins.
    Rules(Vec<CategoryRule>),
    /// Explicit `(label, columns)` lists filtered to available columns.
    Fixed(Vec<(String, Vec<String>)>),
}

impl TaxonomySource {
    fn build(&self, columns: &[String]) -> Taxonomy {
        match self {
            TaxonomySource::Rules(rules) => categorize(columns, rules),
            TaxonomySource::Fixed(table) => Taxonomy::from_fixed(table, columns),
        }
    }
}

/// A loaded, validated, read-only dataset.
#[derive(Debug, Clone)]
pub struct Snapshot {
    level: Level,
    columns: Vec<String>,
    rows: Vec<KeyedRow>,
    features: Vec<GeoFeature>,
    entities: BTreeMap<String, Entity>,
    taxonomy: Taxonomy,
    resolver: NameResolver,
    resolution: ResolutionReport,
    skipped_rows: usize,
}

impl Snapshot {
    /// Validate the dataset and derive entities, keys, and the taxonomy.
    ///
    /// Fails only when the dataset is malformed: duplicate columns, values
    /// for undeclared columns, or infinite values.
    pub fn build(
        dataset: Dataset,
        features: Vec<GeoFeature>,
        taxonomy: &TaxonomySource,
        resolver: NameResolver,
    ) -> Result<Self, SnapshotError> {
        validate(&dataset)?;

        let Dataset {
            level,
            columns,
            rows,
        } = dataset;

        let available: BTreeSet<String> =
            features.iter().map(|f| canonicalize(&f.name)).collect();
        let feature_names: BTreeMap<String, &str> = features
            .iter()
            .map(|f| (canonicalize(&f.name), f.name.as_str()))
            .collect();

        let names: Vec<&str> = rows.iter().map(|r| r.entity.as_str()).collect();
        let resolution = resolver.resolve_all(&names, &features);
        if !resolution.unresolved.is_empty() && !features.is_empty() {
            warn!(
                "{} entity name(s) have no boundary feature: {}",
                resolution.unresolved.len(),
                resolution.unresolved.join(", ")
            );
        }

        let colliding = colliding_districts(level, &rows);

        let mut keyed = Vec::with_capacity(rows.len());
        let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
        let mut skipped_rows = 0;

        for row in rows {
            let (base, display) = match resolver.resolve_in(&row.entity, &available) {
                Resolution::Resolved { key, .. } => {
                    let display = feature_names
                        .get(&key)
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| row.entity.trim().to_string());
                    (key, display)
                }
                Resolution::Unresolved { .. } => {
                    (canonicalize(&row.entity), row.entity.trim().to_string())
                }
            };

            if base.is_empty() {
                skipped_rows += 1;
                continue;
            }

            let parent = match level {
                Level::District => row
                    .parent
                    .as_deref()
                    .map(|p| parent_key(&resolver, p))
                    .filter(|p| !p.is_empty()),
                Level::State => None,
            };

            let key = match parent {
                Some(ref parent) if colliding.contains(&base) => format!("{}.{}", parent, base),
                _ => base,
            };

            entities.entry(key.clone()).or_insert_with(|| Entity {
                key: key.clone(),
                display_name: display,
                parent,
            });
            keyed.push(KeyedRow::new(key, row));
        }

        if skipped_rows > 0 {
            warn!("Skipped {} row(s) with an empty entity name", skipped_rows);
        }

        let taxonomy = taxonomy.build(&columns);
        info!(
            "Snapshot built: {} rows, {} entities, {} columns, {} categories",
            keyed.len(),
            entities.len(),
            columns.len(),
            taxonomy.categories().len()
        );

        Ok(Self {
            level,
            columns,
            rows: keyed,
            features,
            entities,
            taxonomy,
            resolver,
            resolution,
            skipped_rows,
        })
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, attribute: &str) -> bool {
        self.columns.iter().any(|c| c == attribute)
    }

    pub fn rows(&self) -> &[KeyedRow] {
        &self.rows
    }

    pub fn features(&self) -> &[GeoFeature] {
        &self.features
    }

    pub fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    pub fn entity(&self, key: &str) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Display name for a key, falling back to the key itself.
    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.entities
            .get(key)
            .map(|e| e.display_name.as_str())
            .unwrap_or(key)
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn resolution(&self) -> &ResolutionReport {
        &self.resolution
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Canonical key of a parent state present in the snapshot.
    ///
    /// The override target is tried first, then the name's own canonical key.
    pub fn state_key(&self, name: &str) -> Option<String> {
        let parents: BTreeSet<&str> = self
            .entities
            .values()
            .filter_map(|e| e.parent.as_deref())
            .collect();
        let parents: Vec<&str> = parents.into_iter().collect();
        self.resolver.resolve(name, &parents).key().map(String::from)
    }

    /// Canonical key of an entity present in the snapshot.
    ///
    /// An override only applies when its target is an entity; otherwise the
    /// name's own canonical key is tried.
    pub fn entity_key(&self, name: &str) -> Option<String> {
        let keys: BTreeSet<String> = self.entities.keys().cloned().collect();
        self.resolver
            .resolve_in(name, &keys)
            .key()
            .map(String::from)
    }
}

/// Parent names go through the override table so renamed states still group.
fn parent_key(resolver: &NameResolver, name: &str) -> String {
    resolver
        .overrides()
        .lookup(name)
        .map(String::from)
        .unwrap_or_else(|| canonicalize(name))
}

/// District names that occur under more than one parent state.
fn colliding_districts(level: Level, rows: &[RawRow]) -> BTreeSet<String> {
    if level != Level::District {
        return BTreeSet::new();
    }

    let mut parents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        if let Some(ref parent) = row.parent {
            parents
                .entry(canonicalize(&row.entity))
                .or_default()
                .insert(canonicalize(parent));
        }
    }

    let colliding: BTreeSet<String> = parents
        .into_iter()
        .filter(|(_, p)| p.len() > 1)
        .map(|(district, _)| district)
        .collect();
    if !colliding.is_empty() {
        debug!(
            "Qualifying {} district name(s) shared by several states",
            colliding.len()
        );
    }
    colliding
}

fn validate(dataset: &Dataset) -> Result<(), SnapshotError> {
    let mut declared: BTreeSet<&str> = BTreeSet::new();
    for column in &dataset.columns {
        if !declared.insert(column.as_str()) {
            return Err(SnapshotError::DuplicateColumn {
                column: column.clone(),
            });
        }
    }

    for (idx, row) in dataset.rows.iter().enumerate() {
        for (column, value) in &row.values {
            if !declared.contains(column.as_str()) {
                return Err(SnapshotError::UndeclaredColumn {
                    row: idx,
                    entity: row.entity.clone(),
                    column: column.clone(),
                });
            }
            if value.is_some_and(f64::is_infinite) {
                return Err(SnapshotError::NonFiniteValue {
                    row: idx,
                    entity: row.entity.clone(),
                    column: column.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Shared handle to the current snapshot.
///
/// Readers take an `Arc` and keep using it even if a reload swaps in a
/// newer snapshot meanwhile. An empty store means no data has been loaded.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot in use, or `None` before the first load.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: Snapshot) -> Option<Arc<Snapshot>> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.replace(Arc::new(snapshot))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::OverrideTable;
    use crate::taxonomy::default_rules;

    fn state_dataset() -> Dataset {
        Dataset {
            level: Level::State,
            columns: vec!["Total_Literate_pct".to_string(), "Worker_pct".to_string()],
            rows: vec![
                RawRow::new("WEST BENGAL").with_value("Total_Literate_pct", Some(70.0)),
                RawRow::new("ORISSA").with_value("Total_Literate_pct", Some(60.0)),
                RawRow::new("ATLANTIS").with_value("Worker_pct", Some(1.0)),
                RawRow::new("  ").with_value("Worker_pct", Some(2.0)),
            ],
        }
    }

    fn build(dataset: Dataset, features: &[&str]) -> Result<Snapshot, SnapshotError> {
        Snapshot::build(
            dataset,
            features.iter().map(|n| GeoFeature::named(*n)).collect(),
            &TaxonomySource::Rules(default_rules()),
            NameResolver::new(OverrideTable::defaults()),
        )
    }

    #[test]
    fn test_build_resolves_and_derives_entities() {
        let snapshot = build(state_dataset(), &["West Bengal", "Odisha", "Goa"]).unwrap();

        assert!(snapshot.entity("west_bengal").is_some());
        assert_eq!(snapshot.display_name("odisha"), "Odisha");
        // Unresolved names still aggregate under their own canonical key.
        assert_eq!(snapshot.display_name("atlantis"), "ATLANTIS");
        assert_eq!(snapshot.skipped_rows(), 1);
        assert_eq!(snapshot.rows().len(), 3);
        assert_eq!(snapshot.resolution().unresolved, vec!["ATLANTIS".to_string()]);
        assert_eq!(snapshot.resolution().unresolved_features(), vec!["Goa".to_string()]);
        assert_eq!(
            snapshot.taxonomy().category_of("Worker_pct"),
            Some("Employment")
        );
    }

    #[test]
    fn test_build_rejects_duplicate_columns() {
        let mut dataset = state_dataset();
        dataset.columns.push("Worker_pct".to_string());

        assert_eq!(
            build(dataset, &[]).unwrap_err(),
            SnapshotError::DuplicateColumn {
                column: "Worker_pct".to_string()
            }
        );
    }

    #[test]
    fn test_build_rejects_undeclared_and_infinite_values() {
        let mut dataset = state_dataset();
        dataset.rows.push(RawRow::new("Goa").with_value("Unknown", Some(1.0)));
        assert!(matches!(
            build(dataset, &[]),
            Err(SnapshotError::UndeclaredColumn { .. })
        ));

        let mut dataset = state_dataset();
        dataset
            .rows
            .push(RawRow::new("Goa").with_value("Worker_pct", Some(f64::INFINITY)));
        assert!(matches!(
            build(dataset, &[]),
            Err(SnapshotError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_district_keys_and_collisions() {
        let dataset = Dataset {
            level: Level::District,
            columns: vec!["Literate_%".to_string()],
            rows: vec![
                RawRow::new("Aurangabad")
                    .with_parent("BIHAR")
                    .with_value("Literate_%", Some(60.0)),
                RawRow::new("Aurangabad")
                    .with_parent("MAHARASHTRA")
                    .with_value("Literate_%", Some(70.0)),
                RawRow::new("Pune")
                    .with_parent("MAHARASHTRA")
                    .with_value("Literate_%", Some(80.0)),
            ],
        };
        let snapshot = build(dataset, &[]).unwrap();

        assert!(snapshot.entity("bihar.aurangabad").is_some());
        assert!(snapshot.entity("maharashtra.aurangabad").is_some());
        assert_eq!(
            snapshot.entity("pune").and_then(|e| e.parent.as_deref()),
            Some("maharashtra")
        );
        assert_eq!(snapshot.state_key("Maharashtra"), Some("maharashtra".to_string()));
        assert_eq!(snapshot.state_key("Kerala"), None);
    }

    #[test]
    fn test_entity_key_falls_back_when_override_target_is_absent() {
        let dataset = Dataset {
            level: Level::State,
            columns: vec!["Worker_pct".to_string()],
            rows: vec![
                RawRow::new("ORISSA").with_value("Worker_pct", Some(40.0)),
                RawRow::new("UTTARAKHAND").with_value("Worker_pct", Some(35.0)),
            ],
        };

        // The boundary file still uses the old spelling.
        let snapshot = build(dataset.clone(), &["Orissa"]).unwrap();
        assert_eq!(snapshot.entity_key("ORISSA"), Some("orissa".to_string()));
        assert_eq!(snapshot.entity_key("Uttarakhand"), Some("uttarakhand".to_string()));

        let snapshot = build(dataset.clone(), &[]).unwrap();
        assert_eq!(snapshot.entity_key("Orissa"), Some("orissa".to_string()));

        let snapshot = build(dataset, &["Odisha"]).unwrap();
        assert_eq!(snapshot.entity_key("ORISSA"), Some("odisha".to_string()));
        assert_eq!(snapshot.entity_key("Odisha"), Some("odisha".to_string()));
        assert_eq!(snapshot.entity_key("Atlantis"), None);
    }

    #[test]
    fn test_state_key_accepts_old_and_new_spellings() {
        let dataset = Dataset {
            level: Level::District,
            columns: vec!["Literate_%".to_string()],
            rows: vec![RawRow::new("Dehradun")
                .with_parent("UTTARANCHAL")
                .with_value("Literate_%", Some(84.0))],
        };
        let snapshot = build(dataset, &[]).unwrap();

        assert_eq!(snapshot.state_key("UTTARANCHAL"), Some("uttarakhand".to_string()));
        assert_eq!(snapshot.state_key("Uttarakhand"), Some("uttarakhand".to_string()));
    }

    #[test]
    fn test_store_swaps_atomically() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());

        let first = build(state_dataset(), &[]).unwrap();
        assert!(store.replace(first).is_none());
        let reader = store.current().unwrap();

        let second = build(state_dataset(), &["West Bengal"]).unwrap();
        let previous = store.replace(second).unwrap();

        // A reader holding the old snapshot is unaffected by the swap.
        assert!(Arc::ptr_eq(&reader, &previous));
        assert_eq!(store.current().unwrap().features().len(), 1);
    }
}
