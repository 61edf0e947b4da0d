//! Attribute column classification.
//!
//! Columns are sorted into categories by an ordered keyword rule table.
//! The first rule with a keyword contained in the column name wins, and
//! columns matching no rule are left out of the taxonomy entirely.

pub mod rules;

pub use rules::{default_rules, district_table};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One `(label, keywords)` entry of a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new<I, S>(label: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-insensitive substring match against any keyword.
    ///
    /// Blank keywords never match.
    pub fn matches(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.keywords.iter().any(|keyword| {
            let keyword = keyword.trim().to_lowercase();
            !keyword.is_empty() && column.contains(&keyword)
        })
    }
}

/// A labelled, non-empty, ordered group of attribute columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub columns: Vec<String>,
}

/// Category label to ordered columns, in rule-table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Columns of one category, if it exists.
    pub fn columns(&self, label: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.columns.as_slice())
    }

    /// Label of the category a column was assigned to.
    pub fn category_of(&self, column: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.columns.iter().any(|col| col == column))
            .map(|c| c.label.as_str())
    }

    /// `(label, columns)` pairs, for serialization into reports.
    pub fn to_pairs(&self) -> Vec<(String, Vec<String>)> {
        self.categories
            .iter()
            .map(|c| (c.label.clone(), c.columns.clone()))
            .collect()
    }

    /// Builds a taxonomy from explicit column lists, keeping only columns
    /// present in `available`.
    ///
    /// A column listed under several labels stays with the first one.
    pub fn from_fixed<S: AsRef<str>>(table: &[(String, Vec<String>)], available: &[S]) -> Self {
        let available: BTreeSet<&str> = available.iter().map(AsRef::as_ref).collect();
        let mut claimed: BTreeSet<&str> = BTreeSet::new();
        let mut categories = Vec::new();

        for (label, columns) in table {
            let kept: Vec<String> = columns
                .iter()
                .filter(|c| available.contains(c.as_str()))
                .filter(|c| claimed.insert(c.as_str()))
                .cloned()
                .collect();
            if !kept.is_empty() {
                categories.push(Category {
                    label: label.clone(),
                    columns: kept,
                });
            }
        }

        Self { categories }
    }
}

/// Partitions columns into categories using an ordered rule table.
pub fn categorize<S: AsRef<str>>(columns: &[S], rules: &[CategoryRule]) -> Taxonomy {
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); rules.len()];
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for column in columns {
        let column = column.as_ref();
        if !seen.insert(column) {
            continue;
        }
        match rules.iter().position(|rule| rule.matches(column)) {
            Some(idx) => buckets[idx].push(column.to_string()),
            None => debug!("Column '{}' matched no category rule", column),
        }
    }

    let categories = rules
        .iter()
        .zip(buckets)
        .filter(|(_, columns)| !columns.is_empty())
        .map(|(rule, columns)| Category {
            label: rule.label.clone(),
            columns,
        })
        .collect();

    Taxonomy { categories }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules() -> Vec<CategoryRule> {
        vec![
            CategoryRule::new("Household", ["household"]),
            CategoryRule::new("Water", ["water"]),
            CategoryRule::new("Empty", Vec::<String>::new()),
        ]
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let columns = ["Households_Drinking_Water_pct", "Tap_Water_pct", "Age_pct"];
        let taxonomy = categorize(&columns, &rules());

        assert_eq!(
            taxonomy.columns("Household"),
            Some(&["Households_Drinking_Water_pct".to_string()][..])
        );
        assert_eq!(
            taxonomy.columns("Water"),
            Some(&["Tap_Water_pct".to_string()][..])
        );
        assert_eq!(taxonomy.category_of("Age_pct"), None);
    }

    #[test]
    fn test_empty_categories_dropped() {
        let taxonomy = categorize(&["Tap_Water_pct"], &rules());
        assert_eq!(taxonomy.categories().len(), 1);
        assert_eq!(taxonomy.columns("Household"), None);
        assert_eq!(taxonomy.columns("Empty"), None);
    }

    #[test]
    fn test_empty_inputs_give_empty_taxonomy() {
        let none: [&str; 0] = [];
        assert!(categorize(&none, &rules()).is_empty());
        assert!(categorize(&["Tap_Water_pct"], &[]).is_empty());
    }

    #[test]
    fn test_blank_keyword_matches_nothing() {
        let rule = CategoryRule::new("Blank", ["", "  "]);
        assert!(!rule.matches("anything"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let rule = CategoryRule::new("Literacy", ["LITERATE"]);
        assert!(rule.matches("Total_literate_pct"));
    }

    #[test]
    fn test_default_rules_on_census_columns() {
        let columns = [
            "Male_Literate_pct",
            "Total_Literate_pct",
            "Worker_pct",
            "Hindus_pct",
            "LPG_or_PNG_Households_pct",
            "Power_Parity_Less_than_Rs_45000_pct",
            "Age_Group_0_29_pct",
            "Unclassified",
        ];
        let taxonomy = categorize(&columns, &default_rules());

        assert_eq!(taxonomy.category_of("Male_Literate_pct"), Some("Demographics"));
        assert_eq!(
            taxonomy.category_of("Total_Literate_pct"),
            Some("Education & Literacy")
        );
        assert_eq!(taxonomy.category_of("Worker_pct"), Some("Employment"));
        assert_eq!(taxonomy.category_of("Hindus_pct"), Some("Religion"));
        assert_eq!(
            taxonomy.category_of("LPG_or_PNG_Households_pct"),
            Some("Household Amenities")
        );
        assert_eq!(taxonomy.category_of("Unclassified"), None);
    }

    #[test]
    fn test_from_fixed_filters_and_dedupes() {
        let table = district_table();
        let available = ["Literate_%", "Male_Literate_%", "Workers_%", "Other_%"];
        let taxonomy = Taxonomy::from_fixed(&table, &available);

        assert_eq!(
            taxonomy.columns("Demographics"),
            Some(&["Literate_%".to_string()][..])
        );
        assert_eq!(
            taxonomy.columns("Education"),
            Some(&["Male_Literate_%".to_string()][..])
        );
        assert_eq!(
            taxonomy.columns("Employment"),
            Some(&["Workers_%".to_string()][..])
        );
        assert_eq!(taxonomy.columns("Sanitation"), None);
        assert_eq!(taxonomy.category_of("Other_%"), None);
    }

    proptest! {
        #[test]
        fn categorize_is_idempotent_and_exclusive(
            columns in proptest::collection::vec("[A-Za-z_]{1,16}", 0..24),
        ) {
            let rules = default_rules();
            let first = categorize(&columns, &rules);
            let second = categorize(&columns, &rules);
            prop_assert_eq!(&first, &second);

            let mut seen = BTreeSet::new();
            for category in first.categories() {
                prop_assert!(!category.columns.is_empty());
                for column in &category.columns {
                    prop_assert!(seen.insert(column.clone()));
                }
            }
        }
    }
}
