//! Built-in category tables.

use super::CategoryRule;

/// Keyword rules for state-level `_pct` columns, in priority order.
///
/// Order matters: a column takes the first rule that matches, so
/// `Male_Literate_pct` lands in Demographics before Education is tried.
const STATE_RULES: &[(&str, &[&str])] = &[
    ("Demographics", &["male", "female"]),
    (
        "Education & Literacy",
        &["literate", "education", "primary", "secondary", "graduate"],
    ),
    (
        "Employment",
        &["worker", "employment", "cultivator", "agricultural"],
    ),
    ("Social Categories", &["sc", "st", "caste"]),
    (
        "Religion",
        &[
            "hindu", "muslim", "christian", "sikh", "buddhist", "jain", "religion",
        ],
    ),
    (
        "Household Amenities",
        &[
            "household",
            "lpg",
            "electric",
            "internet",
            "computer",
            "bicycle",
            "car",
            "tv",
            "telephone",
        ],
    ),
    ("Water & Sanitation", &["water", "latrine", "drinking"]),
    ("Economic Indicators", &["power_parity", "rs_"]),
    ("Age Groups", &["age_group"]),
];

/// Explicit column lists for the district dataset.
const DISTRICT_TABLE: &[(&str, &[&str])] = &[
    (
        "Demographics",
        &[
            "Male_%",
            "Female_%",
            "Literate_%",
            "Age_Group_0_29_%",
            "Age_Group_30_49_%",
            "Age_Group_50_%",
        ],
    ),
    (
        "Education",
        &[
            "Literate_%",
            "Male_Literate_%",
            "Female_Literate_%",
            "Primary_Education_%",
            "Secondary_Education_%",
            "Higher_Education_%",
            "Graduate_Education_%",
        ],
    ),
    (
        "Employment",
        &[
            "Workers_%",
            "Male_Workers_%",
            "Female_Workers_%",
            "Main_Workers_%",
            "Marginal_Workers_%",
            "Cultivator_Workers_%",
            "Agricultural_Workers_%",
        ],
    ),
    (
        "Infrastructure",
        &[
            "LPG_or_PNG_Households_%",
            "Households_with_Internet_%",
            "Households_with_Computer_%",
            "Households_with_Television_%",
            "Households_with_Telephone_Mobile_Phone_%",
        ],
    ),
    (
        "Sanitation",
        &[
            "Type_of_latrine_facility_Pit_latrine_Households_%",
            "Type_of_latrine_facility_Flush_pour_flush_latrine_connected_to_other_system_Households_%",
            "Having_latrine_facility_within_the_premises_Total_Households_%",
        ],
    ),
    (
        "Water Access",
        &[
            "Main_source_of_drinking_water_Tapwater_Households_%",
            "Location_of_drinking_water_source_Within_the_premises_Households_%",
            "Main_source_of_drinking_water_Handpump_Tubewell_Borewell_Households_%",
        ],
    ),
];

/// The default keyword rule table.
pub fn default_rules() -> Vec<CategoryRule> {
    STATE_RULES
        .iter()
        .map(|(label, keywords)| CategoryRule::new(*label, keywords.iter().copied()))
        .collect()
}

/// The fixed district category table as `(label, columns)` pairs.
pub fn district_table() -> Vec<(String, Vec<String>)> {
    DISTRICT_TABLE
        .iter()
        .map(|(label, columns)| {
            (
                label.to_string(),
                columns.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}
