//! Short human-readable labels for attribute columns.

use crate::models::Level;

const STATE_LABELS: &[(&str, &str)] = &[
    ("Male_Literate", "Male Literacy"),
    ("Female_Literate", "Female Literacy"),
    ("Male_Workers", "Male Employment"),
    ("Female_Workers", "Female Employment"),
    ("Rural_Households", "Rural Areas"),
    ("Urban_Households", "Urban Areas"),
    ("LPG_or_PNG_Households", "LPG/PNG Access"),
    ("Housholds_with_Electric_Lighting", "Electricity"),
    ("Households_with_Internet", "Internet"),
    ("Households_with_Computer", "Computer"),
    ("Households_with_Scooter_Motorcycle_Moped", "Scooter/Motorcycle"),
    ("Power_Parity_Less_than_Rs_45000", "<₹45k Income"),
    ("Power_Parity_Above_Rs_545000", ">₹545k Income"),
];

const DISTRICT_LABELS: &[(&str, &str)] = &[
    ("Male", "Male Population"),
    ("Female", "Female Population"),
    ("Literate", "Literacy Rate"),
    ("Male Literate", "Male Literacy"),
    ("Female Literate", "Female Literacy"),
    ("Workers", "Employment Rate"),
    ("Male Workers", "Male Employment"),
    ("Female Workers", "Female Employment"),
    ("Primary Education", "Primary Education"),
    ("Secondary Education", "Secondary Education"),
    ("Higher Education", "Higher Education"),
    ("Graduate Education", "Graduate Education"),
    ("LPG or PNG Households", "Clean Cooking Fuel"),
    ("Internet", "Internet Access"),
    ("Computer", "Computer Access"),
    ("Television", "Television Access"),
    ("Telephone Mobile Phone", "Phone Access"),
    ("Tapwater Households", "Tap Water Access"),
    ("Within the premises Households", "Water Within Premises"),
    (
        "Flush pour flush latrine connected to other system Households",
        "Flush Toilets",
    ),
    (
        "Having latrine facility within the premises Total Households",
        "Toilet Facilities",
    ),
];

const DISTRICT_PREFIXES: &[&str] = &[
    "Households with ",
    "Main source of drinking water ",
    "Location of drinking water source ",
    "Type of latrine facility ",
];

/// Longest district label before it is cut with an ellipsis.
const MAX_DISTRICT_LABEL: usize = 25;

fn lookup(table: &[(&str, &str)], key: &str) -> Option<String> {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

/// Short label for a column at the given level.
pub fn short_label(column: &str, level: Level) -> String {
    match level {
        Level::State => state_label(column),
        Level::District => district_label(column),
    }
}

/// `Male_Literate_pct` becomes `Male Literacy`; unknown names are title-cased.
pub fn state_label(column: &str) -> String {
    let clean = column.replace("_pct", "").replace('%', "");
    let clean = clean.trim();

    lookup(STATE_LABELS, clean).unwrap_or_else(|| title_case(&clean.replace('_', " ")))
}

pub fn district_label(column: &str) -> String {
    if column.is_empty() {
        return String::new();
    }

    let mut clean = column.replace("_%", "").replace('_', " ");
    for prefix in DISTRICT_PREFIXES {
        clean = clean.replace(prefix, "");
    }

    lookup(DISTRICT_LABELS, &clean).unwrap_or_else(|| {
        if clean.chars().count() > MAX_DISTRICT_LABEL {
            let cut: String = clean.chars().take(MAX_DISTRICT_LABEL).collect();
            format!("{}...", cut)
        } else {
            clean
        }
    })
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
