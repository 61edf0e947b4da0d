//! Loading of the tabular and boundary sources.
//!
//! Tables are read with the `csv` crate: one entity column, an optional
//! parent (state) column, and every column whose header contains the
//! attribute marker as a numeric attribute. Boundaries are GeoJSON feature
//! collections parsed with `serde_json`; only each feature's name is
//! interpreted.

use crate::error::{LoadError, Result};
use crate::models::{Dataset, GeoFeature, Level, RawRow};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Feature property keys that may carry the entity name, in lookup order.
pub const NAME_PROPERTIES: &[&str] = &["st_nm", "name", "DISTRICT", "district"];

/// Which CSV columns hold what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub level: Level,
    /// Header of the entity name column.
    pub entity_column: String,
    /// Header of the parent state column, for district tables.
    pub parent_column: Option<String>,
    /// A header containing this text is an attribute column.
    /// An empty marker makes every other column an attribute.
    pub attribute_marker: String,
}

impl TableSchema {
    /// Column layout of the census exports for a level.
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::State => Self {
                level,
                entity_column: "State name".to_string(),
                parent_column: None,
                attribute_marker: "_pct".to_string(),
            },
            Level::District => Self {
                level,
                entity_column: "District name".to_string(),
                parent_column: Some("State name".to_string()),
                attribute_marker: "%".to_string(),
            },
        }
    }

    fn is_attribute(&self, header: &str) -> bool {
        if header == self.entity_column || Some(header) == self.parent_column.as_deref() {
            return false;
        }
        self.attribute_marker.is_empty() || header.contains(&self.attribute_marker)
    }
}

/// Load a CSV table from disk.
pub fn load_table(path: &Path, schema: &TableSchema) -> Result<Dataset> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = std::fs::File::open(path).map_err(|source| LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let dataset = read_table(file, path, schema)?;
    info!(
        "Loaded {}: {} rows, {} attribute columns",
        path.display(),
        dataset.rows.len(),
        dataset.columns.len()
    );
    Ok(dataset)
}

/// Read a CSV table from any reader; `path` is only used in errors.
pub fn read_table<R: Read>(reader: R, path: &Path, schema: &TableSchema) -> Result<Dataset> {
    let csv_error = |e: csv::Error| LoadError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(String::from)
        .collect();

    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| LoadError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            })
    };

    let entity_idx = find(&schema.entity_column)?;
    let parent_idx = schema.parent_column.as_deref().map(find).transpose()?;

    let attributes: Vec<(usize, &String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| schema.is_attribute(h))
        .collect();

    if attributes.is_empty() {
        warn!(
            "No attribute columns matching '{}' in {}",
            schema.attribute_marker,
            path.display()
        );
    }

    let mut rows = Vec::new();
    let mut unparsed = 0usize;

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let mut row = RawRow::new(field(entity_idx).trim());
        if let Some(idx) = parent_idx {
            row = row.with_parent(field(idx).trim());
        }

        for (idx, column) in &attributes {
            let value = parse_value(field(*idx));
            if value.is_none() && !is_null(field(*idx)) {
                unparsed += 1;
            }
            row = row.with_value((*column).clone(), value);
        }
        rows.push(row);
    }

    if unparsed > 0 {
        debug!(
            "{} non-numeric cell(s) in {} read as missing",
            unparsed,
            path.display()
        );
    }

    Ok(Dataset {
        level: schema.level,
        columns: attributes.into_iter().map(|(_, c)| c.clone()).collect(),
        rows,
    })
}

fn is_null(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan")
}

/// Parse a numeric cell; blanks and non-numbers are missing values.
fn parse_value(cell: &str) -> Option<f64> {
    if is_null(cell) {
        return None;
    }
    cell.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    geometry: serde_json::Value,
}

impl RawFeature {
    fn name(&self) -> Option<&str> {
        NAME_PROPERTIES
            .iter()
            .filter_map(|key| self.properties.get(*key))
            .filter_map(serde_json::Value::as_str)
            .find(|name| !name.trim().is_empty())
    }
}

/// Load a GeoJSON feature collection from disk.
pub fn load_features(path: &Path) -> Result<Vec<GeoFeature>> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let features = parse_features(&content, path)?;
    info!("Loaded {} boundary features from {}", features.len(), path.display());
    Ok(features)
}

/// Parse GeoJSON text into named features.
///
/// Features without a usable name property are skipped.
pub fn parse_features(content: &str, path: &Path) -> Result<Vec<GeoFeature>> {
    let collection: FeatureCollection =
        serde_json::from_str(content).map_err(|e| LoadError::GeoJsonParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let total = collection.features.len();
    let features: Vec<GeoFeature> = collection
        .features
        .into_iter()
        .filter_map(|raw| {
            let name = raw.name()?.trim().to_string();
            Some(GeoFeature {
                name,
                geometry: raw.geometry,
            })
        })
        .collect();

    if features.len() < total {
        warn!(
            "{} feature(s) in {} have no name property",
            total - features.len(),
            path.display()
        );
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const STATE_CSV: &str = "\
State name,District code,Population,Male_Literate_pct,Worker_pct
WEST BENGAL,1,100,70.5,40
ORISSA,2,200,,35.5
GOA,3,300,n/a,NA
";

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_state_table() {
        let file = write_temp(STATE_CSV);
        let dataset = load_table(file.path(), &TableSchema::for_level(Level::State)).unwrap();

        assert_eq!(dataset.level, Level::State);
        assert_eq!(dataset.columns, vec!["Male_Literate_pct", "Worker_pct"]);
        assert_eq!(dataset.rows.len(), 3);
        assert_eq!(dataset.rows[0].entity, "WEST BENGAL");
        assert_eq!(dataset.rows[0].value("Male_Literate_pct"), Some(70.5));
        assert_eq!(dataset.rows[1].value("Male_Literate_pct"), None);
        assert_eq!(dataset.rows[2].value("Male_Literate_pct"), None);
        assert_eq!(dataset.rows[2].value("Worker_pct"), None);
        assert!(!dataset.rows[0].values.contains_key("Population"));
    }

    #[test]
    fn test_read_district_table_with_parent() {
        let csv = "State name,District name,Literate_%,Workers_%\n\
                   MAHARASHTRA,Pune,86.1,45%\n";
        let schema = TableSchema::for_level(Level::District);
        let dataset = read_table(csv.as_bytes(), Path::new("districts.csv"), &schema).unwrap();

        let row = &dataset.rows[0];
        assert_eq!(row.entity, "Pune");
        assert_eq!(row.parent.as_deref(), Some("MAHARASHTRA"));
        assert_eq!(row.value("Workers_%"), Some(45.0));
        assert_eq!(dataset.columns, vec!["Literate_%", "Workers_%"]);
    }

    #[test]
    fn test_missing_entity_column() {
        let csv = "Name,Worker_pct\nGoa,1\n";
        let result = read_table(
            csv.as_bytes(),
            Path::new("bad.csv"),
            &TableSchema::for_level(Level::State),
        );

        assert!(matches!(
            result,
            Err(LoadError::MissingColumn { ref column, .. }) if column == "State name"
        ));
    }

    #[test]
    fn test_empty_marker_takes_every_column() {
        let csv = "State name,a,b\nGoa,1,2\n";
        let schema = TableSchema {
            attribute_marker: String::new(),
            ..TableSchema::for_level(Level::State)
        };
        let dataset = read_table(csv.as_bytes(), Path::new("t.csv"), &schema).unwrap();
        assert_eq!(dataset.columns, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");

        assert!(matches!(
            load_table(&path, &TableSchema::for_level(Level::State)),
            Err(LoadError::FileNotFound { .. })
        ));
        assert!(matches!(
            load_features(&path),
            Err(LoadError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_features() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"st_nm": "West Bengal"}, "geometry": {"type": "Point", "coordinates": [88.3, 22.5]}},
                {"type": "Feature", "properties": {"name": "Odisha"}, "geometry": null},
                {"type": "Feature", "properties": {"DISTRICT": "Pune"}},
                {"type": "Feature", "properties": {"id": 7}}
            ]
        }"#;

        let features = parse_features(geojson, Path::new("india.json")).unwrap();
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["West Bengal", "Odisha", "Pune"]);
        assert_eq!(features[0].geometry["type"], "Point");
    }

    #[test]
    fn test_parse_features_invalid_json() {
        let result = parse_features("{not json", Path::new("broken.json"));
        assert!(matches!(result, Err(LoadError::GeoJsonParse { .. })));
    }

    #[test]
    fn test_load_features_from_disk() {
        let file = write_temp(r#"{"features": [{"properties": {"name": "Goa"}}]}"#);
        let features = load_features(file.path()).unwrap();
        assert_eq!(features, vec![GeoFeature::named("Goa")]);
    }
}
