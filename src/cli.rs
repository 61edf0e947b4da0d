//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::ComparisonMode;
use crate::models::{Direction, Level};
use clap::Parser;
use std::path::PathBuf;

/// CensusLens - census indicator analytics
///
/// Classify census attribute columns, reconcile entity names with a
/// boundary file, and report rankings, correlations and insights for
/// one attribute.
///
/// Examples:
///   censuslens --data states.csv --list-attributes
///   censuslens --data states.csv --geo india.json --attribute Male_Literate_pct
///   censuslens --data districts.csv --level district --state Maharashtra --attribute Literate_%
///   censuslens --data states.csv --attribute Worker_pct --compare Male_Literate_pct --format json
///   censuslens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file with one row per state or district
    #[arg(
        short,
        long,
        value_name = "FILE",
        required_unless_present = "init_config",
        env = "CENSUSLENS_DATA"
    )]
    pub data: Option<PathBuf>,

    /// GeoJSON feature collection with the matching boundaries
    #[arg(short, long, value_name = "FILE", env = "CENSUSLENS_GEO")]
    pub geo: Option<PathBuf>,

    /// Granularity of the data file
    #[arg(short, long, default_value = "state", value_name = "LEVEL")]
    pub level: LevelArg,

    /// Attribute column to analyze
    #[arg(short, long, value_name = "COLUMN")]
    pub attribute: Option<String>,

    /// Attribute columns to correlate with --attribute (comma-separated)
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub compare: Option<Vec<String>>,

    /// Add the correlation matrix of the attribute's category
    #[arg(long)]
    pub matrix: bool,

    /// Only districts of this state (district level)
    #[arg(short, long, value_name = "NAME")]
    pub state: Option<String>,

    /// Only these entities, compared side by side (comma-separated)
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub entities: Option<Vec<String>>,

    /// Only entities whose name contains this text
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    /// Ranking order
    #[arg(long, default_value = "desc", value_name = "ORDER")]
    pub direction: DirectionArg,

    /// How --entities are compared
    #[arg(long, default_value = "absolute", value_name = "MODE")]
    pub comparison: ComparisonArg,

    /// Number of highest and lowest entities to list
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,

    /// Leave the per-entity gap table out of the report
    #[arg(long)]
    pub no_gaps: bool,

    /// Output format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting, or censuslens_report.md.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .censuslens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the attribute categories of the data file and exit
    #[arg(long)]
    pub list_attributes: bool,

    /// Generate a default .censuslens.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LevelArg {
    #[default]
    State,
    District,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::State => Level::State,
            LevelArg::District => Level::District,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DirectionArg {
    /// Highest first
    #[default]
    Desc,
    /// Lowest first
    Asc,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Desc => Direction::Descending,
            DirectionArg::Asc => Direction::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ComparisonArg {
    /// Raw values tiered within the selection
    #[default]
    Absolute,
    /// Percent difference from the national mean
    Relative,
}

impl From<ComparisonArg> for ComparisonMode {
    fn from(arg: ComparisonArg) -> Self {
        match arg {
            ComparisonArg::Absolute => ComparisonMode::Absolute,
            ComparisonArg::Relative => ComparisonMode::Relative,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
        }

        if let Some(ref geo) = self.geo {
            if !geo.is_file() {
                return Err(format!("GeoJSON file does not exist: {}", geo.display()));
            }
        }

        if self.state.is_some() && self.level == LevelArg::State {
            return Err("--state requires --level district".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.attribute.is_none() && (self.compare.is_some() || self.matrix) {
            return Err("--compare and --matrix require --attribute".to_string());
        }

        if let Some(ref entities) = self.entities {
            if entities.iter().all(|e| e.trim().is_empty()) {
                return Err("--entities needs at least one name".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_args(data: &NamedTempFile) -> Args {
        Args::parse_from([
            "censuslens",
            "--data",
            data.path().to_str().unwrap(),
        ])
    }

    fn data_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "State name,Worker_pct").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let file = data_file();
        let args = make_args(&file);

        assert_eq!(args.level, LevelArg::State);
        assert_eq!(args.direction, DirectionArg::Desc);
        assert_eq!(args.format, OutputFormat::Markdown);
        assert_eq!(args.top, None);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_lists_and_enums() {
        let args = Args::parse_from([
            "censuslens",
            "--data",
            "d.csv",
            "--level",
            "district",
            "--entities",
            "Pune,Nagpur",
            "--compare",
            "a,b",
            "--direction",
            "asc",
            "--comparison",
            "relative",
            "--format",
            "json",
        ]);

        assert_eq!(Level::from(args.level), Level::District);
        assert_eq!(Direction::from(args.direction), Direction::Ascending);
        assert_eq!(
            ComparisonMode::from(args.comparison),
            ComparisonMode::Relative
        );
        assert_eq!(args.entities, Some(vec!["Pune".to_string(), "Nagpur".to_string()]));
        assert_eq!(args.compare, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_validation_missing_data_file() {
        let args = Args::parse_from(["censuslens", "--data", "/nonexistent/data.csv"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_state_needs_district_level() {
        let file = data_file();
        let mut args = make_args(&file);
        args.state = Some("Goa".to_string());
        assert!(args.validate().is_err());

        args.level = LevelArg::District;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_compare_needs_attribute() {
        let file = data_file();
        let mut args = make_args(&file);
        args.matrix = true;
        assert!(args.validate().is_err());

        args.attribute = Some("Worker_pct".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let file = data_file();
        let mut args = make_args(&file);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let args = Args::parse_from(["censuslens", "--init-config"]);
        assert!(args.data.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let file = data_file();
        let mut args = make_args(&file);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
