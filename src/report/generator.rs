//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] as text. Numbers are formatted here;
//! nothing is recomputed except the presentation slices (ranking head and
//! tail, distribution shares, performance bands).

use crate::analysis::{
    band_ranking, display_slice, top_with_remainder, Comparison, ComparisonTier,
    CorrelationMatrix, Population, RankBand,
};
use crate::models::{
    AttributeAnalysis, CorrelationSection, RankedEntity, Report, ReportMetadata,
};
use anyhow::Result;
use std::collections::BTreeMap;

/// Presentation limits for the Markdown report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Rankings longer than this are cut to head and tail.
    pub ranking_threshold: usize,
    pub ranking_head: usize,
    pub ranking_tail: usize,
    /// Entities shown individually in the distribution; the rest are "Others".
    pub distribution_top: usize,
    pub include_gaps: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            ranking_threshold: 20,
            ranking_head: 15,
            ranking_tail: 5,
            distribution_top: 7,
            include_gaps: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str("# CensusLens Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_taxonomy_section(&report.taxonomy));

    if let Some(ref analysis) = report.analysis {
        output.push_str(&generate_analysis_section(analysis, options));
    }

    if !report.comparison.is_empty() {
        output.push_str(&generate_comparison_section(&report.comparison));
    }

    if !report.correlations.is_empty() {
        output.push_str("## Correlation\n\n");
        for correlation in &report.correlations {
            output.push_str(&generate_correlation_line(correlation));
        }
        output.push('\n');
    }

    if let Some(ref matrix) = report.matrix {
        output.push_str(&generate_matrix_section(matrix));
    }

    output.push_str(&generate_resolution_section(
        &report.unresolved_features,
        &report.unresolved_entities,
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Source:** `{}`\n", metadata.data_source));
    if let Some(ref geo) = metadata.geo_source {
        section.push_str(&format!("- **Boundaries:** `{}`\n", geo));
    }
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Level:** {}\n", metadata.level));
    section.push_str(&format!(
        "- **{}:** {}\n",
        capitalize(metadata.level.plural()),
        metadata.entity_count
    ));
    section.push_str(&format!("- **Attributes:** {}\n", metadata.attribute_count));
    if metadata.skipped_rows > 0 {
        section.push_str(&format!(
            "- **Skipped Rows:** {} (blank entity name)\n",
            metadata.skipped_rows
        ));
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_taxonomy_section(taxonomy: &[(String, Vec<String>)]) -> String {
    let mut section = String::new();

    section.push_str("## Attribute Categories\n\n");
    if taxonomy.is_empty() {
        section.push_str("No attribute column matched a category.\n\n");
        return section;
    }

    section.push_str("| Category | Attributes |\n");
    section.push_str("|:---|:---:|\n");
    for (label, columns) in taxonomy {
        section.push_str(&format!("| {} | {} |\n", label, columns.len()));
    }
    section.push('\n');

    section
}

fn generate_analysis_section(analysis: &AttributeAnalysis, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", analysis.label));
    section.push_str(&format!("*Column: `{}`", analysis.attribute));
    if let Some(ref category) = analysis.category {
        section.push_str(&format!(" | Category: {}", category));
    }
    section.push_str("*\n\n");

    // Insights
    section.push_str("### Key Insights\n\n");
    for insight in &analysis.insights {
        section.push_str(&format!(
            "- **{}:** {}  \n  {}\n",
            insight.kind, insight.headline, insight.detail
        ));
    }
    section.push('\n');

    // Statistics
    let s = &analysis.summary;
    section.push_str("### Statistics\n\n");
    section.push_str("| Count | Mean | Median | Min | Max | Std Dev | 75th pct |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n\n",
        s.count, s.mean, s.median, s.min, s.max, s.std_dev, s.p75
    ));

    section.push_str(&generate_ranking_table(&analysis.ranking, options));
    section.push_str(&generate_distribution_table(&analysis.ranking, options));

    if !analysis.top.is_empty() || !analysis.bottom.is_empty() {
        section.push_str("### Extremes\n\n");
        section.push_str(&format!("- **Highest:** {}\n", analysis.top.join(", ")));
        section.push_str(&format!("- **Lowest:** {}\n\n", analysis.bottom.join(", ")));
    }

    if options.include_gaps && !analysis.gaps.is_empty() {
        section.push_str("### Performance Gaps\n\n");
        section.push_str("| Entity | vs Mean | vs Median | vs Max |\n");
        section.push_str("|:---|---:|---:|---:|\n");
        for entry in &analysis.ranking {
            if let Some(gap) = analysis.gaps.get(&entry.key) {
                section.push_str(&format!(
                    "| {} | {:+.2} | {:+.2} | {:+.2} |\n",
                    entry.name, gap.vs_mean, gap.vs_median, gap.vs_max
                ));
            }
        }
        section.push('\n');
    }

    section
}

fn band_label(band: RankBand) -> &'static str {
    match band {
        RankBand::High => "High",
        RankBand::Middle => "Middle",
        RankBand::Low => "Low",
    }
}

fn generate_ranking_table(ranking: &[RankedEntity], options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("### Ranking\n\n");
    if ranking.is_empty() {
        section.push_str("No entity has a value for this attribute.\n\n");
        return section;
    }

    let bands = band_ranking(ranking);
    let positioned: Vec<(usize, &RankedEntity, RankBand)> = ranking
        .iter()
        .zip(bands)
        .enumerate()
        .map(|(i, (entry, band))| (i + 1, entry, band))
        .collect();

    let shown = display_slice(
        &positioned,
        options.ranking_head,
        options.ranking_tail,
        options.ranking_threshold,
    );

    section.push_str("| # | Entity | Value | Band |\n");
    section.push_str("|---:|:---|---:|:---:|\n");

    let mut previous = 0;
    for (position, entry, band) in shown {
        if position > previous + 1 {
            section.push_str("| … | | | |\n");
        }
        section.push_str(&format!(
            "| {} | {} | {:.2} | {} |\n",
            position,
            entry.name,
            entry.value,
            band_label(band)
        ));
        previous = position;
    }
    section.push('\n');

    section
}

fn generate_distribution_table(ranking: &[RankedEntity], options: &ReportOptions) -> String {
    let population: Population = ranking.iter().map(|r| (r.key.clone(), r.value)).collect();
    let names: BTreeMap<&str, &str> = ranking
        .iter()
        .map(|r| (r.key.as_str(), r.name.as_str()))
        .collect();
    let total: f64 = population.values().sum();
    if population.is_empty() || total == 0.0 {
        return String::new();
    }

    let (top, others) = top_with_remainder(&population, options.distribution_top);

    let mut section = String::new();
    section.push_str("### Distribution\n\n");
    section.push_str("| Entity | Share |\n");
    section.push_str("|:---|---:|\n");
    for (key, value) in &top {
        let name = names.get(key.as_str()).copied().unwrap_or(key.as_str());
        section.push_str(&format!("| {} | {:.1}% |\n", name, value / total * 100.0));
    }
    if let Some(rest) = others {
        section.push_str(&format!("| Others | {:.1}% |\n", rest / total * 100.0));
    }
    section.push('\n');

    section
}

fn generate_comparison_section(rows: &[Comparison]) -> String {
    let mut section = String::new();
    let relative = rows.iter().any(|r| r.difference.is_some());

    section.push_str("## Comparison\n\n");
    if relative {
        section.push_str("| Entity | Value | vs National Mean | Tier |\n");
        section.push_str("|:---|---:|---:|:---:|\n");
    } else {
        section.push_str("| Entity | Value | Tier |\n");
        section.push_str("|:---|---:|:---:|\n");
    }

    for row in rows {
        let tier = row.tier.map(tier_label).unwrap_or("n/a");
        if relative {
            let difference = row
                .difference
                .map(|d| format!("{:+.1}%", d))
                .unwrap_or_else(|| "n/a".to_string());
            section.push_str(&format!(
                "| {} | {:.2} | {} | {} |\n",
                row.name, row.value, difference, tier
            ));
        } else {
            section.push_str(&format!("| {} | {:.2} | {} |\n", row.name, row.value, tier));
        }
    }
    section.push('\n');

    section
}

fn tier_label(tier: ComparisonTier) -> &'static str {
    match tier {
        ComparisonTier::Strong => "Strong",
        ComparisonTier::Good => "Good",
        ComparisonTier::Average => "Average",
        ComparisonTier::BelowAverage => "Below Average",
        ComparisonTier::Weak => "Weak",
    }
}

fn generate_correlation_line(correlation: &CorrelationSection) -> String {
    let result = &correlation.result;
    let mut line = format!("- `{}` vs `{}`: ", correlation.attribute, correlation.other);

    match result.coefficient {
        Some(r) => line.push_str(&format!(
            "**{}** (r = {:.3}, {} pairs)\n",
            result.relation, r, result.pair_count
        )),
        None => line.push_str(&format!(
            "not enough paired values ({} pairs)\n",
            result.pair_count
        )),
    }

    line
}

fn generate_matrix_section(matrix: &CorrelationMatrix) -> String {
    let mut section = String::new();

    section.push_str("## Correlation Matrix\n\n");
    section.push_str("| |");
    for attribute in &matrix.attributes {
        section.push_str(&format!(" {} |", attribute));
    }
    section.push_str("\n|:---|");
    section.push_str(&"---:|".repeat(matrix.attributes.len()));
    section.push('\n');

    for (attribute, row) in matrix.attributes.iter().zip(&matrix.cells) {
        section.push_str(&format!("| {} |", attribute));
        for cell in row {
            match cell.coefficient {
                Some(r) => section.push_str(&format!(" {:.2} |", r)),
                None => section.push_str(" – |"),
            }
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

fn generate_resolution_section(features: &[String], entities: &[String]) -> String {
    if features.is_empty() && entities.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Name Resolution\n\n");

    if !entities.is_empty() {
        section.push_str(&format!(
            "**Entities without a boundary ({}):** {}\n\n",
            entities.len(),
            entities.join(", ")
        ));
    }
    if !features.is_empty() {
        section.push_str(&format!(
            "**Boundaries without data ({}):** {}\n\n",
            features.len(),
            features.join(", ")
        ));
    }

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by CensusLens*\n".to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
