//! Correlation panel: grouped pairwise-correlation results with a
//! diversification score, explanatory text, and one heatmap per group.
//!
//! Groups arrive in server order and are classified in priority order:
//! an explanatory `message` wins (degenerate group), then an `error`, and
//! only then a full result. A degenerate group that also happens to carry a
//! `diversification` field still renders as degenerate.

use comfy_table::{
    presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table,
};

use crate::error::{ApiError, ApiErrorKind};
use crate::model::{CorrelationGroup, CorrelationMatrix, CorrelationPair, CorrelationReport};

/// Pairs at or above this coefficient are called out as redundant.
pub const HIGH_CORRELATION_THRESHOLD: f64 = 0.7;

pub const ADD_HOLDINGS_HINT: &str =
    "Add at least two ETFs from the same market to analyze correlation.";

pub const LEGEND: &[&str] = &[
    "1.0   moves identically",
    "0.7+  highly correlated (little diversification)",
    "0.3-0.7  moderately correlated",
    "below 0.3  good diversification",
];

/// Correlation matrix flattened into render order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl HeatmapGrid {
    fn from_matrix(matrix: &CorrelationMatrix) -> HeatmapGrid {
        let tickers: Vec<&String> = matrix.keys().collect();
        let labels = tickers.iter().map(|t| short_ticker(t)).collect();
        let rows = tickers
            .iter()
            .map(|row| {
                tickers
                    .iter()
                    .map(|col| matrix.get(*col).and_then(|c| c.get(*row)).copied())
                    .collect()
            })
            .collect();
        HeatmapGrid { labels, rows }
    }
}

// Exchange suffixes only add noise on a small heatmap axis.
fn short_ticker(ticker: &str) -> String {
    ticker
        .trim_end_matches(".KS")
        .trim_end_matches(".KQ")
        .to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullGroup {
    pub name: String,
    /// Render-target key, unique per group: group name with whitespace replaced.
    pub heatmap_id: String,
    pub etf_names: Vec<String>,
    pub score: i64,
    pub rating: String,
    pub advice: String,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub high_pairs: Vec<CorrelationPair>,
    pub grid: HeatmapGrid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupView {
    Insufficient { name: String, message: String },
    Failed { name: String, error: String },
    Full(Box<FullGroup>),
}

pub fn heatmap_id(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Classifies one group into exactly one of the three cases.
pub fn classify(group: CorrelationGroup) -> GroupView {
    if let Some(message) = group.message {
        return GroupView::Insufficient {
            name: group.name,
            message,
        };
    }
    if let Some(error) = group.error {
        return GroupView::Failed {
            name: group.name,
            error,
        };
    }
    let (Some(diversification), Some(matrix)) = (group.diversification, group.correlation_matrix)
    else {
        return GroupView::Failed {
            name: group.name,
            error: "Incomplete correlation result.".to_string(),
        };
    };

    let grid = HeatmapGrid::from_matrix(&matrix);
    GroupView::Full(Box::new(FullGroup {
        heatmap_id: heatmap_id(&group.name),
        name: group.name,
        etf_names: group.etf_names,
        score: diversification.diversification_score,
        rating: diversification.rating,
        advice: diversification.advice,
        average: diversification.average_correlation,
        max: diversification.max_correlation,
        min: diversification.min_correlation,
        high_pairs: high_pairs(&matrix),
        grid,
    }))
}

/// Upper-triangle pairs at or above the threshold, in matrix order.
fn high_pairs(matrix: &CorrelationMatrix) -> Vec<CorrelationPair> {
    let tickers: Vec<&String> = matrix.keys().collect();
    let mut pairs = Vec::new();
    for (i, a) in tickers.iter().enumerate() {
        for b in tickers.iter().skip(i + 1) {
            let Some(value) = matrix.get(*a).and_then(|c| c.get(*b)) else {
                continue;
            };
            if *value >= HIGH_CORRELATION_THRESHOLD {
                pairs.push(CorrelationPair {
                    etf1: (*a).clone(),
                    etf2: (*b).clone(),
                    correlation: *value,
                });
            }
        }
    }
    pairs
}

#[derive(Default)]
pub struct CorrelationPanel {
    views: Vec<GroupView>,
    period: String,
    loading: bool,
    error: Option<String>,
    hint: Option<String>,
}

impl CorrelationPanel {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
        self.hint = None;
    }

    pub fn apply(&mut self, report: CorrelationReport) {
        self.views = report.groups.into_iter().map(classify).collect();
        self.period = report.period;
        self.loading = false;
        self.error = None;
        self.hint = None;
    }

    pub fn fail(&mut self, error: &ApiError) {
        self.loading = false;
        self.error = Some(error.to_string());
        // Matched on the structured kind, not on message text.
        self.hint = (error.kind() == Some(ApiErrorKind::NotEnoughHoldings))
            .then(|| ADD_HOLDINGS_HINT.to_string());
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn views(&self) -> &[GroupView] {
        &self.views
    }

    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

fn print_full(group: &FullGroup) {
    println!(
        "\n{}: diversification {} / 100 ({})",
        group.name, group.score, group.rating
    );
    println!("{}", group.advice);
    if !group.etf_names.is_empty() {
        println!("Holdings: {}", group.etf_names.join(", "));
    }
    println!(
        "average {:.3} | max {:.3} | min {:.3}",
        group.average, group.max, group.min
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![Cell::new("").add_attribute(Attribute::Bold)];
    header.extend(
        group
            .grid
            .labels
            .iter()
            .map(|l| Cell::new(l).add_attribute(Attribute::Bold)),
    );
    table.set_header(header);
    for (label, row) in group.grid.labels.iter().zip(&group.grid.rows) {
        let mut cells = vec![Cell::new(label).add_attribute(Attribute::Bold)];
        for value in row {
            cells.push(match value {
                Some(v) => {
                    let color = if *v >= HIGH_CORRELATION_THRESHOLD {
                        TColor::Red
                    } else if *v >= 0.3 {
                        TColor::Yellow
                    } else {
                        TColor::Green
                    };
                    Cell::new(format!("{v:.2}"))
                        .set_alignment(CellAlignment::Right)
                        .fg(color)
                }
                None => Cell::new("-").set_alignment(CellAlignment::Right),
            });
        }
        table.add_row(cells);
    }
    println!("{table}");

    if group.high_pairs.is_empty() {
        println!("No highly correlated pairs (>= {HIGH_CORRELATION_THRESHOLD}).");
    } else {
        for pair in &group.high_pairs {
            println!(
                "{} / {} correlate at {:.3}",
                short_ticker(&pair.etf1),
                short_ticker(&pair.etf2),
                pair.correlation
            );
        }
    }
}

// CLI report for the `correlation` subcommand.
pub fn print(report: CorrelationReport) {
    let period = report.period.clone();
    println!("Correlation over {period} ({} ETFs)", report.total_etfs);
    for view in report.groups.into_iter().map(classify) {
        match view {
            GroupView::Insufficient { name, message } => println!("\n{name}: {message}"),
            GroupView::Failed { name, error } => println!("\n{name}: analysis failed: {error}"),
            GroupView::Full(group) => print_full(&group),
        }
    }
    println!();
    for line in LEGEND {
        println!("  {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Diversification;
    use std::collections::BTreeMap;

    fn matrix(pairs: &[(&str, &str, f64)]) -> CorrelationMatrix {
        let mut m: CorrelationMatrix = BTreeMap::new();
        for (a, b, v) in pairs {
            m.entry(a.to_string())
                .or_default()
                .insert(b.to_string(), *v);
            m.entry(b.to_string())
                .or_default()
                .insert(a.to_string(), *v);
        }
        for ticker in m.keys().cloned().collect::<Vec<_>>() {
            m.entry(ticker.clone())
                .or_default()
                .insert(ticker, 1.0);
        }
        m
    }

    fn diversification() -> Diversification {
        Diversification {
            diversification_score: 55,
            rating: "Fair".to_string(),
            advice: "Consider adding other asset classes.".to_string(),
            average_correlation: 0.45,
            max_correlation: 0.82,
            min_correlation: 0.11,
            high_correlation_pairs: Vec::new(),
        }
    }

    fn full_group(name: &str) -> CorrelationGroup {
        CorrelationGroup {
            name: name.to_string(),
            etf_names: vec!["A Fund".to_string(), "B Fund".to_string()],
            message: None,
            error: None,
            correlation_matrix: Some(matrix(&[("AAA", "BBB", 0.82)])),
            diversification: Some(diversification()),
        }
    }

    #[test]
    fn message_wins_even_with_a_stray_diversification_field() {
        let mut group = full_group("US ETF");
        group.message = Some("Add one more ETF to compare.".to_string());
        // Mutually exclusive: the degenerate case is never a full render.
        assert!(matches!(
            classify(group),
            GroupView::Insufficient { ref message, .. } if message.contains("one more")
        ));
    }

    #[test]
    fn error_wins_over_full_result() {
        let mut group = full_group("US ETF");
        group.error = Some("upstream timeout".to_string());
        assert!(matches!(classify(group), GroupView::Failed { .. }));
    }

    #[test]
    fn incomplete_full_result_is_a_failure_not_a_panic() {
        let mut group = full_group("US ETF");
        group.diversification = None;
        assert!(matches!(classify(group), GroupView::Failed { .. }));
    }

    #[test]
    fn full_group_carries_unique_sanitized_heatmap_id() {
        let view = classify(full_group("Korean  ETF group"));
        let GroupView::Full(group) = view else {
            panic!("expected full result")
        };
        assert_eq!(group.heatmap_id, "Korean_ETF_group");
        assert_eq!(group.score, 55);
        assert_eq!(group.etf_names, vec!["A Fund", "B Fund"]);
        assert_eq!(group.grid.labels, vec!["AAA", "BBB"]);
    }

    #[test]
    fn high_pair_threshold_is_inclusive() {
        let m = matrix(&[("AAA", "BBB", 0.7), ("AAA", "CCC", 0.69), ("BBB", "CCC", 0.9)]);
        let pairs = high_pairs(&m);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().any(|p| p.correlation == 0.7));
        assert!(!pairs
            .iter()
            .any(|p| p.etf1 == "AAA" && p.etf2 == "CCC"));
    }

    #[test]
    fn not_enough_holdings_failure_adds_the_hint() {
        let mut panel = CorrelationPanel::default();
        panel.fail(&ApiError::Api {
            kind: ApiErrorKind::NotEnoughHoldings,
            status: 400,
            detail: "needs at least 2 comparable ETFs".to_string(),
        });
        assert_eq!(panel.hint(), Some(ADD_HOLDINGS_HINT));

        panel.fail(&ApiError::Api {
            kind: ApiErrorKind::Server,
            status: 500,
            detail: "boom".to_string(),
        });
        assert!(panel.hint().is_none());
    }

    #[test]
    fn grid_strips_exchange_suffixes() {
        let grid = HeatmapGrid::from_matrix(&matrix(&[("069500.KS", "102110.KS", 0.9)]));
        assert_eq!(grid.labels, vec!["069500", "102110"]);
        assert_eq!(grid.rows[0][1], Some(0.9));
    }
}
