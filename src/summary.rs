//! Portfolio summary panel: five aggregate figures with currency formatting
//! and positive/negative styling derived from the sign of the total return.

use comfy_table::{
    presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table,
};

use crate::model::PortfolioSummary;

/// Styling applied to the return and return-rate fields. The boundary at
/// zero is inclusive on the non-negative side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Negative,
}

impl Tone {
    pub fn of(total_return: f64) -> Tone {
        if total_return >= 0.0 {
            Tone::Positive
        } else {
            Tone::Negative
        }
    }

    pub fn sign(self) -> &'static str {
        match self {
            Tone::Positive => "+",
            Tone::Negative => "-",
        }
    }
}

/// Rounds to the nearest whole unit and groups thousands with commas.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let grouped = digits
        .chars()
        .rev()
        .collect::<String>()
        .chars()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect::<String>();
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Currency with an explicit sign, used for the total-return field.
pub fn signed_currency(value: f64) -> String {
    format!("{}{}", Tone::of(value).sign(), format_currency(value.abs()))
}

/// Percentage fixed to two decimals, signed the same way as the return.
pub fn signed_percent(value: f64, tone: Tone) -> String {
    format!("{}{:.2}%", tone.sign(), value.abs())
}

/// Holds the last fetched summary; each refresh replaces it wholesale.
#[derive(Default)]
pub struct SummaryPanel {
    summary: Option<PortfolioSummary>,
    error: Option<String>,
}

impl SummaryPanel {
    pub fn apply(&mut self, summary: PortfolioSummary) {
        self.summary = Some(summary);
        self.error = None;
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn summary(&self) -> Option<&PortfolioSummary> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Label/value/tone rows in render order.
    pub fn rows(&self) -> Vec<(&'static str, String, Option<Tone>)> {
        let Some(s) = &self.summary else {
            return Vec::new();
        };
        let tone = Tone::of(s.total_return);
        vec![
            ("Total Investment", format_currency(s.total_investment), None),
            ("Current Value", format_currency(s.current_value), None),
            ("Total Return", signed_currency(s.total_return), Some(tone)),
            ("Return Rate", signed_percent(s.return_rate, tone), Some(tone)),
            ("Total Dividends", format_currency(s.total_dividends), None),
        ]
    }
}

// CLI report for the `summary` subcommand.
pub fn print(summary: &PortfolioSummary) {
    let mut panel = SummaryPanel::default();
    panel.apply(*summary);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(64);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    for (label, value, tone) in panel.rows() {
        let mut cell = Cell::new(value).set_alignment(CellAlignment::Right);
        if let Some(tone) = tone {
            let color = match tone {
                Tone::Positive => TColor::Green,
                Tone::Negative => TColor::Red,
            };
            cell = cell.fg(color);
        }
        table.add_row(vec![Cell::new(label), cell]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_and_rounds_fraction_away() {
        assert_eq!(format_currency(1234567.8), "1,234,568");
        assert_eq!(format_currency(999.4), "999");
        assert_eq!(format_currency(-1234567.8), "-1,234,568");
    }

    #[test]
    fn negative_return_renders_minus_and_negative_tone() {
        let tone = Tone::of(-500.0);
        assert_eq!(tone, Tone::Negative);
        assert_eq!(signed_currency(-500.0), "-500");
    }

    #[test]
    fn zero_return_is_on_the_positive_side() {
        let tone = Tone::of(0.0);
        assert_eq!(tone, Tone::Positive);
        assert!(!signed_currency(0.0).contains('-'));
    }

    #[test]
    fn tone_applies_to_both_return_and_rate() {
        let mut panel = SummaryPanel::default();
        panel.apply(PortfolioSummary {
            total_investment: 10_000.0,
            current_value: 9_500.0,
            total_return: -500.0,
            return_rate: -5.0,
            total_dividends: 120.0,
        });
        let rows = panel.rows();
        assert_eq!(rows[2].2, Some(Tone::Negative));
        assert_eq!(rows[3].2, Some(Tone::Negative));
        assert_eq!(rows[3].1, "-5.00%");
        // The plain currency fields carry no tone.
        assert_eq!(rows[0].2, None);
    }

    #[test]
    fn refresh_replaces_prior_state_wholesale() {
        let mut panel = SummaryPanel::default();
        panel.fail("boom".to_string());
        panel.apply(PortfolioSummary::default());
        assert!(panel.error().is_none());
        assert!(panel.summary().is_some());
    }
}
