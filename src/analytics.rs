//! Analytics & chart panel for one selected ticker and period.
//!
//! A refresh is four fetches: analytics first, then the price, dividend
//! (full history, no period) and cumulative-return charts concurrently.
//! Any failure aborts the whole cycle and the panel shows one generic
//! error instead of a partial render.

use comfy_table::{
    presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table,
};
use futures::future::try_join3;

use crate::api::ApiClient;
use crate::chart::PlotSpec;
use crate::error::ApiError;
use crate::model::Analytics;
use crate::summary::format_currency;

pub const FETCH_FAILED: &str = "Could not load charts for the selected ETF.";

/// Everything one refresh cycle produces.
pub struct AnalyticsBundle {
    pub analytics: Analytics,
    pub price: PlotSpec,
    pub dividend: PlotSpec,
    pub cumulative_return: PlotSpec,
}

/// Runs one full refresh cycle. The analytics fetch goes first so an
/// unknown ticker fails fast before the chart requests start.
pub async fn fetch_bundle(
    api: &ApiClient,
    ticker: &str,
    period: &str,
) -> Result<AnalyticsBundle, ApiError> {
    let analytics = api.analytics(ticker, period).await?;
    let (price, dividend, cumulative_return) = try_join3(
        api.price_chart(ticker, period),
        api.dividend_chart(ticker),
        api.cumulative_return_chart(ticker, period),
    )
    .await?;
    let price = PlotSpec::parse(&price.chart)?;
    let dividend = PlotSpec::parse(&dividend.chart)?;
    let cumulative_return = PlotSpec::parse(&cumulative_return.chart)?;
    Ok(AnalyticsBundle {
        analytics,
        price,
        dividend,
        cumulative_return,
    })
}

#[derive(Default)]
pub struct AnalyticsPanel {
    bundle: Option<AnalyticsBundle>,
    loading: bool,
    error: Option<String>,
}

impl AnalyticsPanel {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn apply(&mut self, bundle: AnalyticsBundle) {
        self.bundle = Some(bundle);
        self.loading = false;
        self.error = None;
    }

    pub fn fail(&mut self) {
        self.loading = false;
        self.error = Some(FETCH_FAILED.to_string());
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn bundle(&self) -> Option<&AnalyticsBundle> {
        self.bundle.as_ref()
    }
}

/// Label/value rows for the metric block, in render order.
pub fn metric_rows(a: &Analytics) -> Vec<(&'static str, String)> {
    vec![
        ("Current Price", format_currency(a.current_price)),
        ("Total Return", format!("{:.2}%", a.total_return)),
        ("CAGR", format!("{:.2}%", a.cagr)),
        ("Volatility", format!("{:.2}%", a.volatility)),
        ("Sharpe Ratio", format!("{:.2}", a.sharpe_ratio)),
        ("Max Drawdown", format!("{:.2}%", a.max_drawdown)),
        ("Dividend Yield", format!("{:.2}%", a.dividend_yield)),
        ("Total Dividends", format_currency(a.total_dividends)),
    ]
}

// CLI report for the `analytics` subcommand.
pub fn print(a: &Analytics, period: &str) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(64);
    table.set_header(vec![
        Cell::new(format!("{} ({}) over {period}", a.name, a.ticker)).add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    for (label, value) in metric_rows(a) {
        let color = match label {
            "Total Return" | "CAGR" => {
                if value.starts_with('-') {
                    TColor::Red
                } else {
                    TColor::Green
                }
            }
            _ => TColor::White,
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).set_alignment(CellAlignment::Right).fg(color),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analytics() -> Analytics {
        Analytics {
            ticker: "SPY".to_string(),
            name: "SPDR S&P 500".to_string(),
            current_price: 512.3,
            total_return: 84.5,
            cagr: 12.9,
            volatility: 17.4,
            sharpe_ratio: 0.74,
            max_drawdown: -33.7,
            dividend_yield: 1.31,
            total_dividends: 28.4,
        }
    }

    #[test]
    fn metric_rows_cover_all_eight_figures() {
        let rows = metric_rows(&analytics());
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0], ("Current Price", "512".to_string()));
        assert_eq!(rows[4], ("Sharpe Ratio", "0.74".to_string()));
        assert_eq!(rows[5], ("Max Drawdown", "-33.70%".to_string()));
    }

    #[test]
    fn failed_cycle_shows_one_generic_error() {
        let mut panel = AnalyticsPanel::default();
        panel.begin();
        assert!(panel.is_loading());
        panel.fail();
        assert_eq!(panel.error(), Some(FETCH_FAILED));
        assert!(!panel.is_loading());
    }
}
