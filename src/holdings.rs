//! Holdings panel: the user's tracked ETFs.
//!
//! Add and delete are server mutations; after either one the list and the
//! chart-ticker selector are replaced wholesale from a fresh fetch rather
//! than patched in place, so reload is always safe to repeat.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};

use crate::error::ValidationError;
use crate::model::{Etf, NewEtf};

pub const EMPTY_MESSAGE: &str = "No ETFs registered. Add one to start tracking.";

/// Client-side guard only; the server remains authoritative.
pub fn validate_new(ticker: &str, name: &str) -> Result<NewEtf, ValidationError> {
    let ticker = ticker.trim();
    let name = name.trim();
    if ticker.is_empty() {
        return Err(ValidationError::TickerRequired);
    }
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    Ok(NewEtf::new(ticker, name))
}

/// What the panel shows: exactly one of these at a time.
#[derive(Debug, PartialEq)]
pub enum HoldingsView<'a> {
    Loading,
    Empty,
    List(&'a [Etf]),
    Error(&'a str),
}

#[derive(Default)]
pub struct HoldingsPanel {
    holdings: Vec<Etf>,
    loaded: bool,
    error: Option<String>,
    pub selected: usize,
}

impl HoldingsPanel {
    /// Replaces the list wholesale from a fresh fetch.
    pub fn apply(&mut self, holdings: Vec<Etf>) {
        self.holdings = holdings;
        self.loaded = true;
        self.error = None;
        if self.selected >= self.holdings.len() {
            self.selected = self.holdings.len().saturating_sub(1);
        }
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
        self.loaded = true;
    }

    pub fn view(&self) -> HoldingsView<'_> {
        if let Some(error) = &self.error {
            return HoldingsView::Error(error);
        }
        if !self.loaded {
            return HoldingsView::Loading;
        }
        if self.holdings.is_empty() {
            HoldingsView::Empty
        } else {
            HoldingsView::List(&self.holdings)
        }
    }

    pub fn holdings(&self) -> &[Etf] {
        &self.holdings
    }

    /// Options for the chart-ticker selector, replaced together with the list.
    pub fn tickers(&self) -> Vec<&str> {
        self.holdings.iter().map(|etf| etf.ticker.as_str()).collect()
    }

    pub fn selected_etf(&self) -> Option<&Etf> {
        self.holdings.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.holdings.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

// CLI report for the `holdings` subcommand.
pub fn print(holdings: &[Etf]) {
    if holdings.is_empty() {
        println!("{EMPTY_MESSAGE}");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
    table.set_header(vec![
        Cell::new("Ticker").add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("Market").add_attribute(Attribute::Bold),
        Cell::new("Category").add_attribute(Attribute::Bold),
    ]);
    for etf in holdings {
        table.add_row(vec![
            Cell::new(&etf.ticker),
            Cell::new(&etf.name),
            Cell::new(etf.market.as_deref().unwrap_or("-")),
            Cell::new(etf.category.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etf(ticker: &str) -> Etf {
        Etf {
            ticker: ticker.to_string(),
            name: format!("{ticker} Fund"),
            market: None,
            category: None,
        }
    }

    #[test]
    fn validation_requires_both_fields() {
        assert_eq!(
            validate_new("  ", "SPDR S&P 500"),
            Err(ValidationError::TickerRequired)
        );
        assert_eq!(validate_new("SPY", " "), Err(ValidationError::NameRequired));
        let new = validate_new(" SPY ", " SPDR S&P 500 ").unwrap();
        assert_eq!(new.ticker, "SPY");
        assert_eq!(new.name, "SPDR S&P 500");
    }

    #[test]
    fn renders_list_or_empty_state_never_both() {
        let mut panel = HoldingsPanel::default();
        assert_eq!(panel.view(), HoldingsView::Loading);

        panel.apply(vec![etf("SPY")]);
        assert!(matches!(panel.view(), HoldingsView::List(list) if list.len() == 1));

        panel.apply(Vec::new());
        assert_eq!(panel.view(), HoldingsView::Empty);
    }

    #[test]
    fn reload_replaces_prior_state() {
        let mut panel = HoldingsPanel::default();
        panel.apply(vec![etf("SPY"), etf("QQQ")]);
        panel.apply(vec![etf("VOO")]);
        assert_eq!(panel.holdings().len(), 1);
        assert_eq!(panel.tickers(), vec!["VOO"]);
    }

    #[test]
    fn selection_survives_shrinking_reload() {
        let mut panel = HoldingsPanel::default();
        panel.apply(vec![etf("SPY"), etf("QQQ"), etf("VOO")]);
        panel.select_next();
        panel.select_next();
        panel.apply(vec![etf("SPY")]);
        assert_eq!(panel.selected_etf().unwrap().ticker, "SPY");
    }
}
