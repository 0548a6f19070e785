//! Recommendations panel: one long-running fetch produces a multi-category
//! payload that is cached whole; tab switches re-render from the cache and
//! never touch the network.

use comfy_table::{
    presets::UTF8_FULL, Attribute, Cell, CellAlignment, Color as TColor, ContentArrangement, Table,
};

use crate::model::{Recommendations, ScoredEtf};

pub const ANALYZING_MESSAGE: &str = "Analyzing ETFs... this can take a while.";
pub const EMPTY_TAB_MESSAGE: &str = "No ETFs in this category.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecTab {
    HighReturn,
    Stable,
    HighDividend,
    Balanced,
}

impl RecTab {
    pub fn all() -> &'static [RecTab] {
        &[
            RecTab::HighReturn,
            RecTab::Stable,
            RecTab::HighDividend,
            RecTab::Balanced,
        ]
    }

    pub fn title(self) -> &'static str {
        match self {
            RecTab::HighReturn => "High Return",
            RecTab::Stable => "Stable",
            RecTab::HighDividend => "High Dividend",
            RecTab::Balanced => "Balanced",
        }
    }
}

impl Default for RecTab {
    // A fresh payload always opens on the high-return tab.
    fn default() -> Self {
        RecTab::HighReturn
    }
}

#[derive(Debug, PartialEq)]
pub enum RecommendView<'a> {
    NotLoaded,
    Analyzing,
    Empty,
    List(&'a [ScoredEtf]),
    Error(&'a str),
}

#[derive(Default)]
pub struct RecommendPanel {
    payload: Option<Recommendations>,
    pub active_tab: RecTab,
    loading: bool,
    error: Option<String>,
    pub selected: usize,
}

impl RecommendPanel {
    /// The request is long-running server-side; show the interim placeholder.
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Caches the full payload and resets to the default tab.
    pub fn apply(&mut self, payload: Recommendations) {
        self.payload = Some(payload);
        self.active_tab = RecTab::default();
        self.loading = false;
        self.error = None;
        self.selected = 0;
    }

    pub fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Pure client-side re-render from the cached payload. A no-op while
    /// nothing has been loaded yet.
    pub fn switch_tab(&mut self, tab: RecTab) {
        if self.payload.is_none() {
            return;
        }
        self.active_tab = tab;
        self.selected = 0;
    }

    pub fn next_tab(&mut self) {
        let tabs = RecTab::all();
        let i = tabs.iter().position(|&t| t == self.active_tab).unwrap_or(0);
        self.switch_tab(tabs[(i + 1) % tabs.len()]);
    }

    pub fn items(&self) -> Option<&[ScoredEtf]> {
        let payload = self.payload.as_ref()?;
        Some(match self.active_tab {
            RecTab::HighReturn => &payload.high_return,
            RecTab::Stable => &payload.stable,
            RecTab::HighDividend => &payload.high_dividend,
            RecTab::Balanced => &payload.balanced,
        })
    }

    pub fn metadata(&self) -> Option<&crate::model::RecommendationMetadata> {
        self.payload.as_ref().map(|p| &p.metadata)
    }

    pub fn view(&self) -> RecommendView<'_> {
        if let Some(error) = &self.error {
            return RecommendView::Error(error);
        }
        if self.loading {
            return RecommendView::Analyzing;
        }
        match self.items() {
            None => RecommendView::NotLoaded,
            Some([]) => RecommendView::Empty,
            Some(items) => RecommendView::List(items),
        }
    }

    pub fn selected_etf(&self) -> Option<&ScoredEtf> {
        self.items()?.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if let Some(items) = self.items() {
            if self.selected + 1 < items.len() {
                self.selected += 1;
            }
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

fn category_table(title: &str, items: &[ScoredEtf]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(110);
    table.set_header(vec![
        Cell::new(title).add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("CAGR").add_attribute(Attribute::Bold),
        Cell::new("Volatility").add_attribute(Attribute::Bold),
        Cell::new("Sharpe").add_attribute(Attribute::Bold),
        Cell::new("Dividend").add_attribute(Attribute::Bold),
    ]);
    for etf in items {
        let cagr_color = if etf.cagr >= 0.0 { TColor::Green } else { TColor::Red };
        table.add_row(vec![
            Cell::new(&etf.ticker),
            Cell::new(&etf.name),
            Cell::new(format!("{:.2}%", etf.cagr))
                .set_alignment(CellAlignment::Right)
                .fg(cagr_color),
            Cell::new(format!("{:.2}%", etf.volatility)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", etf.sharpe_ratio)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}%", etf.dividend_yield)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

// CLI report for the `recommend` subcommand: one table per category.
pub fn print(recs: &Recommendations) {
    println!(
        "Analyzed {} ETFs over {}",
        recs.metadata.total_analyzed, recs.metadata.period
    );
    for (title, items) in [
        ("High Return", &recs.high_return),
        ("Stable", &recs.stable),
        ("High Dividend", &recs.high_dividend),
        ("Balanced", &recs.balanced),
    ] {
        if items.is_empty() {
            println!("{title}: {EMPTY_TAB_MESSAGE}");
            continue;
        }
        println!("{}", category_table(title, items));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(ticker: &str) -> ScoredEtf {
        ScoredEtf {
            ticker: ticker.to_string(),
            name: format!("{ticker} Fund"),
            current_price: 100.0,
            cagr: 10.0,
            volatility: 15.0,
            sharpe_ratio: 0.6,
            max_drawdown: -20.0,
            dividend_yield: 1.5,
            total_return: 60.0,
        }
    }

    fn payload_with_empty_high_return() -> Recommendations {
        Recommendations {
            high_return: Vec::new(),
            stable: vec![scored("SCHD")],
            high_dividend: vec![scored("VYM")],
            balanced: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn tab_switch_on_cached_empty_list_renders_empty_state() {
        let mut panel = RecommendPanel::default();
        panel.apply(payload_with_empty_high_return());
        panel.switch_tab(RecTab::Stable);
        assert!(matches!(panel.view(), RecommendView::List(items) if items.len() == 1));
        // Back to the empty category: empty state, purely from the cache.
        panel.switch_tab(RecTab::HighReturn);
        assert_eq!(panel.view(), RecommendView::Empty);
    }

    #[test]
    fn list_views_compare_by_contents() {
        let mut panel = RecommendPanel::default();
        panel.apply(payload_with_empty_high_return());
        panel.switch_tab(RecTab::Stable);
        assert_eq!(panel.view(), RecommendView::List(&[scored("SCHD")]));
        assert_ne!(panel.view(), RecommendView::List(&[scored("VYM")]));
    }

    #[test]
    fn tab_switch_without_payload_is_a_noop() {
        let mut panel = RecommendPanel::default();
        panel.switch_tab(RecTab::Balanced);
        assert_eq!(panel.active_tab, RecTab::default());
        assert_eq!(panel.view(), RecommendView::NotLoaded);
    }

    #[test]
    fn request_shows_analyzing_then_default_tab() {
        let mut panel = RecommendPanel::default();
        panel.begin();
        assert_eq!(panel.view(), RecommendView::Analyzing);
        panel.apply(payload_with_empty_high_return());
        assert_eq!(panel.active_tab, RecTab::HighReturn);
    }

    #[test]
    fn new_payload_replaces_cache_wholesale() {
        let mut panel = RecommendPanel::default();
        panel.apply(payload_with_empty_high_return());
        panel.switch_tab(RecTab::HighDividend);
        panel.select_next();
        panel.apply(Recommendations {
            high_return: vec![scored("QQQ")],
            ..Default::default()
        });
        assert_eq!(panel.active_tab, RecTab::HighReturn);
        assert_eq!(panel.selected, 0);
        assert!(matches!(panel.view(), RecommendView::List(items) if items[0].ticker == "QQQ"));
    }
}
