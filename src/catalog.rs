//! Incremental loader for the selectable ETF universe.
//!
//! The catalog is fetched in bounded pages and accumulated in memory until
//! the server reports no more pages or the configured record cap is reached.
//! The loader itself never touches the network: callers ask it for the next
//! page request, perform the fetch, and feed the page back. That keeps the
//! single-fetch-in-flight guarantee in one place and makes it testable.

use std::collections::HashSet;

use crate::model::{CatalogPage, Etf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

pub struct CatalogLoader {
    etfs: Vec<Etf>,
    offset: usize,
    total: usize,
    has_more: bool,
    in_flight: bool,
    stale: bool,
    page_size: usize,
    max_records: usize,
}

impl CatalogLoader {
    pub fn new(page_size: usize, max_records: usize) -> CatalogLoader {
        CatalogLoader {
            etfs: Vec::new(),
            offset: 0,
            total: 0,
            has_more: true,
            in_flight: false,
            stale: false,
            page_size,
            max_records,
        }
    }

    /// Clears the accumulator so the next request starts from offset 0.
    ///
    /// A fetch outstanding at reset time keeps holding the guard; its page
    /// belongs to the old accumulator and is dropped when it arrives.
    pub fn reset(&mut self) {
        self.etfs.clear();
        self.offset = 0;
        self.total = 0;
        self.has_more = true;
        self.stale = self.in_flight;
    }

    /// Hands out the next page request, or `None` while a fetch is already
    /// outstanding, the server has no more pages, or the cap is reached.
    /// Marks the loader in-flight; exactly one request can be pending.
    pub fn next_request(&mut self) -> Option<PageRequest> {
        if self.in_flight || !self.has_more || self.etfs.len() >= self.max_records {
            return None;
        }
        self.in_flight = true;
        Some(PageRequest {
            limit: self.page_size,
            offset: self.offset,
        })
    }

    /// Folds one fetched page into the accumulator and releases the guard.
    /// A page requested before the last reset is discarded unfolded.
    pub fn apply_page(&mut self, page: CatalogPage) {
        self.in_flight = false;
        if self.stale {
            self.stale = false;
            return;
        }
        self.offset += page.etfs.len();
        self.etfs.extend(page.etfs);
        self.total = page.total;
        self.has_more = page.has_more;
    }

    /// Releases the guard after a failed fetch. The chain is not retried;
    /// a later manual trigger starts it again.
    pub fn abort(&mut self) {
        self.in_flight = false;
        self.stale = false;
    }

    /// Whether a continuation page should be scheduled.
    pub fn wants_more(&self) -> bool {
        !self.in_flight && self.has_more && self.etfs.len() < self.max_records
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// `(loaded, total)` for the progress indicator.
    pub fn progress(&self) -> (usize, usize) {
        (self.etfs.len(), self.total)
    }

    pub fn etfs(&self) -> &[Etf] {
        &self.etfs
    }
}

/// Search-enabled selector over the accumulated catalog.
///
/// Constructed at most once per session (on the first successful page);
/// later pages merge in without disturbing the filter text or selection.
pub struct EtfPicker {
    options: Vec<Etf>,
    seen: HashSet<String>,
    pub filter: String,
    pub selected: usize,
}

impl EtfPicker {
    pub fn new(options: &[Etf]) -> EtfPicker {
        let mut picker = EtfPicker {
            options: Vec::new(),
            seen: HashSet::new(),
            filter: String::new(),
            selected: 0,
        };
        picker.merge(options);
        picker
    }

    /// Appends options not seen before, keyed by ticker. Existing options,
    /// the filter text and the selection are left alone.
    pub fn merge(&mut self, options: &[Etf]) {
        for etf in options {
            if self.seen.insert(etf.ticker.clone()) {
                self.options.push(etf.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Options matching the current filter (case-insensitive over ticker
    /// and name). An empty filter matches everything.
    pub fn matches(&self) -> Vec<&Etf> {
        if self.filter.is_empty() {
            return self.options.iter().collect();
        }
        let needle = self.filter.to_lowercase();
        self.options
            .iter()
            .filter(|etf| {
                etf.ticker.to_lowercase().contains(&needle)
                    || etf.name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn selected_etf(&self) -> Option<&Etf> {
        let matches = self.matches();
        matches.get(self.selected.min(matches.len().saturating_sub(1))).copied()
    }

    pub fn select_next(&mut self) {
        let count = self.matches().len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.selected = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.selected = 0;
    }
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

    fn page(tickers: &[&str], total: usize, has_more: bool) -> CatalogPage {
        CatalogPage {
            etfs: tickers.iter().map(|t| etf(t)).collect(),
            total,
            has_more,
        }
    }

    #[test]
    fn accumulates_pages_and_advances_offset() {
        let mut loader = CatalogLoader::new(2, 2000);

        let req = loader.next_request().unwrap();
        assert_eq!(req, PageRequest { limit: 2, offset: 0 });
        loader.apply_page(page(&["SPY", "QQQ"], 5, true));

        let req = loader.next_request().unwrap();
        assert_eq!(req.offset, 2);
        loader.apply_page(page(&["VOO", "VTI"], 5, true));

        // Accumulated count equals the sum of page sizes returned.
        assert_eq!(loader.etfs().len(), 4);
        assert_eq!(loader.progress(), (4, 5));
    }

    #[test]
    fn only_one_request_in_flight() {
        let mut loader = CatalogLoader::new(2, 2000);
        assert!(loader.next_request().is_some());
        // Second trigger while the first is outstanding is a no-op.
        assert!(loader.next_request().is_none());
        loader.apply_page(page(&["SPY"], 3, true));
        assert!(loader.next_request().is_some());
    }

    #[test]
    fn stops_when_server_reports_no_more() {
        let mut loader = CatalogLoader::new(2, 2000);
        loader.next_request().unwrap();
        loader.apply_page(page(&["SPY", "QQQ"], 2, false));
        assert!(!loader.wants_more());
        assert!(loader.next_request().is_none());
    }

    #[test]
    fn stops_at_the_configured_cap() {
        let mut loader = CatalogLoader::new(2, 3);
        loader.next_request().unwrap();
        loader.apply_page(page(&["A", "B"], 100, true));
        assert!(loader.wants_more());
        loader.next_request().unwrap();
        loader.apply_page(page(&["C", "D"], 100, true));
        // Cap of 3 reached (4 accumulated); no further requests.
        assert!(!loader.wants_more());
        assert!(loader.next_request().is_none());
    }

    #[test]
    fn abort_releases_the_guard_without_retrying() {
        let mut loader = CatalogLoader::new(2, 2000);
        loader.next_request().unwrap();
        loader.abort();
        assert!(!loader.is_loading());
        // A manual re-trigger may start the chain again.
        assert!(loader.next_request().is_some());
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let mut loader = CatalogLoader::new(2, 2000);
        loader.next_request().unwrap();
        loader.apply_page(page(&["SPY"], 1, false));
        loader.reset();
        assert_eq!(loader.progress(), (0, 0));
        assert_eq!(loader.next_request().unwrap().offset, 0);
    }

    #[test]
    fn reset_keeps_the_guard_while_a_fetch_is_outstanding() {
        let mut loader = CatalogLoader::new(2, 2000);
        loader.next_request().unwrap();
        loader.reset();
        // The old fetch still holds the guard; no second request starts.
        assert!(loader.next_request().is_none());
        assert!(loader.is_loading());
    }

    #[test]
    fn page_requested_before_reset_is_dropped() {
        let mut loader = CatalogLoader::new(2, 2000);
        loader.next_request().unwrap();
        loader.apply_page(page(&["SPY", "QQQ"], 4, true));
        loader.next_request().unwrap();
        loader.reset();

        // The outstanding page lands after the reset and is discarded.
        loader.apply_page(page(&["VOO", "VTI"], 4, true));
        assert_eq!(loader.progress(), (0, 0));
        assert!(!loader.is_loading());

        // The chain restarts from offset 0 and records count once.
        let req = loader.next_request().unwrap();
        assert_eq!(req.offset, 0);
        loader.apply_page(page(&["SPY", "QQQ"], 4, true));
        let req = loader.next_request().unwrap();
        assert_eq!(req.offset, 2);
        loader.apply_page(page(&["VOO", "VTI"], 4, false));
        assert_eq!(loader.progress(), (4, 4));
        assert_eq!(loader.etfs().len(), 4);
    }

    #[test]
    fn picker_merge_keeps_filter_and_deduplicates() {
        let mut picker = EtfPicker::new(&[etf("SPY"), etf("QQQ")]);
        picker.push_filter('s');
        picker.merge(&[etf("SPY"), etf("SCHD")]);
        assert_eq!(picker.len(), 3);
        assert_eq!(picker.filter, "s");
        let matches = picker.matches();
        assert!(matches.iter().any(|e| e.ticker == "SCHD"));
        assert!(!matches.iter().any(|e| e.ticker == "QQQ"));
    }

    #[test]
    fn picker_selection_clamps_to_matches() {
        let mut picker = EtfPicker::new(&[etf("SPY"), etf("QQQ"), etf("VOO")]);
        picker.select_next();
        picker.select_next();
        assert_eq!(picker.selected_etf().unwrap().ticker, "VOO");
        picker.push_filter('q');
        assert_eq!(picker.selected_etf().unwrap().ticker, "QQQ");
    }
}
