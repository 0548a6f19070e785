//! Dictionary browser: free-text search and category filtering over the
//! glossary, rendered as term cards.

use crate::model::{AllTerms, CategoryTerms, Term, TermSearchResults};

pub const ALL_CATEGORIES: &str = "all";
pub const NO_RESULTS: &str = "No matching terms found.";
pub const EMPTY_CATEGORY: &str = "No terms in this category.";

/// Display-only card styling from the category label. Substring-based by
/// design: category labels are free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStyle {
    Slang,
    Etf,
    Indicator,
    Plain,
}

pub fn category_style(category: &str) -> CategoryStyle {
    if category.contains("은어") || category.contains("밈") {
        CategoryStyle::Slang
    } else if category.contains("ETF") {
        CategoryStyle::Etf
    } else if category.contains("지표") {
        CategoryStyle::Indicator
    } else {
        CategoryStyle::Plain
    }
}

/// One rendered term card. Optional fields appear as labeled sections only
/// when present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TermCard {
    pub title: String,
    pub category: String,
    pub style: CategoryStyle,
    pub description: String,
    pub sections: Vec<(&'static str, String)>,
}

impl TermCard {
    pub fn build(term: &Term) -> TermCard {
        let category = term.category.clone().unwrap_or_default();
        let mut sections = Vec::new();
        let mut push = |label: &'static str, field: &Option<String>| {
            if let Some(text) = field {
                if !text.is_empty() {
                    sections.push((label, text.clone()));
                }
            }
        };
        push("English", &term.english);
        push("Example", &term.example);
        push("Formula", &term.formula);
        push("Warning", &term.warning);
        push("Tip", &term.tip);
        push("Related", &term.related);
        push("", &term.emoji);
        push("", &term.meme);

        TermCard {
            title: term.term.clone(),
            style: category_style(&category),
            category,
            description: term.description.clone(),
            sections,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum DictionaryView<'a> {
    Loading,
    Empty(&'a str),
    Terms(&'a [Term]),
    Error(&'a str),
}

/// Page-level controller: holds the current listing, the active filter and
/// the search-result count label.
pub struct DictionaryPanel {
    terms: Vec<Term>,
    result_label: Option<String>,
    active_category: String,
    pub query: String,
    pub selected: usize,
    loading: bool,
    error: Option<String>,
}

impl Default for DictionaryPanel {
    fn default() -> Self {
        DictionaryPanel {
            terms: Vec::new(),
            result_label: None,
            active_category: ALL_CATEGORIES.to_string(),
            query: String::new(),
            selected: 0,
            loading: false,
            error: None,
        }
    }
}

impl DictionaryPanel {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Applies search results for a non-empty query. An empty query is not a
    /// search: the driver clears state and fetches the full listing instead.
    pub fn apply_search(&mut self, results: TermSearchResults) {
        self.terms = results.results;
        self.result_label = Some(format!(
            "\"{}\" matched {} terms",
            results.query,
            self.terms.len()
        ));
        self.loading = false;
        self.error = None;
        self.selected = 0;
    }

    /// The "all" view: every category's terms flattened into one listing
    /// tagged with their source category.
    pub fn apply_all(&mut self, all: AllTerms) {
        self.terms = all
            .terms
            .into_iter()
            .flat_map(|(category, terms)| {
                terms.into_values().map(move |mut term| {
                    term.category = Some(category.clone());
                    term
                })
            })
            .collect();
        self.finish_filter(ALL_CATEGORIES.to_string());
    }

    pub fn apply_category(&mut self, payload: CategoryTerms) {
        let category = payload.category;
        self.terms = payload
            .terms
            .into_values()
            .map(|mut term| {
                term.category = Some(category.clone());
                term
            })
            .collect();
        self.finish_filter(category);
    }

    // Selecting any filter clears the active search and its count label.
    fn finish_filter(&mut self, category: String) {
        self.active_category = category;
        self.query.clear();
        self.result_label = None;
        self.loading = false;
        self.error = None;
        self.selected = 0;
    }

    pub fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    pub fn view(&self) -> DictionaryView<'_> {
        if let Some(error) = &self.error {
            return DictionaryView::Error(error);
        }
        if self.loading {
            return DictionaryView::Loading;
        }
        if self.terms.is_empty() {
            let message = if self.result_label.is_some() {
                NO_RESULTS
            } else {
                EMPTY_CATEGORY
            };
            return DictionaryView::Empty(message);
        }
        DictionaryView::Terms(&self.terms)
    }

    pub fn result_label(&self) -> Option<&str> {
        self.result_label.as_deref()
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.terms.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

// CLI report for the `dict` subcommand.
pub fn print(terms: &[Term]) {
    if terms.is_empty() {
        println!("{NO_RESULTS}");
        return;
    }
    for term in terms {
        let card = TermCard::build(term);
        if card.category.is_empty() {
            println!("\n== {} ==", card.title);
        } else {
            println!("\n== {} [{}] ==", card.title, card.category);
        }
        println!("{}", card.description);
        for (label, text) in &card.sections {
            if label.is_empty() {
                println!("{text}");
            } else {
                println!("{label}: {text}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn term(name: &str) -> Term {
        Term {
            term: name.to_string(),
            description: format!("{name} description"),
            ..Term::default()
        }
    }

    fn all_terms() -> AllTerms {
        let mut terms = BTreeMap::new();
        let mut general = BTreeMap::new();
        general.insert("Buy".to_string(), term("Buy"));
        general.insert("Sell".to_string(), term("Sell"));
        let mut etf = BTreeMap::new();
        etf.insert("NAV".to_string(), term("NAV"));
        terms.insert("General".to_string(), general);
        terms.insert("ETF 용어".to_string(), etf);
        AllTerms {
            categories: vec!["General".to_string(), "ETF 용어".to_string()],
            terms,
        }
    }

    #[test]
    fn all_view_flattens_and_tags_source_category() {
        let mut panel = DictionaryPanel::default();
        panel.apply_all(all_terms());
        assert_eq!(panel.terms().len(), 3);
        assert!(panel
            .terms()
            .iter()
            .any(|t| t.term == "NAV" && t.category.as_deref() == Some("ETF 용어")));
    }

    #[test]
    fn empty_query_after_search_restores_listing_and_clears_label() {
        let mut panel = DictionaryPanel::default();
        panel.apply_search(TermSearchResults {
            query: "buy".to_string(),
            results: vec![term("Buy")],
            total: 1,
        });
        assert!(panel.result_label().unwrap().contains("buy"));

        // Driver behavior for an empty query: back to the full listing.
        panel.apply_all(all_terms());
        assert_eq!(panel.terms().len(), 3);
        assert!(panel.result_label().is_none());
        assert!(panel.query.is_empty());
    }

    #[test]
    fn no_results_renders_search_empty_state() {
        let mut panel = DictionaryPanel::default();
        panel.apply_search(TermSearchResults {
            query: "zzz".to_string(),
            results: Vec::new(),
            total: 0,
        });
        assert_eq!(panel.view(), DictionaryView::Empty(NO_RESULTS));
    }

    #[test]
    fn term_views_compare_by_contents() {
        let mut panel = DictionaryPanel::default();
        panel.apply_search(TermSearchResults {
            query: "buy".to_string(),
            results: vec![term("Buy")],
            total: 1,
        });
        assert_eq!(panel.view(), DictionaryView::Terms(&[term("Buy")]));
    }

    #[test]
    fn filter_clears_active_search() {
        let mut panel = DictionaryPanel::default();
        panel.query = "nav".to_string();
        panel.apply_search(TermSearchResults {
            query: "nav".to_string(),
            results: vec![term("NAV")],
            total: 1,
        });
        panel.apply_category(CategoryTerms {
            category: "General".to_string(),
            terms: BTreeMap::from([("Buy".to_string(), term("Buy"))]),
            total: 1,
        });
        assert!(panel.query.is_empty());
        assert!(panel.result_label().is_none());
        assert_eq!(panel.active_category(), "General");
    }

    #[test]
    fn card_renders_only_present_optional_fields() {
        let mut t = term("Sharpe");
        t.english = Some("Sharpe Ratio".to_string());
        t.formula = Some("(Rp - Rf) / sigma".to_string());
        t.tip = Some(String::new()); // present but empty: skipped
        let card = TermCard::build(&t);
        let labels: Vec<&str> = card.sections.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["English", "Formula"]);
    }

    #[test]
    fn category_styles_map_by_substring() {
        assert_eq!(category_style("주식 은어/밈"), CategoryStyle::Slang);
        assert_eq!(category_style("ETF 용어"), CategoryStyle::Etf);
        assert_eq!(category_style("투자 지표"), CategoryStyle::Indicator);
        assert_eq!(category_style("General"), CategoryStyle::Plain);
    }
}
