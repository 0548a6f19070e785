use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One ETF as returned by the holdings list and the catalog.
///
/// The server also sends `id`/`created_at`/`updated_at` on registered ETFs;
/// the client keys everything by ticker and ignores the rest.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Etf {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Body of `POST /etf/`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewEtf {
    pub ticker: String,
    pub name: String,
    pub market: Option<String>,
    pub category: Option<String>,
}

impl NewEtf {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        NewEtf {
            ticker: ticker.into(),
            name: name.into(),
            market: None,
            category: None,
        }
    }
}

/// One page of the selectable ETF universe (`GET /etf/list?limit&offset`).
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    pub etfs: Vec<Etf>,
    pub total: usize,
    pub has_more: bool,
}

/// Aggregate figures from `GET /portfolio/summary`.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub current_value: f64,
    pub total_return: f64,
    pub return_rate: f64,
    pub total_dividends: f64,
}

/// Per-ETF analytics from `GET /etf/{ticker}/analytics?period`.
///
/// All metrics are server-computed; the client renders them verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct Analytics {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    pub current_price: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub dividend_yield: f64,
    pub total_dividends: f64,
}

/// Chart endpoints return the plot specification as an embedded JSON string.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartPayload {
    pub chart: String,
}

/// One scored ETF inside a recommendation category.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScoredEtf {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub cagr: f64,
    #[serde(default)]
    pub volatility: f64,
    #[serde(default)]
    pub sharpe_ratio: f64,
    #[serde(default)]
    pub max_drawdown: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub total_return: f64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RecommendationMetadata {
    #[serde(default)]
    pub total_analyzed: usize,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub category: String,
}

/// The full multi-category payload of `GET /portfolio/recommendations`.
///
/// Held in memory as-is; tab switches re-render from this without a fetch.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Recommendations {
    #[serde(default)]
    pub high_return: Vec<ScoredEtf>,
    #[serde(default)]
    pub stable: Vec<ScoredEtf>,
    #[serde(default)]
    pub high_dividend: Vec<ScoredEtf>,
    #[serde(default)]
    pub balanced: Vec<ScoredEtf>,
    #[serde(default)]
    pub metadata: RecommendationMetadata,
}

/// Pairwise correlation matrix as pandas' `to_dict()` emits it:
/// column ticker -> (row ticker -> coefficient).
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CorrelationPair {
    pub etf1: String,
    pub etf2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Diversification {
    pub diversification_score: i64,
    pub rating: String,
    pub advice: String,
    pub average_correlation: f64,
    pub max_correlation: f64,
    pub min_correlation: f64,
    #[serde(default)]
    pub high_correlation_pairs: Vec<CorrelationPair>,
}

/// One group from `GET /portfolio/correlation` before classification.
///
/// A group carries exactly one of: an explanatory `message` (fewer than two
/// comparable ETFs), an `error`, or a full result. The raw payload is not
/// trusted to uphold that; `correlation::classify` enforces the priority.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationGroup {
    pub name: String,
    #[serde(default)]
    pub etf_names: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub correlation_matrix: Option<CorrelationMatrix>,
    #[serde(default)]
    pub diversification: Option<Diversification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationReport {
    pub groups: Vec<CorrelationGroup>,
    #[serde(default)]
    pub total_etfs: usize,
    #[serde(default)]
    pub period: String,
}

/// Diagnostic payload of `GET /db-info`.
#[derive(Debug, Clone, Deserialize)]
pub struct DbInfo {
    pub database_type: String,
    pub environment: String,
    pub status: String,
    pub connection_url: String,
}

/// One glossary entry. Everything past `description` is optional and only
/// rendered when present and non-empty.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Term {
    pub term: String,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub tip: Option<String>,
    #[serde(default)]
    pub related: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub meme: Option<String>,
    /// Present on search results; merged in client-side for category views.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermSearchResults {
    pub query: String,
    pub results: Vec<Term>,
    pub total: usize,
}

/// Full glossary: category name -> (term key -> term).
#[derive(Debug, Clone, Deserialize)]
pub struct AllTerms {
    pub categories: Vec<String>,
    pub terms: BTreeMap<String, BTreeMap<String, Term>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryTerms {
    pub category: String,
    pub terms: BTreeMap<String, Term>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_catalog_page() {
        let page: CatalogPage = serde_json::from_str(
            r#"{"etfs":[{"ticker":"SPY","name":"SPDR S&P 500","market":"NYSE","category":"US ETF"}],
                "total":812,"has_more":true}"#,
        )
        .unwrap();
        assert_eq!(page.etfs.len(), 1);
        assert_eq!(page.etfs[0].ticker, "SPY");
        assert!(page.has_more);
    }

    #[test]
    fn decode_etf_tolerates_extra_server_fields() {
        let etf: Etf = serde_json::from_str(
            r#"{"id":3,"ticker":"069500.KS","name":"KODEX 200","market":null,"category":null,
                "created_at":"2024-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(etf.name, "KODEX 200");
        assert!(etf.market.is_none());
    }

    #[test]
    fn decode_recommendations_with_missing_category() {
        // A category key the server omitted decodes as an empty list.
        let recs: Recommendations = serde_json::from_str(
            r#"{"high_return":[{"ticker":"QQQ","name":"Invesco QQQ","cagr":18.2}],
                "metadata":{"total_analyzed":20,"period":"5y","category":"all"}}"#,
        )
        .unwrap();
        assert_eq!(recs.high_return.len(), 1);
        assert!(recs.stable.is_empty());
        assert_eq!(recs.metadata.total_analyzed, 20);
    }

    #[test]
    fn decode_degenerate_correlation_group() {
        let group: CorrelationGroup = serde_json::from_str(
            r#"{"name":"Korean ETF","etf_count":1,"etf_names":["KODEX 200"],
                "message":"Add one more to compare."}"#,
        )
        .unwrap();
        assert!(group.message.is_some());
        assert!(group.diversification.is_none());
    }

    #[test]
    fn decode_term_with_optional_fields_absent() {
        let term: Term =
            serde_json::from_str(r#"{"term":"Buy","description":"Buying a position"}"#).unwrap();
        assert!(term.english.is_none());
        assert!(term.meme.is_none());
    }
}
