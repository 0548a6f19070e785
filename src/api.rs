//! Thin access layer over the ETFolio REST API.
//!
//! Every endpoint maps to one method returning a typed payload. Non-success
//! responses are decoded as an optional `{"detail": ...}` body and classified
//! into an [`ApiErrorKind`] here, at the boundary, so callers never have to
//! inspect message text.

use log::debug;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, ApiErrorKind};
use crate::model::{
    AllTerms, Analytics, CatalogPage, CategoryTerms, ChartPayload, CorrelationReport, DbInfo, Etf,
    NewEtf, PortfolioSummary, Recommendations, TermSearchResults,
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// `base_url` is the versioned API prefix, e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: &str) -> eyre::Result<ApiClient> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            eyre::bail!("API base URL must be an absolute http(s) URL: {base_url}");
        }
        Ok(ApiClient {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// Joins path segments onto the base, percent-encoding each segment.
    /// An empty trailing segment produces the trailing slash some routes require.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .expect("base URL is validated at construction")
            .pop_if_empty()
            .extend(segments);
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!("GET {url}");
        let resp = self.http.get(url).query(query).send().await?;
        decode(resp).await
    }

    pub async fn holdings(&self) -> Result<Vec<Etf>, ApiError> {
        self.get_json(self.url(&["etf", ""]), &[]).await
    }

    pub async fn add_etf(&self, etf: &NewEtf) -> Result<Etf, ApiError> {
        let url = self.url(&["etf", ""]);
        debug!("POST {url} ({})", etf.ticker);
        let resp = self.http.post(url).json(etf).send().await?;
        decode(resp).await
    }

    pub async fn delete_etf(&self, ticker: &str) -> Result<(), ApiError> {
        let url = self.url(&["etf", ticker]);
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().await?;
        decode::<serde_json::Value>(resp).await.map(|_| ())
    }

    pub async fn catalog_page(&self, limit: usize, offset: usize) -> Result<CatalogPage, ApiError> {
        self.get_json(
            self.url(&["etf", "list"]),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    pub async fn analytics(&self, ticker: &str, period: &str) -> Result<Analytics, ApiError> {
        self.get_json(
            self.url(&["etf", ticker, "analytics"]),
            &[("period", period.to_string())],
        )
        .await
    }

    pub async fn price_chart(&self, ticker: &str, period: &str) -> Result<ChartPayload, ApiError> {
        self.get_json(
            self.url(&["etf", ticker, "chart", "price"]),
            &[("period", period.to_string())],
        )
        .await
    }

    // The dividend chart covers the full dividend history; it takes no period.
    pub async fn dividend_chart(&self, ticker: &str) -> Result<ChartPayload, ApiError> {
        self.get_json(self.url(&["etf", ticker, "chart", "dividend"]), &[])
            .await
    }

    pub async fn cumulative_return_chart(
        &self,
        ticker: &str,
        period: &str,
    ) -> Result<ChartPayload, ApiError> {
        self.get_json(
            self.url(&["etf", ticker, "chart", "cumulative-return"]),
            &[("period", period.to_string())],
        )
        .await
    }

    pub async fn portfolio_summary(&self) -> Result<PortfolioSummary, ApiError> {
        self.get_json(self.url(&["portfolio", "summary"]), &[]).await
    }

    pub async fn recommendations(
        &self,
        category: &str,
        period: &str,
        limit: usize,
    ) -> Result<Recommendations, ApiError> {
        self.get_json(
            self.url(&["portfolio", "recommendations"]),
            &[
                ("category", category.to_string()),
                ("period", period.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    pub async fn correlation(&self, period: &str) -> Result<CorrelationReport, ApiError> {
        self.get_json(
            self.url(&["portfolio", "correlation"]),
            &[("period", period.to_string())],
        )
        .await
    }

    pub async fn db_info(&self) -> Result<DbInfo, ApiError> {
        self.get_json(self.url(&["db-info"]), &[]).await
    }

    pub async fn search_terms(&self, query: &str) -> Result<TermSearchResults, ApiError> {
        self.get_json(
            self.url(&["dictionary", "search"]),
            &[("q", query.to_string())],
        )
        .await
    }

    pub async fn all_terms(&self) -> Result<AllTerms, ApiError> {
        self.get_json(self.url(&["dictionary", "categories"]), &[])
            .await
    }

    pub async fn category_terms(&self, category: &str) -> Result<CategoryTerms, ApiError> {
        self.get_json(self.url(&["dictionary", "categories", category]), &[])
            .await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    } else {
        // A structured detail is optional; fall back to a generic message.
        let detail = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| format!("request failed with HTTP {status}"));
        let kind = ApiErrorKind::classify(status.as_u16(), &detail);
        Err(ApiError::Api {
            kind,
            status: status.as_u16(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8000/api/v1").unwrap()
    }

    #[test]
    fn url_keeps_trailing_slash_for_collection_routes() {
        let url = client().url(&["etf", ""]);
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/etf/");
    }

    #[test]
    fn url_encodes_path_segments() {
        // Korean glossary categories land in the path and must be escaped.
        let url = client().url(&["dictionary", "categories", "ETF 용어"]);
        assert!(url.path().starts_with("/api/v1/dictionary/categories/ETF%20"));
    }

    #[test]
    fn base_url_with_trailing_slash_is_equivalent() {
        let a = ApiClient::new("http://localhost:8000/api/v1").unwrap();
        let b = ApiClient::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(a.url(&["db-info"]), b.url(&["db-info"]));
    }

    #[test]
    fn rejects_non_base_url() {
        assert!(ApiClient::new("mailto:nobody@example.com").is_err());
    }
}
