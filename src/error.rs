//! Error types shared by the API layer, the panels and the CLI.

use thiserror::Error;

/// Validation failures for user input. Messages are shown verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Ticker is required")]
    TickerRequired,

    #[error("Name is required")]
    NameRequired,

    #[error("No ETF selected")]
    NoTickerSelected,
}

/// What kind of failure the server reported.
///
/// Classified once at the API boundary from status code and `detail` body so
/// that panels can match on the kind instead of sniffing message substrings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The ticker is already registered (duplicate add).
    AlreadyRegistered,
    /// Unknown ticker or category.
    NotFound,
    /// Correlation needs at least two comparable ETFs.
    NotEnoughHoldings,
    /// Any other structured server failure.
    Server,
}

impl ApiErrorKind {
    /// Maps an HTTP status and the server's `detail` string to a kind.
    ///
    /// The backend carries no machine-readable code, so the substring
    /// matching the panels used to do lives here and nowhere else.
    pub fn classify(status: u16, detail: &str) -> ApiErrorKind {
        if status == 404 {
            return ApiErrorKind::NotFound;
        }
        if detail.contains("already registered") || detail.contains("이미 등록된") {
            return ApiErrorKind::AlreadyRegistered;
        }
        if detail.contains("at least 2") || detail.contains("2개 이상") {
            return ApiErrorKind::NotEnoughHoldings;
        }
        ApiErrorKind::Server
    }
}

/// Errors produced by the API access layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{detail}")]
    Api {
        kind: ApiErrorKind,
        status: u16,
        detail: String,
    },
}

impl ApiError {
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            ApiError::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The server-provided detail, if the failure carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Api { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_not_found_by_status() {
        assert_eq!(
            ApiErrorKind::classify(404, "ETF를 찾을 수 없습니다"),
            ApiErrorKind::NotFound
        );
    }

    #[test]
    fn classify_duplicate_add() {
        assert_eq!(
            ApiErrorKind::classify(400, "already registered"),
            ApiErrorKind::AlreadyRegistered
        );
        assert_eq!(
            ApiErrorKind::classify(400, "이미 등록된 ETF입니다"),
            ApiErrorKind::AlreadyRegistered
        );
    }

    #[test]
    fn classify_not_enough_holdings() {
        assert_eq!(
            ApiErrorKind::classify(400, "needs at least 2 comparable ETFs"),
            ApiErrorKind::NotEnoughHoldings
        );
    }

    #[test]
    fn classify_fallback_is_server() {
        assert_eq!(
            ApiErrorKind::classify(500, "something broke"),
            ApiErrorKind::Server
        );
    }
}
