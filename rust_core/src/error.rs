//! Error taxonomy for the reconciliation engine.
//!
//! Only two conditions surface to callers as request failures: a missing
//! primary entity and structurally invalid request parameters. Everything
//! else (ambiguous identity, upstream enrichment failures, malformed stored
//! blobs) is absorbed locally with a documented default, because the value
//! of the aggregate view is completeness even when individual inputs are
//! degraded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    /// Requested primary entity does not exist (404-equivalent).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Structurally invalid request parameter (400-equivalent).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence layer failure.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type HubResult<T> = Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(HubError::NotFound("match").to_string(), "match not found");
        assert_eq!(
            HubError::InvalidRequest("empty match id".to_string()).to_string(),
            "invalid request: empty match id"
        );
    }
}
