use serde::Serialize;
use thiserror::Error;
use unfold_http::HttpError;

/// How a scrape concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Browser pipeline produced text.
    Ok,
    /// Browser pipeline ran but the page has no text.
    EmptyPage,
    /// Browser pipeline failed; content comes from the plain HTTP fallback.
    Degraded,
    /// Both paths failed.
    Failed,
}

/// Text extracted from one page.
///
/// `content` is whitespace-normalized, never markup, and at most
/// [`unfold_common::text::CONTENT_CAP`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeResult {
    pub url: String,
    pub content: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ScrapeResult {
    pub fn failed(url: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: String::new(),
            outcome: Outcome::Failed,
            cause: Some(cause.into()),
        }
    }

    /// Turn a `Failed` outcome into an error; every other outcome is a success.
    ///
    /// ```
    /// use unfold_web::{Outcome, ScrapeError, ScrapeResult};
    ///
    /// let failed = ScrapeResult::failed("https://example.com", "connection refused");
    /// assert!(matches!(failed.into_result(), Err(ScrapeError::Failed { .. })));
    ///
    /// let empty = ScrapeResult {
    ///     url: "https://example.com".into(),
    ///     content: String::new(),
    ///     outcome: Outcome::EmptyPage,
    ///     cause: None,
    /// };
    /// assert!(empty.into_result().is_ok());
    /// ```
    pub fn into_result(self) -> Result<ScrapeResult, ScrapeError> {
        match self.outcome {
            Outcome::Failed => Err(ScrapeError::Failed {
                cause: self.cause.unwrap_or_else(|| "unknown failure".to_string()),
                url: self.url,
            }),
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("scrape of {url} failed: {cause}")]
    Failed { url: String, cause: String },
    #[error("failed to build fallback client: {0}")]
    Setup(#[from] HttpError),
}
