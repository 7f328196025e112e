use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use unfold_common::UnfoldConfig;
use unfold_drivers::{ChromeLauncher, FixedDelay, SessionLauncher, WaitStrategy};
use url::Url;

use crate::browser::{self, BrowserCapture, PipelineSettings};
use crate::fallback::FallbackFetcher;
use crate::types::{Outcome, ScrapeError, ScrapeResult};

/// Entry point for page scrapes.
///
/// Each call gets its own browser session; at most `max_concurrent_sessions`
/// sessions run at once and further calls wait for a slot.
pub struct ScrapeEngine<L> {
    launcher: L,
    settings: PipelineSettings,
    wait: Arc<dyn WaitStrategy>,
    fallback: FallbackFetcher,
    slots: Arc<Semaphore>,
}

impl ScrapeEngine<ChromeLauncher> {
    /// Engine driving real Chrome sessions with fixed settle delays.
    pub fn from_config(config: &UnfoldConfig) -> Result<Self, ScrapeError> {
        let launcher = ChromeLauncher::new(config.browser.clone());
        Self::new(launcher, config)
    }
}

impl<L> ScrapeEngine<L>
where
    L: SessionLauncher,
{
    pub fn new(launcher: L, config: &UnfoldConfig) -> Result<Self, ScrapeError> {
        let scrape = config.scrape.clone();
        let fallback = FallbackFetcher::new(&scrape.user_agent, scrape.fallback_timeout())?;
        let slots = Arc::new(Semaphore::new(scrape.max_concurrent_sessions.max(1)));
        Ok(Self {
            launcher,
            settings: PipelineSettings {
                scrape,
                page_load_timeout: config.browser.page_load_timeout(),
            },
            wait: Arc::new(FixedDelay),
            fallback,
            slots,
        })
    }

    /// Replace the settle strategy used between interactions.
    pub fn with_wait_strategy(mut self, wait: Arc<dyn WaitStrategy>) -> Self {
        self.wait = wait;
        self
    }

    /// Scrape one page.
    ///
    /// Only pre-flight rejection is an `Err`. Every other path, including total
    /// failure, yields a [`ScrapeResult`] whose outcome says what happened.
    pub async fn scrape_page(&self, url: &str) -> Result<ScrapeResult, ScrapeError> {
        let target = validate_url(url)?;
        let started = Instant::now();
        tracing::info!(url = %target, "scrape.start");

        let capture = match self.slots.acquire().await {
            Ok(_slot) => {
                browser::capture(
                    &self.launcher,
                    target.as_str(),
                    &self.settings,
                    self.wait.as_ref(),
                )
                .await
            }
            Err(_) => return Ok(ScrapeResult::failed(url, "engine is shut down")),
        };

        let result = match capture {
            BrowserCapture::Extracted { content, cause } => {
                let outcome = if content.is_empty() {
                    Outcome::EmptyPage
                } else {
                    Outcome::Ok
                };
                ScrapeResult {
                    url: url.to_string(),
                    content,
                    outcome,
                    cause,
                }
            }
            BrowserCapture::Failed { stage, cause } => {
                tracing::warn!(url = %target, %stage, cause = %cause, "scrape.browser_failed");
                let mut result = self
                    .fallback
                    .fetch(target.as_str(), &format!("{stage}: {cause}"))
                    .await;
                result.url = url.to_string();
                result
            }
        };

        tracing::info!(
            url = %target,
            outcome = ?result.outcome,
            chars = result.content.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scrape.done"
        );
        Ok(result)
    }
}

/// Accept only absolute `http`/`https` URLs.
pub fn validate_url(raw: &str) -> Result<Url, ScrapeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::InvalidInput("url is empty".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ScrapeError::InvalidInput(format!("{trimmed:?} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(url),
        "http" | "https" => Err(ScrapeError::InvalidInput(format!(
            "{trimmed:?} has no host"
        ))),
        other => Err(ScrapeError::InvalidInput(format!(
            "unsupported scheme {other:?}; expected http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_web_urls() {
        assert!(validate_url("https://example.com/a?b=c").is_ok());
        assert!(validate_url(" http://localhost:8080 ").is_ok());
    }

    #[test]
    fn rejects_everything_else() {
        for bad in [
            "",
            "   ",
            "example.com",
            "/relative/path",
            "ftp://example.com/file",
            "file:///etc/passwd",
            "javascript:alert(1)",
            "data:text/html,hi",
        ] {
            assert!(
                matches!(validate_url(bad), Err(ScrapeError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
