//! One browser session per request: launch, navigate, trigger, extract, close.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use unfold_common::{ScrapeConfig, StageOutcome};
use unfold_drivers::{BrowserSession, SessionLauncher, WaitStrategy};

use crate::extract::ContentExtractor;
use crate::trigger::DynamicContentTrigger;

/// Where the browser pipeline gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Launch,
    Navigation,
    Trigger,
    Extraction,
    Timeout,
    Panic,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Launch => "launch",
            PipelineStage::Navigation => "navigation",
            PipelineStage::Trigger => "trigger",
            PipelineStage::Extraction => "extraction",
            PipelineStage::Timeout => "timeout",
            PipelineStage::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// Result of the browser half of a scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCapture {
    /// Normalized text, possibly empty, plus any absorbed faults.
    Extracted {
        content: String,
        cause: Option<String>,
    },
    Failed {
        stage: PipelineStage,
        cause: String,
    },
}

/// Browser settings fixed for the lifetime of an engine.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub scrape: ScrapeConfig,
    pub page_load_timeout: Duration,
}

/// Run the full browser pipeline for `url`.
///
/// A launched session is closed exactly once before this returns, whatever the
/// pipeline did, including timing out or panicking. A close that outlives
/// `close_timeout_secs` is abandoned and the session's processes are killed.
pub async fn capture<L>(
    launcher: &L,
    url: &str,
    settings: &PipelineSettings,
    wait: &dyn WaitStrategy,
) -> BrowserCapture
where
    L: SessionLauncher + ?Sized,
{
    let mut session = match launcher.launch().await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(url, error = %err, "browser.launch_failed");
            return BrowserCapture::Failed {
                stage: PipelineStage::Launch,
                cause: err.to_string(),
            };
        }
    };
    let session_id = session.id().to_string();
    tracing::debug!(url, session = %session_id, "browser.pipeline.start");

    let work = AssertUnwindSafe(run_stages(&session, url, settings, wait)).catch_unwind();
    let captured = match tokio::time::timeout(settings.scrape.pipeline_timeout(), work).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(payload)) => {
            let cause = panic_message(payload.as_ref());
            tracing::error!(url, session = %session_id, cause = %cause, "browser.pipeline.panicked");
            BrowserCapture::Failed {
                stage: PipelineStage::Panic,
                cause,
            }
        }
        Err(_) => {
            tracing::warn!(
                url,
                session = %session_id,
                timeout_secs = settings.scrape.pipeline_timeout_secs,
                "browser.pipeline.timed_out"
            );
            BrowserCapture::Failed {
                stage: PipelineStage::Timeout,
                cause: format!(
                    "pipeline exceeded {}s",
                    settings.scrape.pipeline_timeout_secs
                ),
            }
        }
    };

    match tokio::time::timeout(settings.scrape.close_timeout(), session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(session = %session_id, error = %err, "browser.close_failed");
        }
        Err(_) => {
            tracing::warn!(
                session = %session_id,
                timeout_secs = settings.scrape.close_timeout_secs,
                "browser.close_timed_out"
            );
            session.abort();
        }
    }
    captured
}

async fn run_stages<S>(
    session: &S,
    url: &str,
    settings: &PipelineSettings,
    wait: &dyn WaitStrategy,
) -> BrowserCapture
where
    S: BrowserSession + ?Sized,
{
    if let Err(err) = session.navigate(url, settings.page_load_timeout).await {
        tracing::warn!(url, error = %err, "browser.navigation_failed");
        return BrowserCapture::Failed {
            stage: PipelineStage::Navigation,
            cause: err.to_string(),
        };
    }

    let mut reasons = Vec::new();
    let report = match DynamicContentTrigger::new(&settings.scrape, wait)
        .run(session)
        .await
    {
        StageOutcome::Ok(report) => report,
        StageOutcome::Recoverable { value, reason } => {
            reasons.push(format!("trigger: {reason}"));
            value
        }
        StageOutcome::Fatal(cause) => {
            return BrowserCapture::Failed {
                stage: PipelineStage::Trigger,
                cause,
            };
        }
    };

    let content = match ContentExtractor
        .extract(session, &report.frame_texts)
        .await
    {
        StageOutcome::Ok(content) => content,
        StageOutcome::Recoverable { value, reason } => {
            reasons.push(format!("extract: {reason}"));
            value
        }
        StageOutcome::Fatal(cause) => {
            return BrowserCapture::Failed {
                stage: PipelineStage::Extraction,
                cause,
            };
        }
    };

    BrowserCapture::Extracted {
        content,
        cause: (!reasons.is_empty()).then(|| reasons.join("; ")),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
