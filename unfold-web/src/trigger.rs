//! Reveals content that only exists after scrolling, clicking, or entering frames.
//!
//! The pass is best-effort. Individual scroll, click, and frame failures are recorded
//! and skipped; only a lost browser session ends it early.

use std::time::Duration;

use unfold_common::{ScrapeConfig, StageOutcome};
use unfold_drivers::{DriverError, PageDriver, Probe, WaitStrategy};

/// Affordances that usually hide content behind a click, in the order they are tried.
pub const EXPANDABLE_PROBES: &[Probe] = &[
    Probe::Css("button.dropdown-toggle"),
    Probe::Css(".accordion-toggle"),
    Probe::Css(".accordion-button"),
    Probe::Css("details summary"),
    Probe::Css("[aria-expanded='false']"),
    Probe::Css(".expander"),
    Probe::Css(".toggleButton"),
    Probe::XPath(
        "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'show more')]",
    ),
    Probe::XPath(
        "//a[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'read more')]",
    ),
    Probe::Css(".show-more"),
    Probe::Css(".read-more"),
    Probe::Css(".view-more"),
    Probe::Css(".collapsible"),
    Probe::Css(".expandable"),
    Probe::Css(".toggle"),
];

/// What the trigger pass did to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerReport {
    pub scroll_steps: u32,
    pub final_height: u64,
    /// True when the sweep stopped at `max_scroll_steps` before reaching the bottom.
    pub scroll_capped: bool,
    pub clicked: usize,
    /// Candidates that were hidden or disabled.
    pub skipped: usize,
    pub interaction_faults: usize,
    /// Body text of every readable frame, in document order.
    pub frame_texts: Vec<String>,
}

/// Scroll sweep, expansion clicks, frame pass, and final settle.
pub struct DynamicContentTrigger<'a> {
    config: &'a ScrapeConfig,
    wait: &'a dyn WaitStrategy,
}

impl<'a> DynamicContentTrigger<'a> {
    pub fn new(config: &'a ScrapeConfig, wait: &'a dyn WaitStrategy) -> Self {
        Self { config, wait }
    }

    /// Run every phase against `page`.
    ///
    /// Returns `Fatal` only when the session is lost; absorbed faults surface as
    /// `Recoverable` with the report still attached.
    pub async fn run<P>(&self, page: &P) -> StageOutcome<TriggerReport>
    where
        P: PageDriver + ?Sized,
    {
        let mut report = TriggerReport::default();
        let mut faults = Vec::new();

        match self.drive(page, &mut report, &mut faults).await {
            Ok(()) => {
                tracing::debug!(
                    scroll_steps = report.scroll_steps,
                    final_height = report.final_height,
                    clicked = report.clicked,
                    skipped = report.skipped,
                    interaction_faults = report.interaction_faults,
                    frames = report.frame_texts.len(),
                    "trigger.done"
                );
                StageOutcome::from_faults(report, &faults)
            }
            Err(err) => {
                tracing::warn!(error = %err, "trigger.session_lost");
                StageOutcome::Fatal(err.to_string())
            }
        }
    }

    async fn drive<P>(
        &self,
        page: &P,
        report: &mut TriggerReport,
        faults: &mut Vec<String>,
    ) -> Result<(), DriverError>
    where
        P: PageDriver + ?Sized,
    {
        self.wait.settle(ms(self.config.initial_settle_ms)).await;

        self.sweep(page, report, faults).await?;

        absorb(page.scroll_to(0).await, "scroll to top", faults)?;
        self.wait.settle(ms(self.config.top_reset_settle_ms)).await;

        self.expand(page, report, faults).await?;
        self.read_frames(page, report, faults).await?;

        absorb(page.scroll_to_bottom().await, "final scroll", faults)?;
        self.wait.settle(ms(self.config.final_settle_ms)).await;
        Ok(())
    }

    /// Step down the page, re-reading the height so lazy loaders extend the sweep.
    async fn sweep<P>(
        &self,
        page: &P,
        report: &mut TriggerReport,
        faults: &mut Vec<String>,
    ) -> Result<(), DriverError>
    where
        P: PageDriver + ?Sized,
    {
        let step = self.config.scroll_step_px.max(1);
        let mut total = absorb(page.scroll_height().await, "scroll height", faults)?.unwrap_or(0);
        let mut cursor = 0u64;

        while cursor < total {
            if report.scroll_steps >= self.config.max_scroll_steps {
                report.scroll_capped = true;
                tracing::info!(
                    steps = report.scroll_steps,
                    height = total,
                    "trigger.scroll.capped"
                );
                break;
            }
            cursor = cursor.saturating_add(step);
            absorb(page.scroll_to(cursor).await, "scroll", faults)?;
            self.wait.settle(ms(self.config.scroll_settle_ms)).await;
            report.scroll_steps += 1;

            if let Some(height) = absorb(page.scroll_height().await, "scroll height", faults)? {
                total = height;
            }
        }

        report.final_height = total;
        tracing::debug!(steps = report.scroll_steps, height = total, "trigger.scroll.done");
        Ok(())
    }

    /// Click every visible, enabled candidate once per discovery. The same element
    /// may match several probes and is then clicked again.
    async fn expand<P>(
        &self,
        page: &P,
        report: &mut TriggerReport,
        faults: &mut Vec<String>,
    ) -> Result<(), DriverError>
    where
        P: PageDriver + ?Sized,
    {
        let mut failed = 0usize;

        for probe in EXPANDABLE_PROBES {
            let candidates = match page.find_all(probe).await {
                Ok(found) => found,
                Err(err) if err.is_session_lost() => return Err(err),
                Err(err) => {
                    tracing::debug!(%probe, error = %err, "trigger.expand.query_failed");
                    failed += 1;
                    continue;
                }
            };

            for candidate in &candidates {
                match page.is_interactable(candidate).await {
                    Ok(true) => {}
                    Ok(false) => {
                        report.skipped += 1;
                        continue;
                    }
                    Err(err) if err.is_session_lost() => return Err(err),
                    Err(err) => {
                        tracing::debug!(%probe, error = %err, "trigger.expand.state_failed");
                        failed += 1;
                        continue;
                    }
                }

                match page.force_click(candidate).await {
                    Ok(()) => {
                        report.clicked += 1;
                        self.wait.settle(ms(self.config.interaction_settle_ms)).await;
                    }
                    Err(err) if err.is_session_lost() => return Err(err),
                    Err(err) => {
                        tracing::debug!(%probe, error = %err, "trigger.expand.click_failed");
                        failed += 1;
                    }
                }
            }
        }

        report.interaction_faults = failed;
        if failed > 0 {
            faults.push(format!("{failed} interaction(s) failed"));
        }
        Ok(())
    }

    async fn read_frames<P>(
        &self,
        page: &P,
        report: &mut TriggerReport,
        faults: &mut Vec<String>,
    ) -> Result<(), DriverError>
    where
        P: PageDriver + ?Sized,
    {
        let count = absorb(page.frame_count().await, "frame count", faults)?.unwrap_or(0);

        for index in 0..count {
            if absorb(page.enter_frame(index).await, "enter frame", faults)?.is_some() {
                if let Some(text) = absorb(page.body_text().await, "frame text", faults)? {
                    if !text.trim().is_empty() {
                        report.frame_texts.push(text);
                    }
                }
            }
            absorb(page.leave_frame().await, "leave frame", faults)?;
        }
        Ok(())
    }
}

/// Keep going past a failed step unless the session itself is gone.
fn absorb<T>(
    result: Result<T, DriverError>,
    step: &str,
    faults: &mut Vec<String>,
) -> Result<Option<T>, DriverError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_session_lost() => Err(err),
        Err(err) => {
            tracing::debug!(step, error = %err, "trigger.step_failed");
            faults.push(format!("{step}: {err}"));
            Ok(None)
        }
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
    const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    #[test]
    fn text_probes_fold_case() {
        let text_probes: Vec<_> = EXPANDABLE_PROBES
            .iter()
            .filter_map(|p| match p {
                Probe::XPath(expr) => Some(*expr),
                Probe::Css(_) => None,
            })
            .collect();
        assert_eq!(text_probes.len(), 2);
        for expr in text_probes {
            assert!(expr.contains(UPPER) && expr.contains(LOWER));
        }
    }

    #[test]
    fn catalog_has_every_affordance() {
        assert_eq!(EXPANDABLE_PROBES.len(), 15);
        assert!(EXPANDABLE_PROBES.contains(&Probe::Css("details summary")));
        assert!(EXPANDABLE_PROBES.contains(&Probe::Css(".toggle")));
    }

    #[test]
    fn absorb_propagates_only_lost_sessions() {
        let mut faults = Vec::new();
        let soft: Result<(), _> = Err(DriverError::Command("stale".into()));
        assert!(matches!(absorb(soft, "click", &mut faults), Ok(None)));
        assert_eq!(faults, vec!["click: webdriver command failed: stale"]);

        let hard: Result<(), _> = Err(DriverError::SessionLost("gone".into()));
        assert!(absorb(hard, "click", &mut faults).is_err());
        assert_eq!(faults.len(), 1);
    }
}
