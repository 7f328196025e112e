//! Reduces the rendered document to one bounded text payload.

use unfold_common::StageOutcome;
use unfold_common::text::normalize_and_cap;
use unfold_drivers::PageDriver;

/// Block-level tags whose rendered text is appended after the body text.
pub const SUPPLEMENTAL_TAGS: &[&str] = &["p", "div", "article", "section", "main"];

/// Aggregates body text, supplemental block text, and frame text.
///
/// Block text repeats what the body already holds; the duplication is kept so that
/// nothing the body text dropped is lost.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    /// Read the page and return its normalized, capped text.
    ///
    /// Without the body text the stage is `Fatal`. A failed supplemental tag is
    /// skipped and reported as `Recoverable`. An empty string is a valid result.
    pub async fn extract<P>(&self, page: &P, frame_texts: &[String]) -> StageOutcome<String>
    where
        P: PageDriver + ?Sized,
    {
        let body = match page.body_text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "extract.body_failed");
                return StageOutcome::Fatal(format!("body text unavailable: {err}"));
            }
        };

        let mut parts = vec![body];
        let mut faults = Vec::new();
        for tag in SUPPLEMENTAL_TAGS {
            match page.texts_of(tag).await {
                Ok(texts) => parts.extend(texts),
                Err(err) if err.is_session_lost() => {
                    tracing::warn!(tag, error = %err, "extract.session_lost");
                    return StageOutcome::Fatal(err.to_string());
                }
                Err(err) => {
                    tracing::debug!(tag, error = %err, "extract.tag_failed");
                    faults.push(format!("<{tag}> text: {err}"));
                }
            }
        }
        parts.extend(frame_texts.iter().cloned());

        let content = normalize_and_cap(&parts.join(" "));
        tracing::debug!(
            sources = parts.len(),
            chars = content.chars().count(),
            "extract.done"
        );
        StageOutcome::from_faults(content, &faults)
    }
}
