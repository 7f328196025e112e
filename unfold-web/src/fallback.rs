//! Browser-less retrieval used once the browser pipeline has given up.

use std::time::Duration;

use scraper::{Html, Node};
use unfold_common::text::{CONTENT_CAP, normalize_and_cap};
use unfold_http::{HttpClient, HttpError, RequestOpts};

use crate::types::{Outcome, ScrapeResult};

/// Elements whose text never renders.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

// Every request passes an absolute URL, so the base is never joined.
const DETACHED_BASE: &str = "http://localhost/";

/// Bytes read from a fallback body; room for markup around a full `CONTENT_CAP` of text.
pub const MAX_BODY_BYTES: usize = 4 * CONTENT_CAP;

/// One plain GET with a browser user agent. No script execution, no retries.
#[derive(Clone)]
pub struct FallbackFetcher {
    client: HttpClient,
}

impl FallbackFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        let client = HttpClient::new(DETACHED_BASE)?
            .with_timeout(timeout)
            .with_retries(0)
            .with_user_agent(user_agent)?;
        Ok(Self { client })
    }

    /// Fetch `url` and mark the text `Degraded`, or `Failed` with the HTTP error.
    ///
    /// The body is always reduced to text, whatever its declared content type, and
    /// reading stops after [`MAX_BODY_BYTES`]. `browser_cause` explains why the browser
    /// path was abandoned and is kept in the result's cause either way.
    pub async fn fetch(&self, url: &str, browser_cause: &str) -> ScrapeResult {
        let opts = RequestOpts {
            retries: Some(0),
            allow_absolute: true,
            max_body_bytes: Some(MAX_BODY_BYTES),
            ..Default::default()
        };
        match self.client.get_text(url, opts).await {
            Ok(resp) => {
                let content = normalize_and_cap(&html_to_text(&resp.body));
                tracing::info!(
                    url,
                    status = %resp.status,
                    content_type = resp.content_type.as_deref().unwrap_or("-"),
                    truncated = resp.truncated,
                    chars = content.chars().count(),
                    "fallback.done"
                );
                let cause = if resp.truncated {
                    format!("{browser_cause}; fallback body truncated at {MAX_BODY_BYTES} bytes")
                } else {
                    browser_cause.to_string()
                };
                ScrapeResult {
                    url: url.to_string(),
                    content,
                    outcome: Outcome::Degraded,
                    cause: Some(cause),
                }
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "fallback.failed");
                ScrapeResult::failed(url, format!("{browser_cause}; fallback: {err}"))
            }
        }
    }
}

/// Text nodes of `html` outside non-rendering elements, space separated.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 4);

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_hidden_elements() {
        let html = r#"<html><head><title>T</title><style>p{color:red}</style>
            <script>var x = "<p>nope</p>";</script></head>
            <body><h1>Hello</h1><p>first&nbsp;para &amp; more</p>
            <noscript>enable js</noscript><template><p>tpl</p></template></body></html>"#;
        let text = normalize_and_cap(&html_to_text(html));
        assert_eq!(text, "T Hello first para & more");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(normalize_and_cap(&html_to_text("just words")), "just words");
    }
}
