//! Parsing helpers for YouTube URLs, watch pages, and timed-text documents.
use std::sync::LazyLock;

use regex::Regex;

use crate::youtube::types::TranscriptSegment;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("video id regex")
});

static TEXT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b([^>]*)>(.*?)</text>").expect("segment regex"));

static EMPTY_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<text\b[^>]*/>").expect("empty segment regex"));

static START_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart="([0-9.]+)""#).expect("start regex"));

static DUR_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdur="([0-9.]+)""#).expect("dur regex"));

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// Pull the 11-character video id out of a YouTube URL.
///
/// Accepts `watch?v=`, `youtu.be/`, `/embed/`, `/v/` and `/e/` links.
///
/// ```
/// use unfold_video::extract_video_id;
///
/// assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
/// assert_eq!(extract_video_id("https://example.com/"), None);
/// ```
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Locate the `ytInitialPlayerResponse` object literal in a watch page.
///
/// Braces are counted outside string literals, so nested objects and escaped quotes
/// inside values do not end the object early.
pub fn extract_player_response(html: &str) -> Option<&str> {
    html.match_indices(PLAYER_RESPONSE_MARKER)
        .find_map(|(at, _)| object_after_assignment(&html[at + PLAYER_RESPONSE_MARKER.len()..]))
}

/// The object literal in `= {...}` at the start of `rest`.
fn object_after_assignment(rest: &str) -> Option<&str> {
    let eq = rest.find('=')?;
    if !rest[..eq].trim().is_empty() {
        return None;
    }
    let body = &rest[eq + 1..];
    let open = body.find('{')?;
    if !body[..open].trim().is_empty() {
        return None;
    }
    let body = &body[open..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode a timed-text (`format 1`) document into ordered segments.
///
/// Segment text is entity-decoded twice, since the service escapes already escaped
/// caption text, and stripped of inline formatting tags.
pub fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    let xml = EMPTY_SEGMENT.replace_all(xml, "");
    TEXT_SEGMENT
        .captures_iter(&xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2).map_or("", |m| m.as_str());
            let text = clean_caption(raw);
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: numeric_attr(&START_ATTR, attrs),
                duration: numeric_attr(&DUR_ATTR, attrs),
            })
        })
        .collect()
}

fn clean_caption(raw: &str) -> String {
    let once = html_escape::decode_html_entities(raw);
    let twice = html_escape::decode_html_entities(&once);
    INLINE_TAG.replace_all(&twice, "").trim().to_string()
}

fn numeric_attr(re: &Regex, attrs: &str) -> f64 {
    re.captures(attrs)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}
