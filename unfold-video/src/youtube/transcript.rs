//! Caption tracks discovered through the public watch page.
use std::borrow::Cow;

use thiserror::Error;
use unfold_common::{DEFAULT_USER_AGENT, YoutubeConfig};
use unfold_http::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use unfold_http::{HttpClient, HttpError, RequestOpts};

use crate::youtube::extract::{extract_player_response, parse_timed_text};
use crate::youtube::types::{CaptionTrack, PlayerResponse, TranscriptSegment};

/// Why no transcript could be produced. Callers only ever see a uniform failure;
/// these variants exist for the logs.
#[derive(Debug, Error)]
pub enum TranscriptUnavailable {
    #[error("video unavailable ({status}): {reason}")]
    VideoUnavailable { status: String, reason: String },
    #[error("transcripts are disabled for this video")]
    Disabled,
    #[error("no caption track")]
    NoTrack,
    #[error("caption track is empty")]
    Empty,
    #[error("request failed: {0}")]
    Fetch(#[from] HttpError),
    #[error("malformed watch page: {0}")]
    Malformed(String),
}

/// Reads `ytInitialPlayerResponse` from the watch page and downloads one caption
/// track as timed text.
#[derive(Clone)]
pub struct WatchPageTranscripts {
    http: HttpClient,
    preferred_language: String,
}

impl WatchPageTranscripts {
    pub fn new(config: &YoutubeConfig) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.watch_base)?
            .with_timeout(config.timeout())
            .with_retries(1)
            .with_user_agent(DEFAULT_USER_AGENT)?;
        Ok(Self {
            http,
            preferred_language: config.preferred_language.clone(),
        })
    }

    pub async fn segments(
        &self,
        video_id: &str,
    ) -> Result<Vec<TranscriptSegment>, TranscriptUnavailable> {
        let player = self.player_response(video_id).await?;

        if let Some(status) = &player.playability_status {
            if status.status != "OK" {
                return Err(TranscriptUnavailable::VideoUnavailable {
                    status: status.status.clone(),
                    reason: status.reason.clone().unwrap_or_default(),
                });
            }
        }

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks)
            .ok_or(TranscriptUnavailable::Disabled)?;
        let track =
            pick_track(&tracks, &self.preferred_language).ok_or(TranscriptUnavailable::NoTrack)?;
        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "youtube.transcript.track"
        );

        let xml = self
            .http
            .get_text(
                &track.base_url,
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await?;
        let segments = parse_timed_text(&xml.body);
        if segments.is_empty() {
            return Err(TranscriptUnavailable::Empty);
        }
        Ok(segments)
    }

    async fn player_response(
        &self,
        video_id: &str,
    ) -> Result<PlayerResponse, TranscriptUnavailable> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(COOKIE, HeaderValue::from_static("CONSENT=YES+cb"));

        let page = self
            .http
            .get_text(
                "watch",
                RequestOpts {
                    headers: Some(headers),
                    query: Some(vec![("v", Cow::Borrowed(video_id))]),
                    ..Default::default()
                },
            )
            .await?;

        let json = extract_player_response(&page.body).ok_or_else(|| {
            TranscriptUnavailable::Malformed("ytInitialPlayerResponse not found".to_string())
        })?;
        serde_json::from_str(json).map_err(|e| TranscriptUnavailable::Malformed(e.to_string()))
    }
}

/// Manual track in `language`, then a generated one in `language`, then the first.
pub fn pick_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.speaks(language) && !t.is_generated())
        .or_else(|| tracks.iter().find(|t| t.speaks(language)))
        .or_else(|| tracks.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?lang={lang}"),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn manual_track_beats_generated() {
        let tracks = [track("en", Some("asr")), track("de", None), track("en", None)];
        let picked = pick_track(&tracks, "en").unwrap();
        assert_eq!(picked.language_code, "en");
        assert!(!picked.is_generated());
    }

    #[test]
    fn generated_track_beats_other_languages() {
        let tracks = [track("de", None), track("en-US", Some("asr"))];
        assert_eq!(pick_track(&tracks, "en").unwrap().language_code, "en-US");
    }

    #[test]
    fn first_track_is_the_last_resort() {
        let tracks = [track("fr", Some("asr")), track("de", None)];
        assert_eq!(pick_track(&tracks, "en").unwrap().language_code, "fr");
        assert!(pick_track(&[], "en").is_none());
    }
}
