//! Title + transcript for one video URL.
use serde::Serialize;
use thiserror::Error;
use unfold_common::YoutubeConfig;
use unfold_common::text::normalize_whitespace;
use unfold_http::HttpError;

use crate::youtube::client::YoutubeApi;
use crate::youtube::extract::extract_video_id;
use crate::youtube::transcript::WatchPageTranscripts;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptResult {
    pub video_url: String,
    pub video_id: String,
    pub title: String,
    pub transcript_text: String,
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("invalid YouTube URL: {0}")]
    InvalidInput(String),
    /// Every provider failure collapses into this variant; the cause is only logged.
    #[error("Transcript not available")]
    Unavailable,
    #[error("failed to build YouTube clients: {0}")]
    Setup(#[from] HttpError),
}

#[derive(Clone)]
pub struct TranscriptFetcher {
    api: YoutubeApi,
    transcripts: WatchPageTranscripts,
}

impl TranscriptFetcher {
    pub fn from_config(config: &YoutubeConfig) -> Result<Self, TranscriptError> {
        Ok(Self {
            api: YoutubeApi::new(config)?,
            transcripts: WatchPageTranscripts::new(config)?,
        })
    }

    /// Resolve the video id, then fetch title and transcript concurrently.
    ///
    /// A missing title degrades to `"Unknown Title"`; a missing transcript fails the
    /// whole call with [`TranscriptError::Unavailable`].
    pub async fn get_youtube_transcript(
        &self,
        video_url: &str,
    ) -> Result<TranscriptResult, TranscriptError> {
        let video_id = extract_video_id(video_url)
            .ok_or_else(|| TranscriptError::InvalidInput(video_url.to_string()))?;
        tracing::info!(video_id = %video_id, title_lookup = self.api.has_key(), "transcript.start");

        let (title, segments) = tokio::join!(
            self.api.video_title(&video_id),
            self.transcripts.segments(&video_id)
        );

        let segments = segments.map_err(|err| {
            tracing::error!(video_id = %video_id, cause = %err, "transcript.unavailable");
            TranscriptError::Unavailable
        })?;

        let title = match title {
            Ok(Some(title)) => title,
            Ok(None) => UNKNOWN_TITLE.to_string(),
            Err(err) => {
                tracing::warn!(video_id = %video_id, error = %err, "transcript.title_failed");
                UNKNOWN_TITLE.to_string()
            }
        };

        let joined = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let transcript_text = normalize_whitespace(&joined);
        tracing::info!(
            video_id = %video_id,
            segments = segments.len(),
            chars = transcript_text.chars().count(),
            "transcript.done"
        );

        Ok(TranscriptResult {
            video_url: video_url.to_string(),
            video_id,
            title,
            transcript_text,
        })
    }
}
