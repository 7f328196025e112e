//! YouTube Data API v3 wrapper used for video metadata.
use std::borrow::Cow;

use unfold_common::YoutubeConfig;
use unfold_http::{Auth, HttpClient, HttpError, RequestOpts};

use crate::youtube::types::VideoListResponse;

#[derive(Clone)]
pub struct YoutubeApi {
    http: HttpClient,
    api_key: Option<String>,
}

impl YoutubeApi {
    pub fn new(config: &YoutubeConfig) -> Result<Self, HttpError> {
        let http = HttpClient::new(&config.data_api_base)?
            .with_timeout(config.timeout())
            .with_retries(1);
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
        })
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Title of `video_id`, or `None` when the API knows no such video or no key is
    /// configured.
    pub async fn video_title(&self, video_id: &str) -> Result<Option<String>, HttpError> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!(video_id, "youtube.title.no_api_key");
            return Ok(None);
        };

        let resp: VideoListResponse = self
            .http
            .get_json(
                "videos",
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(key),
                    }),
                    query: Some(vec![
                        ("part", Cow::Borrowed("snippet")),
                        ("id", Cow::Borrowed(video_id)),
                    ]),
                    ..Default::default()
                },
            )
            .await?;

        let title = resp
            .items
            .into_iter()
            .next()
            .and_then(|item| item.snippet)
            .and_then(|snippet| snippet.title)
            .filter(|t| !t.trim().is_empty());
        tracing::debug!(video_id, found = title.is_some(), "youtube.title.done");
        Ok(title)
    }
}
