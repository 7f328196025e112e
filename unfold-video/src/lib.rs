//! Video transcript retrieval.
//!
//! Only YouTube is supported: the video id is parsed from the URL, the title comes
//! from the Data API, and the transcript from the caption tracks the watch page
//! advertises.
pub mod youtube;

pub use youtube::fetcher::{TranscriptError, TranscriptFetcher, TranscriptResult};
pub use youtube::extract::extract_video_id;
