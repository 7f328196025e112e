//! YouTube integration.
//!
//! `client` wraps the Data API, `transcript` walks the watch page to a caption track,
//! `extract` holds the pure parsing helpers, and `fetcher` combines them.
pub mod client;
pub mod extract;
pub mod fetcher;
pub mod transcript;
pub mod types;

pub use client::YoutubeApi;
pub use fetcher::TranscriptFetcher;
