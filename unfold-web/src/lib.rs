//! Dynamic page text extraction.
//!
//! - [`ScrapeEngine`]: validates input, runs the browser pipeline, falls back to HTTP
//! - [`trigger`]: scroll sweep, expansion clicks, and frame pass
//! - [`extract`]: body + block + frame text, normalized and capped
//! - [`fallback`]: plain GET with HTML-to-text reduction
//! - [`browser`]: per-request session lifecycle with guaranteed teardown

pub mod browser;
pub mod engine;
pub mod extract;
pub mod fallback;
pub mod trigger;
pub mod types;

pub use engine::{ScrapeEngine, validate_url};
pub use types::{Outcome, ScrapeError, ScrapeResult};
