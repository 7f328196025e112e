//! Common types and utilities shared across Unfold crates.
//!
//! This crate defines configuration, text normalization, stage outcomes, observability
//! helpers, and shared error types used throughout the Unfold workspace. It is
//! intentionally lightweight so that every crate can depend on it without introducing
//! heavy transitive costs.
//!
//! # Overview
//!
//! - [`UnfoldConfig`]: top‑level runtime configuration, loaded once at process start
//! - [`BrowserConfig`], [`ScrapeConfig`], [`YoutubeConfig`], [`LogSettings`]: its sections
//! - [`text`]: whitespace normalization and the shared [`text::CONTENT_CAP`]
//! - [`stage`]: the per-stage `Ok | Recoverable | Fatal` outcome used by the engine
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`UnfoldError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! Constructing a default configuration:
//!
//! ```rust
//! use unfold_common::UnfoldConfig;
//!
//! let cfg = UnfoldConfig::default();
//! assert_eq!(cfg.browser.page_load_timeout_secs, 30);
//! assert_eq!(cfg.scrape.scroll_step_px, 300);
//! assert!(cfg.validate().is_ok());
//! ```
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod observability;
pub mod stage;
pub mod text;

pub use stage::StageOutcome;

/// User agent sent by the browser-less fallback path.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configuration for Unfold operations.
///
/// Loaded once (see the `unfold-config` crate) and passed by value or reference into
/// the engine and fetchers. Nothing reads configuration from globals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnfoldConfig {
    /// Headless browser and WebDriver settings.
    pub browser: BrowserConfig,
    /// Timings and limits of the page scrape pipeline.
    pub scrape: ScrapeConfig,
    /// YouTube metadata and transcript settings.
    pub youtube: YoutubeConfig,
    /// Logging sink settings.
    pub log: LogSettings,
}

impl UnfoldConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scrape.scroll_step_px == 0 {
            return Err(UnfoldError::Config(
                "scrape.scroll_step_px must be greater than zero".to_string(),
            ));
        }
        if self.scrape.max_concurrent_sessions == 0 {
            return Err(UnfoldError::Config(
                "scrape.max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            return Err(UnfoldError::Config(
                "browser.viewport dimensions must be non-zero".to_string(),
            ));
        }
        if self.browser.page_load_timeout_secs == 0 {
            return Err(UnfoldError::Config(
                "browser.page_load_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Browser window size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// How a browser session is provisioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// `chromedriver` executable spawned once per session.
    pub chromedriver_path: PathBuf,
    /// Chrome/Chromium binary handed to chromedriver. `None` lets chromedriver search.
    pub chromium_path: Option<PathBuf>,
    /// Attach to an already running WebDriver endpoint instead of spawning chromedriver.
    pub webdriver_url: Option<String>,
    /// Run without a visible window.
    pub headless: bool,
    pub disable_gpu: bool,
    /// Required in most containers; Chrome's sandbox needs privileges they lack.
    pub no_sandbox: bool,
    pub viewport: Viewport,
    /// Hard ceiling on a single navigation.
    pub page_load_timeout_secs: u64,
    /// How long to wait for a spawned chromedriver to accept connections.
    pub driver_startup_timeout_secs: u64,
    /// Additional Chrome command-line switches.
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromedriver_path: PathBuf::from("/usr/bin/chromedriver"),
            chromium_path: Some(PathBuf::from("/usr/bin/chromium")),
            webdriver_url: None,
            headless: true,
            disable_gpu: true,
            no_sandbox: true,
            viewport: Viewport::default(),
            page_load_timeout_secs: 30,
            driver_startup_timeout_secs: 10,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn driver_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.driver_startup_timeout_secs)
    }
}

/// Settle delays, sweep geometry and limits for one page scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Pause after navigation so first paint and initial scripts can run.
    pub initial_settle_ms: u64,
    /// Distance the virtual scroll cursor advances per step.
    pub scroll_step_px: u64,
    pub scroll_settle_ms: u64,
    /// Upper bound on sweep steps; endless feeds would otherwise never finish.
    pub max_scroll_steps: u32,
    pub top_reset_settle_ms: u64,
    pub interaction_settle_ms: u64,
    pub final_settle_ms: u64,
    /// Ceiling for navigation + trigger + extraction of one session.
    pub pipeline_timeout_secs: u64,
    /// Time allowed for quitting a session before its processes are killed.
    pub close_timeout_secs: u64,
    /// Browser sessions allowed to run at once.
    pub max_concurrent_sessions: usize,
    pub fallback_timeout_secs: u64,
    /// User agent of the browser-less fallback request.
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 5_000,
            scroll_step_px: 300,
            scroll_settle_ms: 500,
            max_scroll_steps: 500,
            top_reset_settle_ms: 1_000,
            interaction_settle_ms: 500,
            final_settle_ms: 2_000,
            pipeline_timeout_secs: 180,
            close_timeout_secs: 15,
            max_concurrent_sessions: 2,
            fallback_timeout_secs: 20,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn pipeline_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline_timeout_secs)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }
}

/// Endpoints and credentials for the YouTube collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// YouTube Data API v3 key. Without it every title resolves to the sentinel.
    pub api_key: Option<String>,
    pub data_api_base: String,
    /// Base for `watch?v=` pages, which embed the caption track list.
    pub watch_base: String,
    /// Caption language tried first.
    pub preferred_language: String,
    pub timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            data_api_base: "https://www.googleapis.com/youtube/v3/".to_string(),
            watch_base: "https://www.youtube.com/".to_string(),
            preferred_language: "en".to_string(),
            timeout_secs: 15,
        }
    }
}

impl YoutubeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging settings as they appear in configuration files.
///
/// Converted into [`observability::LogConfig`] by binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormatSetting,
    pub stderr: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormatSetting::Text,
            stderr: true,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    Text,
    Json,
}

/// Error types used across the Unfold system.
#[derive(thiserror::Error, Debug)]
pub enum UnfoldError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`UnfoldError`].
pub type Result<T> = std::result::Result<T, UnfoldError>;
