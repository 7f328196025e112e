//! Driver layer for browser automation.
//!
//! This crate exposes the WebDriver-backed browser session the scrape engine drives,
//! plus the traits that let the engine run against an in-memory page in tests.
//!
//! - [`browser::driver::UnfoldDriver`]: fantoccini client plus its chromedriver child
//! - [`browser::page::PageDriver`]: DOM operations used by the trigger and extractor
//! - [`browser::session::SessionLauncher`]: one fresh [`browser::session::BrowserSession`] per request
//! - [`browser::wait::WaitStrategy`]: settle delays between interactions
//! - [`browser::launch`]: Chrome arguments and capabilities
pub mod browser;

pub use browser::driver::{ChromeLauncher, UnfoldDriver};
pub use browser::error::DriverError;
pub use browser::page::{PageDriver, Probe};
pub use browser::session::{BrowserSession, SessionLauncher};
pub use browser::wait::{FixedDelay, NoDelay, WaitStrategy};
