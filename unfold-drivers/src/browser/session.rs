use std::time::Duration;

use async_trait::async_trait;

use super::error::DriverError;
use super::page::PageDriver;

/// One browser dedicated to a single scrape request.
#[async_trait]
pub trait BrowserSession: PageDriver {
    /// Identifier used in log events.
    fn id(&self) -> &str;

    /// Load `url`, failing with [`DriverError::Timeout`] once `timeout` elapses.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Quit the browser and release its process. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Kill the browser's processes without a WebDriver round trip. Used when
    /// [`close`](Self::close) does not finish in time.
    fn abort(&mut self);
}

/// Creates a fresh, unshared [`BrowserSession`] per call.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession + 'static;

    async fn launch(&self) -> Result<Self::Session, DriverError>;
}
