use std::fmt;

use async_trait::async_trait;

use super::error::DriverError;

/// Element query understood by every page driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Css(&'static str),
    XPath(&'static str),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Css(sel) => write!(f, "css={sel}"),
            Probe::XPath(expr) => write!(f, "xpath={expr}"),
        }
    }
}

/// DOM operations the scrape engine needs from a loaded page.
///
/// Frame operations change the context of subsequent calls: after
/// [`enter_frame`](Self::enter_frame) every query runs inside that frame until
/// [`leave_frame`](Self::leave_frame) returns to the top-level document.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Send + Sync;

    /// Total scrollable height of the document in CSS pixels.
    async fn scroll_height(&self) -> Result<u64, DriverError>;
    async fn scroll_to(&self, y: u64) -> Result<(), DriverError>;
    async fn scroll_to_bottom(&self) -> Result<(), DriverError>;

    async fn find_all(&self, probe: &Probe) -> Result<Vec<Self::Element>, DriverError>;
    /// Visible and enabled.
    async fn is_interactable(&self, element: &Self::Element) -> Result<bool, DriverError>;
    /// Click through script, bypassing overlay and hit-testing checks.
    async fn force_click(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// Number of frames in the current document.
    async fn frame_count(&self) -> Result<usize, DriverError>;
    async fn enter_frame(&self, index: usize) -> Result<(), DriverError>;
    async fn leave_frame(&self) -> Result<(), DriverError>;

    /// Rendered text of `body`.
    async fn body_text(&self) -> Result<String, DriverError>;
    /// Rendered text of every element with the given tag name, in document order.
    async fn texts_of(&self, tag: &str) -> Result<Vec<String>, DriverError>;
}
