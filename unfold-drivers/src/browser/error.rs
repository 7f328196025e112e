use std::time::Duration;

use fantoccini::error::{CmdError, ErrorStatus};
use thiserror::Error;

/// Failures surfaced by the browser layer.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("navigation to {url} exceeded {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    #[error("browser session lost: {0}")]
    SessionLost(String),
    #[error("webdriver command failed: {0}")]
    Command(String),
}

impl DriverError {
    /// True when the browser is gone and no further command can succeed.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, DriverError::SessionLost(_))
    }
}

impl From<CmdError> for DriverError {
    fn from(err: CmdError) -> Self {
        match &err {
            CmdError::Lost(_) => DriverError::SessionLost(err.to_string()),
            CmdError::Standard(wd)
                if matches!(
                    wd.error,
                    ErrorStatus::InvalidSessionId
                        | ErrorStatus::NoSuchWindow
                        | ErrorStatus::SessionNotCreated
                ) =>
            {
                DriverError::SessionLost(err.to_string())
            }
            _ => DriverError::Command(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Command(format!("unexpected script result: {err}"))
    }
}
