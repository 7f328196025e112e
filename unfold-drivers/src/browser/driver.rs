use std::time::Duration;

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder, Locator};
use fantoccini::error::{CmdError, ErrorStatus};
use serde_json::{json, Value};
use unfold_common::BrowserConfig;

use super::error::DriverError;
use super::launch::chrome_capabilities;
use super::page::{PageDriver, Probe};
use super::process::DriverProcess;
use super::session::{BrowserSession, SessionLauncher};

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);
// Grace on top of the WebDriver page-load timeout before the client-side cut.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

const SCROLL_HEIGHT_JS: &str = "return Math.max(\
    document.body ? document.body.scrollHeight : 0, \
    document.documentElement ? document.documentElement.scrollHeight : 0);";
const TEXTS_OF_JS: &str = "return Array.from(document.getElementsByTagName(arguments[0]))\
    .map(function (e) { return e.innerText || ''; });";

/// A fantoccini WebDriver session plus the chromedriver it was started on.
pub struct UnfoldDriver {
    client: Client,
    process: Option<DriverProcess>,
    id: String,
    closed: bool,
}

impl UnfoldDriver {
    /// Start a headless Chrome session.
    ///
    /// Spawns `chromedriver_path` on a free port unless `webdriver_url` points at an
    /// already running endpoint.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, DriverError> {
        let (mut process, endpoint) = match &config.webdriver_url {
            Some(url) => (None, url.clone()),
            None => {
                let process = DriverProcess::spawn(
                    &config.chromedriver_path,
                    config.driver_startup_timeout(),
                )
                .await?;
                let endpoint = process.endpoint();
                (Some(process), endpoint)
            }
        };

        let client = match ClientBuilder::native()
            .capabilities(chrome_capabilities(config))
            .connect(&endpoint)
            .await
        {
            Ok(client) => client,
            Err(err) => {
                if let Some(p) = process.as_mut() {
                    let _ = p.shutdown().await;
                }
                return Err(DriverError::Launch(format!("{endpoint}: {err}")));
            }
        };

        let mut driver = Self {
            client,
            process,
            id: uuid::Uuid::new_v4().simple().to_string(),
            closed: false,
        };

        let timeouts = TimeoutConfiguration::new(
            Some(SCRIPT_TIMEOUT),
            Some(config.page_load_timeout()),
            Some(Duration::ZERO),
        );
        if let Err(err) = driver.client.update_timeouts(timeouts).await {
            let _ = driver.close().await;
            return Err(DriverError::Launch(format!("failed to set timeouts: {err}")));
        }

        tracing::info!(
            session = %driver.id,
            endpoint = %endpoint,
            managed_process = driver.process.is_some(),
            "browser.session.launched"
        );
        Ok(driver)
    }

    async fn script(&self, js: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        Ok(self.client.execute(js, args).await?)
    }
}

impl Drop for UnfoldDriver {
    fn drop(&mut self) {
        if !self.closed {
            // kill_on_drop still reaps the chromedriver child.
            tracing::warn!(session = %self.id, "browser.session.dropped_without_close");
        }
    }
}

#[async_trait]
impl PageDriver for UnfoldDriver {
    type Element = Element;

    async fn scroll_height(&self) -> Result<u64, DriverError> {
        let value = self.script(SCROLL_HEIGHT_JS, vec![]).await?;
        Ok(value
            .as_u64()
            .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
            .unwrap_or(0))
    }

    async fn scroll_to(&self, y: u64) -> Result<(), DriverError> {
        self.script("window.scrollTo(0, arguments[0]);", vec![json!(y)])
            .await
            .map(|_| ())
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        self.script(
            "window.scrollTo(0, document.body ? document.body.scrollHeight : 0);",
            vec![],
        )
        .await
        .map(|_| ())
    }

    async fn find_all(&self, probe: &Probe) -> Result<Vec<Element>, DriverError> {
        let locator = match probe {
            Probe::Css(sel) => Locator::Css(*sel),
            Probe::XPath(expr) => Locator::XPath(*expr),
        };
        Ok(self.client.find_all(locator).await?)
    }

    async fn is_interactable(&self, element: &Element) -> Result<bool, DriverError> {
        Ok(element.is_displayed().await? && element.is_enabled().await?)
    }

    async fn force_click(&self, element: &Element) -> Result<(), DriverError> {
        let target = serde_json::to_value(element)?;
        self.script("arguments[0].click();", vec![target])
            .await
            .map(|_| ())
    }

    async fn frame_count(&self) -> Result<usize, DriverError> {
        Ok(self
            .client
            .find_all(Locator::Css("iframe, frame"))
            .await?
            .len())
    }

    async fn enter_frame(&self, index: usize) -> Result<(), DriverError> {
        let index = u16::try_from(index)
            .map_err(|_| DriverError::Command(format!("frame index {index} out of range")))?;
        Ok(self.client.enter_frame(index).await?)
    }

    async fn leave_frame(&self) -> Result<(), DriverError> {
        Ok(self.client.enter_parent_frame().await?)
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        let body = self.client.find(Locator::Css("body")).await?;
        Ok(body.text().await?)
    }

    async fn texts_of(&self, tag: &str) -> Result<Vec<String>, DriverError> {
        let value = self.script(TEXTS_OF_JS, vec![json!(tag)]).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl BrowserSession for UnfoldDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        match tokio::time::timeout(timeout + NAVIGATION_GRACE, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(CmdError::Standard(wd)))
                if matches!(wd.error, ErrorStatus::Timeout) =>
            {
                Err(DriverError::Timeout {
                    url: url.to_string(),
                    timeout,
                })
            }
            Ok(Err(err)) => match DriverError::from(err) {
                lost @ DriverError::SessionLost(_) => Err(lost),
                other => Err(DriverError::Navigation {
                    url: url.to_string(),
                    reason: other.to_string(),
                }),
            },
            Err(_) => Err(DriverError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let quit = self.client.clone().close().await.map_err(DriverError::from);
        let stop = match self.process.as_mut() {
            Some(p) => p.shutdown().await,
            None => Ok(()),
        };
        tracing::info!(
            session = %self.id,
            quit_ok = quit.is_ok(),
            process_ok = stop.is_ok(),
            "browser.session.closed"
        );
        quit.and(stop)
    }

    fn abort(&mut self) {
        self.closed = true;
        match self.process.as_mut() {
            Some(p) => p.kill_now(),
            None => tracing::warn!(
                session = %self.id,
                "browser.session.abort_without_process"
            ),
        }
        tracing::warn!(session = %self.id, "browser.session.aborted");
    }
}

/// Launches one [`UnfoldDriver`] per request from fixed deployment settings.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = UnfoldDriver;

    async fn launch(&self) -> Result<UnfoldDriver, DriverError> {
        UnfoldDriver::launch(&self.config).await
    }
}
