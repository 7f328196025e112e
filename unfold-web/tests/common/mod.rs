//! In-memory browser used to drive the engine without Chrome.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use unfold_common::UnfoldConfig;
use unfold_drivers::{BrowserSession, DriverError, PageDriver, Probe, SessionLauncher};

/// Where a scripted page breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakage {
    Launch,
    Navigation,
    /// Session dies on the first scroll.
    Trigger,
    /// Session dies when the body is read.
    Extraction,
    /// Page code panics during the sweep.
    Panic,
    /// Navigation never completes.
    Hang,
    /// Navigation and quitting both never complete.
    Wedged,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    /// Every probe this element answers to.
    pub probes: Vec<Probe>,
    pub visible: bool,
    pub refuses_click: bool,
    /// Text added to the page when clicked.
    pub reveals: Option<String>,
}

impl FakeElement {
    pub fn expander(probe: Probe, reveals: &str) -> Self {
        Self {
            probes: vec![probe],
            visible: true,
            refuses_click: false,
            reveals: Some(reveals.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeFrame {
    pub text: String,
    pub unreadable: bool,
}

/// Static description of a page.
#[derive(Debug, Clone)]
pub struct PageScript {
    pub height: u64,
    pub body: String,
    pub paragraphs: Vec<String>,
    /// Text appended once the page has been scrolled to the given offset; the page
    /// then grows by `lazy_growth` pixels.
    pub lazy: Option<(u64, String)>,
    pub lazy_growth: u64,
    pub elements: Vec<FakeElement>,
    pub frames: Vec<FakeFrame>,
    pub breakage: Option<Breakage>,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            height: 1080,
            body: String::new(),
            paragraphs: Vec::new(),
            lazy: None,
            lazy_growth: 0,
            elements: Vec::new(),
            frames: Vec::new(),
            breakage: None,
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    max_scrolled: u64,
    revealed: Vec<String>,
    clicks: Vec<usize>,
    frame: Option<usize>,
    frames_entered: usize,
}

/// Counters shared between a launcher and the sessions it created.
#[derive(Debug, Default)]
pub struct Ledger {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub aborted: AtomicUsize,
    pub live: AtomicUsize,
    pub peak_live: AtomicUsize,
    pub clicks: Mutex<Vec<usize>>,
}

impl Ledger {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }
}

pub struct FakeSession {
    id: String,
    script: PageScript,
    state: Mutex<PageState>,
    ledger: Arc<Ledger>,
}

impl FakeSession {
    fn broken(&self, at: Breakage) -> bool {
        self.script.breakage == Some(at)
    }

    fn lost() -> DriverError {
        DriverError::SessionLost("browser crashed".to_string())
    }

    fn height(&self, state: &PageState) -> u64 {
        match &self.script.lazy {
            Some((offset, _)) if state.max_scrolled >= *offset => {
                self.script.height + self.script.lazy_growth
            }
            _ => self.script.height,
        }
    }

    fn document_texts(&self, state: &PageState) -> Vec<String> {
        let mut texts = self.script.paragraphs.clone();
        if let Some((offset, text)) = &self.script.lazy {
            if state.max_scrolled >= *offset {
                texts.push(text.clone());
            }
        }
        texts.extend(state.revealed.iter().cloned());
        texts
    }
}

#[async_trait]
impl PageDriver for FakeSession {
    type Element = usize;

    async fn scroll_height(&self) -> Result<u64, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(self.height(&state))
    }

    async fn scroll_to(&self, y: u64) -> Result<(), DriverError> {
        if self.broken(Breakage::Trigger) {
            return Err(Self::lost());
        }
        if self.broken(Breakage::Panic) {
            panic!("page script exploded");
        }
        let mut state = self.state.lock().unwrap();
        state.max_scrolled = state.max_scrolled.max(y);
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        let h = self.height(&state);
        state.max_scrolled = state.max_scrolled.max(h);
        Ok(())
    }

    async fn find_all(&self, probe: &Probe) -> Result<Vec<usize>, DriverError> {
        Ok(self
            .script
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.probes.contains(probe))
            .map(|(i, _)| i)
            .collect())
    }

    async fn is_interactable(&self, element: &usize) -> Result<bool, DriverError> {
        Ok(self.script.elements[*element].visible)
    }

    async fn force_click(&self, element: &usize) -> Result<(), DriverError> {
        let el = &self.script.elements[*element];
        if el.refuses_click {
            return Err(DriverError::Command(format!(
                "element {element} is not clickable"
            )));
        }
        let mut state = self.state.lock().unwrap();
        state.clicks.push(*element);
        self.ledger.clicks.lock().unwrap().push(*element);
        if let Some(text) = &el.reveals {
            state.revealed.push(text.clone());
        }
        Ok(())
    }

    async fn frame_count(&self) -> Result<usize, DriverError> {
        Ok(self.script.frames.len())
    }

    async fn enter_frame(&self, index: usize) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.frame = Some(index);
        state.frames_entered += 1;
        Ok(())
    }

    async fn leave_frame(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().frame = None;
        Ok(())
    }

    async fn body_text(&self) -> Result<String, DriverError> {
        if self.broken(Breakage::Extraction) {
            return Err(Self::lost());
        }
        let state = self.state.lock().unwrap();
        if let Some(index) = state.frame {
            let frame = &self.script.frames[index];
            if frame.unreadable {
                return Err(DriverError::Command("cross-origin frame".to_string()));
            }
            return Ok(frame.text.clone());
        }
        let mut texts = vec![self.script.body.clone()];
        texts.extend(self.document_texts(&state));
        Ok(texts.join("\n"))
    }

    async fn texts_of(&self, tag: &str) -> Result<Vec<String>, DriverError> {
        let state = self.state.lock().unwrap();
        if state.frame.is_some() {
            return Err(DriverError::Command(
                "queried a tag while inside a frame".to_string(),
            ));
        }
        Ok(match tag {
            "p" => self.document_texts(&state),
            _ => Vec::new(),
        })
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        if self.broken(Breakage::Navigation) {
            return Err(DriverError::Timeout {
                url: url.to_string(),
                timeout,
            });
        }
        if self.broken(Breakage::Hang) || self.broken(Breakage::Wedged) {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.broken(Breakage::Wedged) {
            futures::future::pending::<()>().await;
        }
        self.ledger.closed.fetch_add(1, Ordering::SeqCst);
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    fn abort(&mut self) {
        self.ledger.aborted.fetch_add(1, Ordering::SeqCst);
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Hands out sessions for one page script and records their lifecycle.
pub struct FakeLauncher {
    pub script: PageScript,
    pub ledger: Arc<Ledger>,
    /// Time each session takes to come up.
    pub launch_delay: Duration,
}

impl FakeLauncher {
    pub fn new(script: PageScript) -> Self {
        Self {
            script,
            ledger: Arc::new(Ledger::default()),
            launch_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, DriverError> {
        if self.script.breakage == Some(Breakage::Launch) {
            return Err(DriverError::Launch("chromedriver not found".to_string()));
        }
        let n = self.ledger.launched.fetch_add(1, Ordering::SeqCst);
        let live = self.ledger.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger.peak_live.fetch_max(live, Ordering::SeqCst);
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        Ok(FakeSession {
            id: format!("fake-{n}"),
            script: self.script.clone(),
            state: Mutex::new(PageState::default()),
            ledger: Arc::clone(&self.ledger),
        })
    }
}

/// Zero settle delays, short fallback timeout.
pub fn fast_config() -> UnfoldConfig {
    let mut config = UnfoldConfig::default();
    config.scrape.initial_settle_ms = 0;
    config.scrape.scroll_settle_ms = 0;
    config.scrape.top_reset_settle_ms = 0;
    config.scrape.interaction_settle_ms = 0;
    config.scrape.final_settle_ms = 0;
    config.scrape.fallback_timeout_secs = 5;
    config.scrape.close_timeout_secs = 1;
    config
}
