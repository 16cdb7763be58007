//! In-memory driver for tests
//!
//! `FakeDriver` holds a tiny DOM: elements answer to the queries they were
//! registered with (plus their bare tag name), may appear after a delay, and
//! may be hidden or disabled. Page title, source and URL can change on a
//! schedule. Every side effect is recorded in an action log.
//!
//! Time is measured with `tokio::time::Instant`, so tests run with
//! `#[tokio::test(start_paused = true)]` and never really wait.

use super::driver::{Driver, ElementId};
use super::humanize::HumanPacing;
use super::locator::{By, Locator};
use super::session::{LaunchOptions, Session, SessionLauncher};
use crate::errors::{BotError, BotResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct FakeElement {
    key: String,
    tag: String,
    queries: Vec<By>,
    text: String,
    displayed: bool,
    enabled: bool,
    appears_after: Duration,
    click_navigates_to: Option<String>,
}

impl FakeElement {
    pub fn new(key: &str, tag: &str) -> Self {
        Self {
            key: key.to_string(),
            tag: tag.to_string(),
            queries: Vec::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            appears_after: Duration::ZERO,
            click_navigates_to: None,
        }
    }

    /// Answer to the query behind `locator`
    pub fn matches(mut self, locator: &Locator) -> Self {
        self.queries.push(locator.query());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.click_navigates_to = Some(url.to_string());
        self
    }

    fn answers(&self, by: &By) -> bool {
        self.queries.contains(by) || matches!(by, By::Css(tag) if *tag == self.tag)
    }
}

#[derive(Debug, Clone)]
enum PageChange {
    Title(String),
    Source(String),
    Url(String),
}

struct FakeDom {
    started: Instant,
    url: String,
    title: String,
    source: String,
    elements: Vec<FakeElement>,
    scheduled: Vec<(Duration, PageChange)>,
    actions: Vec<String>,
    typed: Vec<(String, String)>,
    broken: bool,
    quit: bool,
}

impl FakeDom {
    fn apply_due_changes(&mut self) {
        let elapsed = Instant::now() - self.started;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= elapsed);
        self.scheduled = pending;
        for (_, change) in due {
            match change {
                PageChange::Title(t) => self.title = t,
                PageChange::Source(s) => self.source = s,
                PageChange::Url(u) => self.url = u,
            }
        }
    }

    fn visible_now(&self, element: &FakeElement) -> bool {
        Instant::now() - self.started >= element.appears_after
    }

    fn element(&self, id: ElementId) -> BotResult<&FakeElement> {
        self.elements
            .get(id.0 as usize)
            .filter(|e| self.visible_now(e))
            .ok_or_else(|| BotError::Driver(format!("stale element {}", id.0)))
    }
}

#[derive(Clone)]
pub struct FakeDriver {
    dom: Arc<Mutex<FakeDom>>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            dom: Arc::new(Mutex::new(FakeDom {
                started: Instant::now(),
                url: "about:blank".to_string(),
                title: String::new(),
                source: String::new(),
                elements: Vec::new(),
                scheduled: Vec::new(),
                actions: Vec::new(),
                typed: Vec::new(),
                broken: false,
                quit: false,
            })),
        }
    }

    pub fn add(&self, element: FakeElement) -> ElementId {
        let mut dom = self.dom.lock();
        dom.elements.push(element);
        ElementId((dom.elements.len() - 1) as u64)
    }

    pub fn id_of(&self, key: &str) -> ElementId {
        let dom = self.dom.lock();
        let index = dom
            .elements
            .iter()
            .position(|e| e.key == key)
            .unwrap_or_else(|| panic!("no fake element '{}'", key));
        ElementId(index as u64)
    }

    pub fn set_url(&self, url: &str) {
        self.dom.lock().url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.dom.lock().title = title.to_string();
    }

    pub fn set_source(&self, source: &str) {
        self.dom.lock().source = source.to_string();
    }

    pub fn set_text(&self, key: &str, text: &str) {
        let id = self.id_of(key);
        self.dom.lock().elements[id.0 as usize].text = text.to_string();
    }

    pub fn title_after(&self, delay: Duration, title: &str) {
        self.dom
            .lock()
            .scheduled
            .push((delay, PageChange::Title(title.to_string())));
    }

    pub fn source_after(&self, delay: Duration, source: &str) {
        self.dom
            .lock()
            .scheduled
            .push((delay, PageChange::Source(source.to_string())));
    }

    pub fn url_after(&self, delay: Duration, url: &str) {
        self.dom
            .lock()
            .scheduled
            .push((delay, PageChange::Url(url.to_string())));
    }

    /// Every driver call fails while set
    pub fn set_broken(&self, broken: bool) {
        self.dom.lock().broken = broken;
    }

    /// `goto:<url>`, `click:<key>`, `clear:<key>`, `script`, `screenshot`, `quit`
    pub fn actions(&self) -> Vec<String> {
        self.dom.lock().actions.clone()
    }

    /// Full text typed into the element with `key`
    pub fn typed_into(&self, key: &str) -> String {
        self.dom
            .lock()
            .typed
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, t)| t.as_str())
            .collect()
    }

    fn with_dom<T>(&self, f: impl FnOnce(&mut FakeDom) -> BotResult<T>) -> BotResult<T> {
        let mut dom = self.dom.lock();
        if dom.quit {
            return Err(BotError::Driver("session deleted".to_string()));
        }
        if dom.broken {
            return Err(BotError::Driver("connection reset".to_string()));
        }
        dom.apply_due_changes();
        f(&mut dom)
    }
}

#[async_trait]
impl Driver for FakeDriver {
    async fn goto(&self, url: &str) -> BotResult<()> {
        self.with_dom(|dom| {
            dom.url = url.to_string();
            dom.actions.push(format!("goto:{}", url));
            Ok(())
        })
    }

    async fn current_url(&self) -> BotResult<String> {
        self.with_dom(|dom| Ok(dom.url.clone()))
    }

    async fn title(&self) -> BotResult<String> {
        self.with_dom(|dom| Ok(dom.title.clone()))
    }

    async fn page_source(&self) -> BotResult<String> {
        self.with_dom(|dom| Ok(dom.source.clone()))
    }

    async fn find_all(&self, by: &By) -> BotResult<Vec<ElementId>> {
        self.with_dom(|dom| {
            Ok(dom
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| e.answers(by) && dom.visible_now(e))
                .map(|(i, _)| ElementId(i as u64))
                .collect())
        })
    }

    async fn is_displayed(&self, element: ElementId) -> BotResult<bool> {
        self.with_dom(|dom| Ok(dom.element(element)?.displayed))
    }

    async fn is_enabled(&self, element: ElementId) -> BotResult<bool> {
        self.with_dom(|dom| Ok(dom.element(element)?.enabled))
    }

    async fn text(&self, element: ElementId) -> BotResult<String> {
        self.with_dom(|dom| Ok(dom.element(element)?.text.clone()))
    }

    async fn click(&self, element: ElementId) -> BotResult<()> {
        self.with_dom(|dom| {
            let (key, target) = {
                let el = dom.element(element)?;
                (el.key.clone(), el.click_navigates_to.clone())
            };
            dom.actions.push(format!("click:{}", key));
            if let Some(url) = target {
                dom.url = url;
            }
            Ok(())
        })
    }

    async fn clear(&self, element: ElementId) -> BotResult<()> {
        self.with_dom(|dom| {
            let key = dom.element(element)?.key.clone();
            dom.actions.push(format!("clear:{}", key));
            dom.typed.retain(|(k, _)| *k != key);
            Ok(())
        })
    }

    async fn send_keys(&self, element: ElementId, text: &str) -> BotResult<()> {
        self.with_dom(|dom| {
            let key = dom.element(element)?.key.clone();
            dom.typed.push((key, text.to_string()));
            Ok(())
        })
    }

    async fn execute_script(&self, _script: &str) -> BotResult<()> {
        self.with_dom(|dom| {
            dom.actions.push("script".to_string());
            Ok(())
        })
    }

    async fn screenshot(&self) -> BotResult<Vec<u8>> {
        self.with_dom(|dom| {
            dom.actions.push("screenshot".to_string());
            Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
        })
    }

    async fn quit(&self) -> BotResult<()> {
        self.with_dom(|dom| {
            dom.actions.push("quit".to_string());
            dom.quit = true;
            Ok(())
        })
    }
}

/// Launcher handing out clones of one `FakeDriver`
pub struct FakeLauncher {
    driver: Option<FakeDriver>,
    failure: Option<String>,
}

impl FakeLauncher {
    pub fn new(driver: FakeDriver) -> Self {
        Self {
            driver: Some(driver),
            failure: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            driver: None,
            failure: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> BotResult<Box<dyn Driver>> {
        match (&self.driver, &self.failure) {
            (Some(driver), None) => Ok(Box::new(driver.clone())),
            (_, Some(reason)) => Err(BotError::DriverInitFailed(reason.clone())),
            (None, None) => Err(BotError::DriverInitFailed("no driver".to_string())),
        }
    }
}

/// Ready session over `driver` with pacing disabled
pub fn ready_session(driver: FakeDriver) -> Session {
    Session::new(Box::new(driver), "fake-agent", HumanPacing::disabled())
}
