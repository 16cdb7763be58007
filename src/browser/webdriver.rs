//! fantoccini WebDriver backend
//!
//! Found elements are cached under numeric ids. The same WebDriver element
//! reference always maps to the same id, and the cache holds at most
//! `MAX_CACHED_ELEMENTS` entries (oldest evicted first) so a long session on
//! one page stays bounded. Navigation clears it. Evicted or stale ids fail
//! with a driver error and the resolver simply re-queries.

use super::driver::{Driver, ElementId};
use super::locator::By;
use super::session::{LaunchOptions, SessionLauncher};
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use fantoccini::elements::{Element, ElementRef};
use fantoccini::{Client, ClientBuilder, Locator as WdLocator};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

const MAX_CACHED_ELEMENTS: usize = 256;

fn cmd_err(e: fantoccini::error::CmdError) -> BotError {
    BotError::Driver(e.to_string())
}

/// Ids for driver element references, deduplicated and capacity-bounded
struct ElementCache<K, E> {
    by_id: HashMap<u64, (K, E)>,
    by_ref: HashMap<K, u64>,
    order: VecDeque<u64>,
    next_id: u64,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, E: Clone> ElementCache<K, E> {
    fn new(capacity: usize) -> Self {
        Self {
            by_id: HashMap::new(),
            by_ref: HashMap::new(),
            order: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: K, element: E) -> u64 {
        if let Some(&id) = self.by_ref.get(&key) {
            return id;
        }
        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some((old_key, _)) = self.by_id.remove(&oldest) {
                self.by_ref.remove(&old_key);
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.by_id.insert(id, (key.clone(), element));
        self.by_ref.insert(key, id);
        self.order.push_back(id);
        id
    }

    fn get(&self, id: u64) -> Option<E> {
        self.by_id.get(&id).map(|(_, e)| e.clone())
    }

    fn clear(&mut self) {
        self.by_id.clear();
        self.by_ref.clear();
        self.order.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.by_id.len()
    }
}

pub struct WebDriverBackend {
    client: Client,
    elements: Mutex<ElementCache<ElementRef, Element>>,
}

impl WebDriverBackend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            elements: Mutex::new(ElementCache::new(MAX_CACHED_ELEMENTS)),
        }
    }

    fn element(&self, id: ElementId) -> BotResult<Element> {
        self.elements
            .lock()
            .get(id.0)
            .ok_or_else(|| BotError::Driver(format!("stale element reference {}", id.0)))
    }

    fn remember(&self, element: Element) -> ElementId {
        let key = element.element_id();
        ElementId(self.elements.lock().insert(key, element))
    }
}

#[async_trait]
impl Driver for WebDriverBackend {
    async fn goto(&self, url: &str) -> BotResult<()> {
        self.elements.lock().clear();
        self.client.goto(url).await.map_err(cmd_err)
    }

    async fn current_url(&self) -> BotResult<String> {
        self.client
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(cmd_err)
    }

    async fn title(&self) -> BotResult<String> {
        self.client.title().await.map_err(cmd_err)
    }

    async fn page_source(&self) -> BotResult<String> {
        self.client.source().await.map_err(cmd_err)
    }

    async fn find_all(&self, by: &By) -> BotResult<Vec<ElementId>> {
        let found = match by {
            By::Css(selector) => self.client.find_all(WdLocator::Css(selector)).await,
            By::XPath(expr) => self.client.find_all(WdLocator::XPath(expr)).await,
        }
        .map_err(cmd_err)?;

        Ok(found.into_iter().map(|e| self.remember(e)).collect())
    }

    async fn is_displayed(&self, element: ElementId) -> BotResult<bool> {
        self.element(element)?.is_displayed().await.map_err(cmd_err)
    }

    async fn is_enabled(&self, element: ElementId) -> BotResult<bool> {
        self.element(element)?.is_enabled().await.map_err(cmd_err)
    }

    async fn text(&self, element: ElementId) -> BotResult<String> {
        self.element(element)?.text().await.map_err(cmd_err)
    }

    async fn click(&self, element: ElementId) -> BotResult<()> {
        self.element(element)?.click().await.map_err(cmd_err)
    }

    async fn clear(&self, element: ElementId) -> BotResult<()> {
        self.element(element)?.clear().await.map_err(cmd_err)
    }

    async fn send_keys(&self, element: ElementId, text: &str) -> BotResult<()> {
        self.element(element)?.send_keys(text).await.map_err(cmd_err)
    }

    async fn execute_script(&self, script: &str) -> BotResult<()> {
        self.client
            .execute(script, Vec::new())
            .await
            .map(|_| ())
            .map_err(cmd_err)
    }

    async fn screenshot(&self) -> BotResult<Vec<u8>> {
        self.client.screenshot().await.map_err(cmd_err)
    }

    async fn quit(&self) -> BotResult<()> {
        self.elements.lock().clear();
        self.client.clone().close().await.map_err(cmd_err)
    }
}

/// Connects to a running WebDriver endpoint with the launch capabilities
pub struct FantocciniLauncher;

#[async_trait]
impl SessionLauncher for FantocciniLauncher {
    async fn launch(&self, options: &LaunchOptions) -> BotResult<Box<dyn Driver>> {
        let client = ClientBuilder::native()
            .capabilities(options.capabilities())
            .connect(&options.webdriver_url)
            .await
            .map_err(|e| BotError::DriverInitFailed(e.to_string()))?;

        if let Err(e) = client
            .set_window_size(options.window_width, options.window_height)
            .await
        {
            logger::debug(LogTag::Browser, &format!("set_window_size failed: {}", e));
        }

        Ok(Box::new(WebDriverBackend::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_reference_reuses_id() {
        let mut cache: ElementCache<String, &str> = ElementCache::new(8);
        let first = cache.insert("node-1".to_string(), "balance");
        let again = cache.insert("node-1".to_string(), "balance");
        let other = cache.insert("node-2".to_string(), "price");

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(first), Some("balance"));
    }

    #[test]
    fn test_repeated_polling_stays_bounded() {
        let mut cache: ElementCache<String, usize> = ElementCache::new(4);

        // the same page re-queried many times
        for _ in 0..1_000 {
            for node in 0..3 {
                cache.insert(format!("node-{}", node), node);
            }
        }
        assert_eq!(cache.len(), 3);

        // a re-rendering page keeps producing fresh references
        let mut last = 0;
        for n in 0..1_000 {
            last = cache.insert(format!("fresh-{}", n), n);
            assert!(cache.len() <= 4);
        }
        assert_eq!(cache.get(last), Some(999));
        assert_eq!(cache.by_ref.len(), cache.len());
        assert_eq!(cache.order.len(), cache.len());
    }

    #[test]
    fn test_evicted_id_is_stale() {
        let mut cache: ElementCache<String, &str> = ElementCache::new(2);
        let oldest = cache.insert("a".to_string(), "a");
        cache.insert("b".to_string(), "b");
        cache.insert("c".to_string(), "c");

        assert_eq!(cache.get(oldest), None);
        // the evicted reference gets a new id when found again
        let renewed = cache.insert("a".to_string(), "a");
        assert_ne!(renewed, oldest);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
