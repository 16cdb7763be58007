/// Automation driver abstraction
///
/// Everything above the browser layer talks to a `Driver`: the fantoccini
/// backend in production, `testing::FakeDriver` in tests. Elements are opaque
/// ids valid until the next navigation.
use super::locator::By;
use crate::errors::BotResult;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub u64);

#[async_trait]
pub trait Driver: Send + Sync {
    async fn goto(&self, url: &str) -> BotResult<()>;
    async fn current_url(&self) -> BotResult<String>;
    async fn title(&self) -> BotResult<String>;
    async fn page_source(&self) -> BotResult<String>;

    /// All elements matching `by`, in document order
    async fn find_all(&self, by: &By) -> BotResult<Vec<ElementId>>;
    async fn is_displayed(&self, element: ElementId) -> BotResult<bool>;
    async fn is_enabled(&self, element: ElementId) -> BotResult<bool>;
    async fn text(&self, element: ElementId) -> BotResult<String>;
    async fn click(&self, element: ElementId) -> BotResult<()>;
    async fn clear(&self, element: ElementId) -> BotResult<()>;
    async fn send_keys(&self, element: ElementId, text: &str) -> BotResult<()>;

    async fn execute_script(&self, script: &str) -> BotResult<()>;
    /// PNG bytes of the current viewport
    async fn screenshot(&self) -> BotResult<Vec<u8>>;
    /// End the browser session; further calls fail
    async fn quit(&self) -> BotResult<()>;
}
