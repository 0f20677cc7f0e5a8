use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use crate::runner::state::ConsoleEvent;

/// Sending half of the console subscription
pub type ConsoleSink = mpsc::UnboundedSender<ConsoleEvent>;

/// Browser capability the harness is written against.
///
/// Elements are addressed by selector plus an index into the match list,
/// so a step never holds on to a live element handle between actions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Get driver name for logging
    fn name(&self) -> &str;

    /// Start forwarding console messages and page errors into `sink`.
    /// Called once per session.
    async fn subscribe_console(&self, sink: ConsoleSink) -> Result<()>;

    /// Load `url` and wait until the page has loaded, bounded by `timeout_ms`
    async fn goto(&self, url: &str, timeout_ms: u64) -> Result<()>;

    /// Document title
    async fn title(&self) -> Result<String>;

    /// Number of elements matching `selector`
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Whether the `index`-th match is visible. Missing elements are not visible.
    async fn is_visible(&self, selector: &str, index: usize) -> Result<bool>;

    /// Text content of the `index`-th match
    async fn text_content(&self, selector: &str, index: usize) -> Result<Option<String>>;

    /// Click the `index`-th match. `force` skips actionability checks so a
    /// transient overlay cannot intercept the click.
    async fn click(&self, selector: &str, index: usize, force: bool, timeout_ms: u64) -> Result<()>;

    /// Fill the first match with `value`
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Press and release a key on the page
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Full-page screenshot to `path`, creating parent directories
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Release the page and browser
    async fn close(&self) -> Result<()>;
}
