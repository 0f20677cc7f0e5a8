//! Browser driver implementation using Playwright
//!
//! One browser, one context, one page per driver. All page access goes
//! through a mutex so at most one browser operation is in flight.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use playwright::api::page::Event as PageEvent;
use playwright::api::{Browser, BrowserContext, DocumentLoadState, ElementHandle, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use tokio::sync::Mutex;

use crate::driver::traits::{BrowserDriver, ConsoleSink};
use crate::error::HarnessError;
use crate::runner::state::{ConsoleEvent, Severity};
use crate::utils::browser_resolver;
use crate::utils::config::{BrowserKind, HarnessConfig};

/// Reports uncaught page errors through `console.error` so they reach the
/// console subscription with error severity.
const PAGE_ERROR_HOOK: &str = r#"
(() => {
    window.addEventListener('error', (e) => {
        console.error('[pageerror] ' + (e.message || String(e.error)));
    });
    window.addEventListener('unhandledrejection', (e) => {
        console.error('[pageerror] unhandled rejection: ' + String(e.reason));
    });
})();
"#;

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Pause after every page action (ms)
    pub slow_mo_ms: u64,
}

impl From<&HarnessConfig> for WebDriverConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            browser_type: config.browser,
            headless: config.headless,
            viewport_width: config.viewport.width,
            viewport_height: config.viewport.height,
            slow_mo_ms: config.slow_mo_ms,
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    // Dropping the Playwright handle stops the driver process.
    #[allow(dead_code)]
    playwright: Playwright,
    browser: Browser,
    #[allow(dead_code)]
    context: BrowserContext,
    page: Mutex<Page>,
    config: WebDriverConfig,
}

impl WebDriver {
    /// Launch a browser and open one page
    pub async fn launch(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserKind::Chromium => launch_chromium_browser(&playwright.chromium(), &config).await?,
            BrowserKind::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserKind::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        log::info!(
            "launched {:?} (headless: {}, viewport {}x{})",
            config.browser_type,
            config.headless,
            config.viewport_width,
            config.viewport_height
        );

        Ok(Self {
            playwright,
            browser,
            context,
            page: Mutex::new(page),
            config,
        })
    }

    async fn pace(&self) {
        if self.config.slow_mo_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.slow_mo_ms)).await;
        }
    }

    async fn nth_element(page: &Page, selector: &str, index: usize) -> Result<Option<ElementHandle>> {
        let elements = page.query_selector_all(selector).await?;
        Ok(elements.into_iter().nth(index))
    }
}

#[async_trait]
impl BrowserDriver for WebDriver {
    fn name(&self) -> &str {
        match self.config.browser_type {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }

    async fn subscribe_console(&self, sink: ConsoleSink) -> Result<()> {
        let page = self.page.lock().await;

        if let Err(e) = page.add_init_script(PAGE_ERROR_HOOK).await {
            log::warn!("page error hook not installed: {:?}", e);
        }

        let events = page.subscribe_event()?;
        tokio::spawn(async move {
            futures_util::pin_mut!(events);
            while let Some(event) = events.next().await {
                let forwarded = match event {
                    Ok(PageEvent::Console(msg)) => {
                        let kind = msg.r#type().unwrap_or_default();
                        let text = msg.text().unwrap_or_default();
                        ConsoleEvent::now(Severity::from_console_type(&kind), text)
                    }
                    Ok(_) => continue,
                    Err(e) => ConsoleEvent::capture_failure(&HarnessError::ConsoleCapture(
                        e.to_string(),
                    )),
                };
                if sink.send(forwarded).is_err() {
                    // Session is gone
                    break;
                }
            }
            log::debug!("console subscription ended");
        });

        Ok(())
    }

    async fn goto(&self, url: &str, timeout_ms: u64) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .wait_until(DocumentLoadState::Load)
            .timeout(timeout_ms as f64)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        drop(page);
        self.pace().await;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.title().await?)
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let page = self.page.lock().await;
        Ok(page.query_selector_all(selector).await?.len())
    }

    async fn is_visible(&self, selector: &str, index: usize) -> Result<bool> {
        let page = self.page.lock().await;
        match Self::nth_element(&page, selector, index).await? {
            Some(el) => Ok(el.is_visible().await?),
            None => Ok(false),
        }
    }

    async fn text_content(&self, selector: &str, index: usize) -> Result<Option<String>> {
        let page = self.page.lock().await;
        match Self::nth_element(&page, selector, index).await? {
            Some(el) => Ok(el.text_content().await?),
            None => Ok(None),
        }
    }

    async fn click(&self, selector: &str, index: usize, force: bool, timeout_ms: u64) -> Result<()> {
        let page = self.page.lock().await;
        let el = Self::nth_element(&page, selector, index)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Element not found: {} at index {}", selector, index))?;
        el.click_builder()
            .force(force)
            .timeout(timeout_ms as f64)
            .click()
            .await?;
        drop(page);
        self.pace().await;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        let el = page
            .query_selector(selector)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Element not found: {}", selector))?;
        el.fill_builder(value).fill().await?;
        drop(page);
        self.pace().await;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.keyboard.down(key).await?;
        page.keyboard.up(key).await?;
        drop(page);
        self.pace().await;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .full_page(true)
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        log::info!("browser closed");
        Ok(())
    }
}

/// Launch Chromium, preferring a locally installed browser
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<Browser> {
    let mut launcher = chromium.launcher();
    launcher = launcher.headless(config.headless);

    let executable = browser_resolver::find_chromium();
    if let Some(ref path) = executable {
        log::info!("using browser executable: {}", path.display());
        launcher = launcher.executable(path);
    } else {
        log::info!("no local browser found, using the Playwright bundled Chromium");
    }

    let args: Vec<String> = [
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--ignore-certificate-errors",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}
