//! Scripted in-memory page used by unit tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::driver::traits::{BrowserDriver, ConsoleSink};
use crate::runner::state::{ConsoleEvent, Severity};
use crate::utils::config::SelectorMap;

#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub text: String,
    pub visible: bool,
    pub opens_modal: bool,
    pub click_fails: bool,
}

impl FakeEntry {
    pub fn player(name: &str, points: u32) -> Self {
        Self {
            text: format!("{}\n{} pts", name, points),
            visible: true,
            opens_modal: true,
            click_fails: false,
        }
    }
}

/// What the fake page looks like and how it reacts
#[derive(Debug, Clone)]
pub struct FakePage {
    pub reachable: bool,
    pub title: String,
    pub registration_form: bool,
    pub registration_works: bool,
    pub dashboard_visible: bool,
    pub entries: Vec<FakeEntry>,
    pub modal_open: Option<usize>,
    pub modal_has_close_button: bool,
    pub modal_has_dismiss_icon: bool,
    pub modal_loading: bool,
    pub modal_body: String,
    /// Console events emitted on subscription
    pub console: Vec<ConsoleEvent>,
    /// Console events emitted after `late_console_delay_ms`
    pub late_console: Vec<ConsoleEvent>,
    pub late_console_delay_ms: u64,
    pub console_unavailable: bool,
    /// Panic when the title is read
    pub title_panics: bool,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            reachable: true,
            title: "Iron Turtle Challenge".to_string(),
            registration_form: true,
            registration_works: true,
            dashboard_visible: false,
            entries: vec![
                FakeEntry::player("Alice", 40),
                FakeEntry::player("Bob", 25),
                FakeEntry::player("Charlie", 10),
            ],
            modal_open: None,
            modal_has_close_button: true,
            modal_has_dismiss_icon: true,
            modal_loading: false,
            modal_body: "Total Points: 40\nActivities: 3".to_string(),
            console: vec![ConsoleEvent::now(Severity::Log, "app initialised")],
            late_console: Vec::new(),
            late_console_delay_ms: 0,
            console_unavailable: false,
            title_panics: false,
        }
    }
}

/// Everything the harness did to the fake page
#[derive(Debug, Default, Clone)]
pub struct FakeLog {
    pub filled: Vec<(String, String)>,
    pub clicks: Vec<(String, usize, bool)>,
    pub keys: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub closes: usize,
    pub subscriptions: usize,
}

#[derive(Clone)]
pub struct FakeDriver {
    selectors: SelectorMap,
    page: Arc<Mutex<FakePage>>,
    log: Arc<Mutex<FakeLog>>,
}

impl FakeDriver {
    pub fn new(page: FakePage) -> Self {
        Self {
            selectors: SelectorMap::default(),
            page: Arc::new(Mutex::new(page)),
            log: Arc::new(Mutex::new(FakeLog::default())),
        }
    }

    pub fn log(&self) -> FakeLog {
        self.log.lock().unwrap().clone()
    }

    pub fn page(&self) -> FakePage {
        self.page.lock().unwrap().clone()
    }

    fn modal_child(&self, selector: &str, child: &str) -> bool {
        selector == self.selectors.in_modal(child)
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    async fn subscribe_console(&self, sink: ConsoleSink) -> Result<()> {
        self.log.lock().unwrap().subscriptions += 1;
        let mut page = self.page.lock().unwrap();
        if page.console_unavailable {
            bail!("page event stream closed");
        }
        for event in page.console.drain(..) {
            let _ = sink.send(event);
        }

        let late: Vec<_> = page.late_console.drain(..).collect();
        if !late.is_empty() {
            let delay = std::time::Duration::from_millis(page.late_console_delay_ms);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for event in late {
                    let _ = sink.send(event);
                }
            });
        }
        Ok(())
    }

    async fn goto(&self, url: &str, _timeout_ms: u64) -> Result<()> {
        if !self.page.lock().unwrap().reachable {
            bail!("net::ERR_CONNECTION_REFUSED at {}", url);
        }
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let panics = self.page.lock().unwrap().title_panics;
        if panics {
            panic!("title read crashed");
        }
        Ok(self.page.lock().unwrap().title.clone())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let page = self.page.lock().unwrap();
        let s = &self.selectors;
        let n = if selector == s.leaderboard_entry {
            page.entries.len()
        } else if selector == s.registration_input || selector == s.registration_submit {
            page.registration_form as usize
        } else if selector == s.modal {
            1
        } else if self.modal_child(selector, &s.close_button) {
            (page.modal_open.is_some() && page.modal_has_close_button) as usize
        } else if self.modal_child(selector, &s.dismiss_icon) {
            (page.modal_open.is_some() && page.modal_has_dismiss_icon) as usize
        } else if self.modal_child(selector, &s.loading_indicator) {
            (page.modal_open.is_some() && page.modal_loading) as usize
        } else {
            0
        };
        Ok(n)
    }

    async fn is_visible(&self, selector: &str, index: usize) -> Result<bool> {
        let page = self.page.lock().unwrap();
        let s = &self.selectors;
        let visible = if selector == s.leaderboard_entry {
            page.entries.get(index).map(|e| e.visible).unwrap_or(false)
        } else if selector == s.registration_input {
            page.registration_form
        } else if selector == s.dashboard {
            page.dashboard_visible
        } else if selector == s.modal {
            page.modal_open.is_some()
        } else {
            false
        };
        Ok(visible)
    }

    async fn text_content(&self, selector: &str, index: usize) -> Result<Option<String>> {
        let page = self.page.lock().unwrap();
        let s = &self.selectors;
        if selector == s.leaderboard_entry {
            return Ok(page.entries.get(index).map(|e| e.text.clone()));
        }
        if let Some(open) = page.modal_open {
            if selector == s.modal_title {
                let name = page.entries[open].text.lines().next().unwrap_or_default();
                return Ok(Some(format!("{} - Statistics", name)));
            }
            if self.modal_child(selector, &s.modal_body) {
                return Ok(Some(page.modal_body.clone()));
            }
        }
        Ok(None)
    }

    async fn click(&self, selector: &str, index: usize, force: bool, _timeout_ms: u64) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .clicks
            .push((selector.to_string(), index, force));

        let mut page = self.page.lock().unwrap();
        let s = &self.selectors;
        if selector == s.leaderboard_entry {
            let Some(entry) = page.entries.get(index).cloned() else {
                bail!("Element not found: {} at index {}", selector, index);
            };
            if entry.click_fails {
                bail!("element is detached from the DOM");
            }
            if entry.opens_modal {
                page.modal_open = Some(index);
            }
        } else if selector == s.registration_submit {
            if page.registration_works {
                page.registration_form = false;
                page.dashboard_visible = true;
            }
        } else if self.modal_child(selector, &s.close_button)
            || self.modal_child(selector, &s.dismiss_icon)
        {
            page.modal_open = None;
        } else {
            bail!("Element not found: {}", selector);
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .filled
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.log.lock().unwrap().keys.push(key.to_string());
        if key == "Escape" {
            self.page.lock().unwrap().modal_open = None;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.log.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
