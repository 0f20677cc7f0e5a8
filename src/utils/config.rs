use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::HarnessError;

/// Browser engine to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl std::str::FromStr for BrowserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Logical element role -> selector.
///
/// Modal-relative roles (`modal_title` excepted, it is a page-level id in
/// the target app) are resolved inside `modal` via [`SelectorMap::in_modal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectorMap {
    pub registration_input: String,
    pub registration_submit: String,
    pub dashboard: String,
    pub leaderboard_entry: String,
    pub modal: String,
    pub modal_title: String,
    pub modal_body: String,
    pub loading_indicator: String,
    pub close_button: String,
    pub dismiss_icon: String,
}

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            registration_input: "#player-name".to_string(),
            registration_submit: "#registration-form button[type=\"submit\"]".to_string(),
            dashboard: "#dashboard-screen".to_string(),
            leaderboard_entry: ".leaderboard-item".to_string(),
            modal: "#playerStatsModal".to_string(),
            modal_title: "#playerStatsModalLabel".to_string(),
            modal_body: ".modal-body".to_string(),
            loading_indicator: ".spinner-border, .loading".to_string(),
            close_button: "button:has-text(\"Close\")".to_string(),
            dismiss_icon: ".btn-close, [data-bs-dismiss=\"modal\"]".to_string(),
        }
    }
}

impl SelectorMap {
    /// Chain `child` under the modal element.
    pub fn in_modal(&self, child: &str) -> String {
        format!("{} >> {}", self.modal, child)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RapidClickConfig {
    pub index: usize,
    pub repetitions: u32,
    pub interval_ms: u64,
}

impl Default for RapidClickConfig {
    fn default() -> Self {
        Self {
            index: 0,
            repetitions: 3,
            interval_ms: 500,
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
    pub base_url: String,
    pub headless: bool,
    pub browser: BrowserKind,
    pub viewport: Viewport,

    /// Upper bound for navigation and single browser actions (ms)
    pub step_timeout_ms: u64,
    /// Wait for a modal to appear after clicking an entry (ms)
    pub settle_ms: u64,
    /// Wait for the dashboard after submitting registration (ms)
    pub registration_settle_ms: u64,
    pub close_settle_ms: u64,
    /// Wait for late console events before the report is finalized (ms)
    pub console_grace_ms: u64,
    /// Pause after every browser action (ms)
    pub slow_mo_ms: u64,

    /// Console errors tolerated before the verdict turns to FAIL
    pub error_tolerance: usize,

    pub output_dir: PathBuf,
    pub report_path: Option<PathBuf>,
    pub junit: bool,

    pub player_names: Vec<String>,
    pub max_click_cycles: usize,
    pub entry_preview_limit: usize,
    pub rapid_click: RapidClickConfig,
    pub stats_markers: Vec<String>,
    pub cancel_key: String,
    pub selectors: SelectorMap,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/index.html".to_string(),
            headless: false,
            browser: BrowserKind::Chromium,
            viewport: Viewport::default(),
            step_timeout_ms: 10_000,
            settle_ms: 2_000,
            registration_settle_ms: 3_000,
            close_settle_ms: 1_000,
            console_grace_ms: 250,
            slow_mo_ms: 0,
            error_tolerance: 1,
            output_dir: PathBuf::from("test_screenshots"),
            report_path: None,
            junit: false,
            player_names: vec!["Test User".to_string()],
            max_click_cycles: 3,
            entry_preview_limit: 5,
            rapid_click: RapidClickConfig::default(),
            stats_markers: vec!["Total Points".to_string(), "Activities".to_string()],
            cancel_key: "Escape".to_string(),
            selectors: SelectorMap::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from a YAML file, or defaults when no file is given.
    /// Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, HarnessError> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .map_err(|e| HarnessError::Config(format!("{}: {}", p.display(), e)))?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, HarnessError> {
        serde_yaml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("PROBE_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(v) = std::env::var("PROBE_HEADLESS") {
            self.headless = v == "true" || v == "1";
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join("report.json"))
    }

    pub fn junit_path(&self) -> PathBuf {
        self.report_path()
            .parent()
            .map(|p| p.join("junit.xml"))
            .unwrap_or_else(|| PathBuf::from("junit.xml"))
    }
}
