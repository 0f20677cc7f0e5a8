use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::HarnessError;
use crate::report::types::{Report, ReportSummary, Verdict, VerdictPolicy};

/// Browser console severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Log,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map a browser console message type onto a severity.
    pub fn from_console_type(kind: &str) -> Self {
        match kind {
            "error" | "assert" => Severity::Error,
            "warning" | "warn" => Severity::Warning,
            "info" => Severity::Info,
            _ => Severity::Log,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Log => "log",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEvent {
    pub severity: Severity,
    pub message: String,
    pub timestamp: String,
}

impl ConsoleEvent {
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }

    /// A capture failure, reported in-band instead of raised.
    pub fn capture_failure(err: &HarnessError) -> Self {
        Self::now(Severity::Error, err.to_string())
    }
}

/// Step kind, used to aggregate results regardless of their names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    SessionStart,
    Navigate,
    RegisterUser,
    ListLeaderboardEntries,
    ClickEntryAndObserveModal,
    CloseModal,
    RapidClick,
    Checkpoint,
}

/// How `closeModal` dismissed the modal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseMethod {
    CloseButton,
    DismissIcon,
    CancelKey,
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow {
    pub index: usize,
    pub visible: bool,
    /// Only captured for the first few entries
    pub text: Option<String>,
}

/// Per-kind payload of a scenario result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StepData {
    None,
    #[serde(rename_all = "camelCase")]
    Navigation { url: String, title: Option<String> },
    #[serde(rename_all = "camelCase")]
    Registration {
        name: String,
        form_present: bool,
        dashboard_visible: bool,
    },
    #[serde(rename_all = "camelCase")]
    Leaderboard { count: usize, entries: Vec<EntryRow> },
    #[serde(rename_all = "camelCase")]
    Modal {
        index: usize,
        player_name: Option<String>,
        modal_opened: bool,
        title: Option<String>,
        has_spinner: bool,
        has_stats: bool,
    },
    #[serde(rename_all = "camelCase")]
    Close { method: CloseMethod, closed: bool },
    #[serde(rename_all = "camelCase")]
    ClickAttempt {
        index: usize,
        attempt: u32,
        modal_opened: bool,
    },
    #[serde(rename_all = "camelCase")]
    Checkpoint { screenshot: Option<PathBuf> },
}

/// Outcome of one executed step (or rapid-click sub-attempt)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub step_name: String,
    pub kind: StepKind,
    pub succeeded: bool,
    pub detail: Option<String>,
    pub error_kind: Option<String>,
    pub data: StepData,
}

impl ScenarioResult {
    pub fn success(step_name: impl Into<String>, kind: StepKind, data: StepData) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            succeeded: true,
            detail: None,
            error_kind: None,
            data,
        }
    }

    pub fn failure(
        step_name: impl Into<String>,
        kind: StepKind,
        err: &HarnessError,
        data: StepData,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            kind,
            succeeded: false,
            detail: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            data,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotRef {
    pub ordinal: usize,
    pub step_name: String,
    pub path: PathBuf,
}

/// Append-only record of everything a run observed.
///
/// `finalize` only reads, so it can be called any number of times.
#[derive(Debug, Clone)]
pub struct ResultAccumulator {
    session_id: String,
    target_url: String,
    started_at: String,
    policy: VerdictPolicy,
    results: Vec<ScenarioResult>,
    console: Vec<ConsoleEvent>,
    screenshots: Vec<ScreenshotRef>,
}

impl ResultAccumulator {
    pub fn new(session_id: &str, target_url: &str, policy: VerdictPolicy) -> Self {
        Self {
            session_id: session_id.to_string(),
            target_url: target_url.to_string(),
            started_at: chrono::Local::now().to_rfc3339(),
            policy,
            results: Vec::new(),
            console: Vec::new(),
            screenshots: Vec::new(),
        }
    }

    pub fn record(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    pub fn record_console_event(&mut self, event: ConsoleEvent) {
        self.console.push(event);
    }

    /// Register a screenshot and return its reference.
    pub fn record_screenshot(&mut self, step_name: &str, path: PathBuf) -> &ScreenshotRef {
        let ordinal = self.screenshots.len() + 1;
        self.screenshots.push(ScreenshotRef {
            ordinal,
            step_name: step_name.to_string(),
            path,
        });
        &self.screenshots[ordinal - 1]
    }

    /// Ordinal the next screenshot will get.
    pub fn next_screenshot_ordinal(&self) -> usize {
        self.screenshots.len() + 1
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    pub fn console_events(&self) -> &[ConsoleEvent] {
        &self.console
    }

    pub fn screenshots(&self) -> &[ScreenshotRef] {
        &self.screenshots
    }

    pub fn finalize(&self) -> Report {
        let summary = summarize(&self.results, &self.console);
        let verdict = Verdict::decide(&summary, &self.policy);

        Report {
            session_id: self.session_id.clone(),
            target_url: self.target_url.clone(),
            started_at: self.started_at.clone(),
            error_tolerance: self.policy.error_tolerance,
            verdict,
            summary,
            steps: self.results.clone(),
            console: self.console.clone(),
            screenshots: self.screenshots.clone(),
        }
    }
}

fn summarize(results: &[ScenarioResult], console: &[ConsoleEvent]) -> ReportSummary {
    let mut summary = ReportSummary::default();

    for result in results {
        if result.succeeded {
            summary.steps_passed += 1;
        } else {
            summary.steps_failed += 1;
        }

        match (result.kind, result.succeeded) {
            (StepKind::ClickEntryAndObserveModal, true) => summary.click_successes += 1,
            (StepKind::ClickEntryAndObserveModal, false) => summary.click_failures += 1,
            (StepKind::RapidClick, false) => summary.rapid_click_failures += 1,
            _ => {}
        }
    }

    for event in console {
        match event.severity {
            Severity::Error => summary.console_errors += 1,
            Severity::Warning => summary.console_warnings += 1,
            _ => {}
        }
    }
    summary.total_console_events = console.len();

    summary
}
