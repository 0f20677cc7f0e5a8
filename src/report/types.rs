use crate::runner::state::{ConsoleEvent, ScenarioResult, ScreenshotRef};
use serde::{Deserialize, Serialize};

/// Verdict rule settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictPolicy {
    /// Maximum number of console errors a passing run may contain
    pub error_tolerance: usize,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self { error_tolerance: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// PASS iff at least one modal opened and console errors stay within tolerance.
    pub fn decide(summary: &ReportSummary, policy: &VerdictPolicy) -> Self {
        if summary.click_successes > 0 && summary.console_errors <= policy.error_tolerance {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub steps_passed: u32,
    pub steps_failed: u32,
    pub click_successes: u32,
    pub click_failures: u32,
    pub rapid_click_failures: u32,
    pub console_errors: usize,
    pub console_warnings: usize,
    pub total_console_events: usize,
}

impl ReportSummary {
    /// Click-cycle success percentage, `None` when no cycle ran.
    pub fn click_success_rate(&self) -> Option<f64> {
        let total = self.click_successes + self.click_failures;
        if total == 0 {
            None
        } else {
            Some(self.click_successes as f64 / total as f64 * 100.0)
        }
    }
}

/// Final, read-only view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub session_id: String,
    pub target_url: String,
    pub started_at: String,
    pub error_tolerance: usize,
    pub verdict: Verdict,
    pub summary: ReportSummary,
    pub steps: Vec<ScenarioResult>,
    pub console: Vec<ConsoleEvent>,
    pub screenshots: Vec<ScreenshotRef>,
}
