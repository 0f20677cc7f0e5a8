//! Human-readable run summary.

use colored::Colorize;
use std::fmt::Write;

use super::types::{Report, Verdict};
use crate::runner::state::{Severity, StepData};

/// Console errors listed before the rest are elided
const ERROR_PREVIEW: usize = 5;

/// Render the summary printed at the end of a run
pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(out, "\n{}", "=".repeat(60));
    let _ = writeln!(out, "{}", "LEADERBOARD PROBE REPORT".bold());
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "Session:  {}", report.session_id);
    let _ = writeln!(out, "Target:   {}", report.target_url);
    let _ = writeln!(out, "Started:  {}", report.started_at);
    if let Some(title) = page_title(report) {
        let _ = writeln!(out, "Title:    {}", title);
    }

    let _ = writeln!(out, "\n{}", "Steps".bold());
    for result in &report.steps {
        let mark = if result.succeeded {
            "✓".green()
        } else {
            "✗".red()
        };
        match &result.detail {
            Some(detail) => {
                let _ = writeln!(out, "  {} {} ({})", mark, result.step_name, detail);
            }
            None => {
                let _ = writeln!(out, "  {} {}", mark, result.step_name);
            }
        }
    }

    let _ = writeln!(out, "\n{}", "Interactions".bold());
    let _ = writeln!(out, "  Steps passed:          {}", s.steps_passed);
    let _ = writeln!(out, "  Steps failed:          {}", s.steps_failed);
    let _ = writeln!(out, "  Successful clicks:     {}", s.click_successes);
    let _ = writeln!(out, "  Failed clicks:         {}", s.click_failures);
    let _ = writeln!(out, "  Rapid click failures:  {}", s.rapid_click_failures);
    let rate = match s.click_success_rate() {
        Some(rate) => format!("{:.1}%", rate),
        None => "N/A".to_string(),
    };
    let _ = writeln!(out, "  Click success rate:    {}", rate);

    let _ = writeln!(out, "\n{}", "Console".bold());
    let _ = writeln!(out, "  Total events:  {}", s.total_console_events);
    let _ = writeln!(out, "  Warnings:      {}", s.console_warnings);
    let _ = writeln!(
        out,
        "  Errors:        {} (tolerance {})",
        s.console_errors, report.error_tolerance
    );

    let errors: Vec<_> = report
        .console
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .collect();
    for event in errors.iter().take(ERROR_PREVIEW) {
        let _ = writeln!(out, "    - {}", event.message.red());
    }
    if errors.len() > ERROR_PREVIEW {
        let _ = writeln!(out, "    ... and {} more", errors.len() - ERROR_PREVIEW);
    }

    if !report.screenshots.is_empty() {
        let _ = writeln!(out, "\n{}", "Screenshots".bold());
        for shot in &report.screenshots {
            let _ = writeln!(out, "  {:02} {}", shot.ordinal, shot.path.display());
        }
    }

    let verdict = match report.verdict {
        Verdict::Pass => "PASS".green().bold(),
        Verdict::Fail => "FAIL".red().bold(),
    };
    let _ = writeln!(out, "\nVerdict: {}", verdict);
    let _ = writeln!(out, "{}", "=".repeat(60));
    out
}

fn page_title(report: &Report) -> Option<&str> {
    report.steps.iter().find_map(|r| match &r.data {
        StepData::Navigation { title, .. } => title.as_deref(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::VerdictPolicy;
    use crate::runner::state::{ConsoleEvent, ResultAccumulator, ScenarioResult, StepKind};

    fn plain(report: &Report) -> String {
        colored::control::set_override(false);
        render(report)
    }

    #[test]
    fn test_rate_is_na_without_click_cycles() {
        let acc = ResultAccumulator::new("s", "http://x", VerdictPolicy::default());
        let text = plain(&acc.finalize());
        assert!(text.contains("Click success rate:    N/A"));
        assert!(text.contains("Verdict: FAIL"));
    }

    #[test]
    fn test_lists_first_five_errors_only() {
        let mut acc = ResultAccumulator::new("s", "http://x", VerdictPolicy::default());
        acc.record(ScenarioResult::success(
            "navigate",
            StepKind::Navigate,
            StepData::Navigation {
                url: "http://x".into(),
                title: Some("Iron Turtle".into()),
            },
        ));
        for i in 0..7 {
            acc.record_console_event(ConsoleEvent::now(Severity::Error, format!("boom {}", i)));
        }
        let text = plain(&acc.finalize());

        assert!(text.contains("Title:    Iron Turtle"));
        assert!(text.contains("boom 4"));
        assert!(!text.contains("boom 5"));
        assert!(text.contains("... and 2 more"));
    }
}
