//! Scenario steps: small probes over the browser capability.
//!
//! A step reads page state, returns its results, and only raises for
//! failures that make the rest of the run meaningless (see
//! [`HarnessError::is_fatal`]). Everything else is converted into a failed
//! [`ScenarioResult`] at the step boundary.

use std::path::PathBuf;
use tokio::time::{sleep, Duration, Instant};

use crate::driver::traits::BrowserDriver;
use crate::error::HarnessError;
use crate::runner::state::{
    CloseMethod, EntryRow, ResultAccumulator, ScenarioResult, StepData, StepKind,
};
use crate::utils::config::HarnessConfig;

const POLL_INTERVAL_MS: u64 = 100;
const ENTRY_TEXT_MAX_CHARS: usize = 50;

/// What a step needs while running
pub struct StepContext<'a> {
    pub driver: &'a dyn BrowserDriver,
    pub config: &'a HarnessConfig,
    pub accumulator: &'a mut ResultAccumulator,
    /// Entry count seen by the last leaderboard observation
    pub entry_count: Option<usize>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        config: &'a HarnessConfig,
        accumulator: &'a mut ResultAccumulator,
    ) -> Self {
        Self {
            driver,
            config,
            accumulator,
            entry_count: None,
        }
    }

    /// Capture `{ordinal}_{name}.png` into the output directory.
    /// A failed capture is logged and yields `None`.
    pub async fn screenshot(&mut self, name: &str) -> Option<PathBuf> {
        let ordinal = self.accumulator.next_screenshot_ordinal();
        let path = self
            .config
            .output_dir
            .join(format!("{:02}_{}.png", ordinal, name));

        match self.driver.screenshot(&path).await {
            Ok(()) => {
                log::debug!("screenshot saved: {}", path.display());
                Some(self.accumulator.record_screenshot(name, path).path.clone())
            }
            Err(e) => {
                log::warn!("screenshot '{}' failed: {:#}", name, e);
                None
            }
        }
    }

    /// Poll until the `index`-th match of `selector` is visible or `timeout_ms` elapses.
    /// Always checks at least once.
    pub async fn wait_until_visible(
        &self,
        selector: &str,
        index: usize,
        timeout_ms: u64,
    ) -> Result<bool, HarnessError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let visible = self
                .driver
                .is_visible(selector, index)
                .await
                .map_err(|e| HarnessError::query(selector, format!("{:#}", e)))?;
            if visible {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep((deadline - now).min(Duration::from_millis(POLL_INTERVAL_MS))).await;
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, HarnessError> {
        self.driver
            .count(selector)
            .await
            .map_err(|e| HarnessError::query(selector, format!("{:#}", e)))
    }

    async fn text(&self, selector: &str, index: usize) -> Result<Option<String>, HarnessError> {
        self.driver
            .text_content(selector, index)
            .await
            .map_err(|e| HarnessError::query(selector, format!("{:#}", e)))
    }
}

/// Probe kinds the pipeline can run
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioStep {
    Navigate { url: String },
    RegisterUser { name: String },
    ListLeaderboardEntries,
    /// Click an entry, observe the modal, then close it
    ClickCycle { index: usize },
    RapidClickStress {
        index: usize,
        repetitions: u32,
        interval: Duration,
    },
    /// Named screenshot of the current page
    Checkpoint { name: String },
}

impl ScenarioStep {
    pub fn label(&self) -> String {
        match self {
            ScenarioStep::Navigate { url } => format!("navigate {}", url),
            ScenarioStep::RegisterUser { name } => format!("register user '{}'", name),
            ScenarioStep::ListLeaderboardEntries => "list leaderboard entries".to_string(),
            ScenarioStep::ClickCycle { index } => format!("click cycle on entry {}", index + 1),
            ScenarioStep::RapidClickStress {
                index, repetitions, ..
            } => format!("rapid click x{} on entry {}", repetitions, index + 1),
            ScenarioStep::Checkpoint { name } => format!("checkpoint {}", name),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            ScenarioStep::Navigate { .. } => StepKind::Navigate,
            ScenarioStep::RegisterUser { .. } => StepKind::RegisterUser,
            ScenarioStep::ListLeaderboardEntries => StepKind::ListLeaderboardEntries,
            ScenarioStep::ClickCycle { .. } => StepKind::ClickEntryAndObserveModal,
            ScenarioStep::RapidClickStress { .. } => StepKind::RapidClick,
            ScenarioStep::Checkpoint { .. } => StepKind::Checkpoint,
        }
    }

    /// Why this step should not run given what has been observed so far
    pub fn skip_reason(&self, ctx: &StepContext<'_>) -> Option<String> {
        let entries = ctx.entry_count.unwrap_or(0);
        match self {
            ScenarioStep::ClickCycle { index } | ScenarioStep::RapidClickStress { index, .. }
                if *index >= entries =>
            {
                Some(format!("only {} leaderboard entries", entries))
            }
            _ => None,
        }
    }

    /// Run the step. `Err` means the run cannot continue.
    pub async fn execute(
        &self,
        ctx: &mut StepContext<'_>,
    ) -> Result<Vec<ScenarioResult>, HarnessError> {
        match self {
            ScenarioStep::Navigate { url } => Ok(vec![navigate(ctx, url).await?]),
            ScenarioStep::RegisterUser { name } => Ok(vec![register_user(ctx, name).await]),
            ScenarioStep::ListLeaderboardEntries => Ok(vec![list_leaderboard_entries(ctx).await]),
            ScenarioStep::ClickCycle { index } => {
                let observed = click_entry_and_observe_modal(ctx, *index).await;
                let closed = close_modal(ctx).await;
                Ok(vec![observed, closed])
            }
            ScenarioStep::RapidClickStress {
                index,
                repetitions,
                interval,
            } => Ok(rapid_click_stress(ctx, *index, *repetitions, *interval).await),
            ScenarioStep::Checkpoint { name } => Ok(vec![checkpoint(ctx, name).await]),
        }
    }
}

/// Load `url`; fatal if the page never loads within the step timeout.
pub async fn navigate(ctx: &mut StepContext<'_>, url: &str) -> Result<ScenarioResult, HarnessError> {
    ctx.driver
        .goto(url, ctx.config.step_timeout_ms)
        .await
        .map_err(|e| HarnessError::Navigation {
            url: url.to_string(),
            reason: format!("{:#}", e),
        })?;

    let title = match ctx.driver.title().await {
        Ok(t) => Some(t),
        Err(e) => {
            log::debug!("title unavailable: {:#}", e);
            None
        }
    };
    ctx.screenshot("initial_page").await;

    Ok(ScenarioResult::success(
        "navigate",
        StepKind::Navigate,
        StepData::Navigation {
            url: url.to_string(),
            title,
        },
    ))
}

/// Register `name` if the registration form is showing; no-op otherwise.
pub async fn register_user(ctx: &mut StepContext<'_>, name: &str) -> ScenarioResult {
    let step = "register_user";
    match try_register(ctx, name).await {
        Ok((form_present, dashboard_visible)) => {
            let data = StepData::Registration {
                name: name.to_string(),
                form_present,
                dashboard_visible,
            };
            let result = ScenarioResult::success(step, StepKind::RegisterUser, data);
            if form_present {
                result
            } else {
                result.with_detail("registration form absent, already registered")
            }
        }
        Err(err) => ScenarioResult::failure(
            step,
            StepKind::RegisterUser,
            &err,
            StepData::Registration {
                name: name.to_string(),
                form_present: true,
                dashboard_visible: false,
            },
        ),
    }
}

async fn try_register(ctx: &mut StepContext<'_>, name: &str) -> Result<(bool, bool), HarnessError> {
    let config = ctx.config;
    let selectors = &config.selectors;
    let registration_error = |reason: String| HarnessError::Registration {
        name: name.to_string(),
        reason,
    };

    let has_input = ctx.count(&selectors.registration_input).await? > 0
        && ctx
            .wait_until_visible(&selectors.registration_input, 0, 0)
            .await?;
    let has_submit = ctx.count(&selectors.registration_submit).await? > 0;
    if !has_input || !has_submit {
        return Ok((false, false));
    }

    ctx.driver
        .fill(&selectors.registration_input, name)
        .await
        .map_err(|e| registration_error(format!("fill failed: {:#}", e)))?;
    ctx.driver
        .click(
            &selectors.registration_submit,
            0,
            false,
            config.step_timeout_ms,
        )
        .await
        .map_err(|e| registration_error(format!("submit failed: {:#}", e)))?;

    let dashboard_visible = ctx
        .wait_until_visible(&selectors.dashboard, 0, config.registration_settle_ms)
        .await?;
    ctx.screenshot("after_registration").await;

    if !dashboard_visible {
        return Err(registration_error(format!(
            "dashboard not visible after {}ms",
            config.registration_settle_ms
        )));
    }
    Ok((true, true))
}

/// Count leaderboard entries; one row per entry, text for the first few.
pub async fn list_leaderboard_entries(ctx: &mut StepContext<'_>) -> ScenarioResult {
    let step = "list_leaderboard_entries";
    let selector = ctx.config.selectors.leaderboard_entry.clone();

    let outcome = collect_entries(ctx, &selector).await;

    match outcome {
        Ok(rows) => {
            ctx.entry_count = Some(rows.len());
            let result = ScenarioResult::success(
                step,
                StepKind::ListLeaderboardEntries,
                StepData::Leaderboard {
                    count: rows.len(),
                    entries: rows,
                },
            );
            if ctx.entry_count == Some(0) {
                result.with_detail("leaderboard is empty")
            } else {
                result
            }
        }
        Err(err) => {
            ctx.entry_count = Some(0);
            ScenarioResult::failure(
                step,
                StepKind::ListLeaderboardEntries,
                &err,
                StepData::Leaderboard {
                    count: 0,
                    entries: Vec::new(),
                },
            )
        }
    }
}

async fn collect_entries(
    ctx: &StepContext<'_>,
    selector: &str,
) -> Result<Vec<EntryRow>, HarnessError> {
    let count = ctx.count(selector).await?;
    let mut rows = Vec::with_capacity(count);
    for index in 0..count {
        let visible = ctx
            .driver
            .is_visible(selector, index)
            .await
            .map_err(|e| HarnessError::query(selector, format!("{:#}", e)))?;
        let text = if index < ctx.config.entry_preview_limit {
            ctx.text(selector, index)
                .await?
                .map(|t| preview(&t, ENTRY_TEXT_MAX_CHARS))
        } else {
            None
        };
        rows.push(EntryRow {
            index,
            visible,
            text,
        });
    }
    Ok(rows)
}

/// Force-click an entry and inspect the statistics modal.
/// A modal that never shows is a recorded failure.
pub async fn click_entry_and_observe_modal(ctx: &mut StepContext<'_>, index: usize) -> ScenarioResult {
    let step = format!("click_entry_{}", index + 1);
    let selectors = ctx.config.selectors.clone();

    let player_name = match ctx.text(&selectors.leaderboard_entry, index).await {
        Ok(text) => text.and_then(|t| first_line(&t)),
        Err(e) => {
            log::debug!("entry {} text unavailable: {}", index, e);
            None
        }
    };

    let mut data = StepData::Modal {
        index,
        player_name: player_name.clone(),
        modal_opened: false,
        title: None,
        has_spinner: false,
        has_stats: false,
    };

    // A modal left over from an earlier cycle would read as this entry's modal.
    let leftover = match ctx.wait_until_visible(&selectors.modal, 0, 0).await {
        Ok(open) => open,
        Err(err) => {
            return ScenarioResult::failure(step, StepKind::ClickEntryAndObserveModal, &err, data)
        }
    };
    if leftover && !matches!(try_close_modal(ctx).await, Ok((_, true))) {
        let err = HarnessError::click(
            format!("leaderboard entry {}", index + 1),
            "previous modal still open",
        );
        return ScenarioResult::failure(step, StepKind::ClickEntryAndObserveModal, &err, data);
    }

    if let Err(e) = ctx
        .driver
        .click(
            &selectors.leaderboard_entry,
            index,
            true,
            ctx.config.step_timeout_ms,
        )
        .await
    {
        let err = HarnessError::click(format!("leaderboard entry {}", index + 1), format!("{:#}", e));
        return ScenarioResult::failure(step, StepKind::ClickEntryAndObserveModal, &err, data);
    }

    let opened = match ctx
        .wait_until_visible(&selectors.modal, 0, ctx.config.settle_ms)
        .await
    {
        Ok(opened) => opened,
        Err(err) => {
            return ScenarioResult::failure(step, StepKind::ClickEntryAndObserveModal, &err, data)
        }
    };
    if !opened {
        let err = HarnessError::ModalTimeout {
            index,
            timeout_ms: ctx.config.settle_ms,
        };
        return ScenarioResult::failure(step, StepKind::ClickEntryAndObserveModal, &err, data);
    }

    let title = match ctx.text(&selectors.modal_title, 0).await {
        Ok(text) => text.map(|t| t.trim().to_string()),
        Err(e) => {
            log::debug!("modal title unavailable for entry {}: {}", index, e);
            None
        }
    };
    let has_spinner = match ctx
        .count(&selectors.in_modal(&selectors.loading_indicator))
        .await
    {
        Ok(n) => n > 0,
        Err(e) => {
            log::debug!("loading indicator check failed for entry {}: {}", index, e);
            false
        }
    };
    let body = match ctx.text(&selectors.in_modal(&selectors.modal_body), 0).await {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => {
            log::debug!("modal body unavailable for entry {}: {}", index, e);
            String::new()
        }
    };
    let has_stats = ctx
        .config
        .stats_markers
        .iter()
        .any(|marker| body.contains(marker.as_str()));

    ctx.screenshot(&format!("modal_player_{}", index + 1)).await;

    data = StepData::Modal {
        index,
        player_name,
        modal_opened: true,
        title,
        has_spinner,
        has_stats,
    };
    ScenarioResult::success(step, StepKind::ClickEntryAndObserveModal, data)
}

/// Dismiss the modal: close control, then dismiss icon, then the cancel key.
/// Succeeds without acting when no modal is open, fails when the modal is
/// still showing after the close settle period.
pub async fn close_modal(ctx: &mut StepContext<'_>) -> ScenarioResult {
    let step = "close_modal";
    match try_close_modal(ctx).await {
        Ok((method, true)) => ScenarioResult::success(
            step,
            StepKind::CloseModal,
            StepData::Close {
                method,
                closed: true,
            },
        ),
        Ok((method, false)) => ScenarioResult::failure(
            step,
            StepKind::CloseModal,
            &HarnessError::ModalStillOpen {
                method: format!("{:?}", method),
            },
            StepData::Close {
                method,
                closed: false,
            },
        ),
        Err((method, err)) => ScenarioResult::failure(
            step,
            StepKind::CloseModal,
            &err,
            StepData::Close {
                method,
                closed: false,
            },
        ),
    }
}

async fn try_close_modal(
    ctx: &mut StepContext<'_>,
) -> Result<(CloseMethod, bool), (CloseMethod, HarnessError)> {
    let selectors = ctx.config.selectors.clone();

    let open = ctx
        .wait_until_visible(&selectors.modal, 0, 0)
        .await
        .map_err(|e| (CloseMethod::NotOpen, e))?;
    if !open {
        return Ok((CloseMethod::NotOpen, true));
    }

    let candidates = [
        (CloseMethod::CloseButton, selectors.in_modal(&selectors.close_button)),
        (CloseMethod::DismissIcon, selectors.in_modal(&selectors.dismiss_icon)),
    ];

    let mut used = CloseMethod::CancelKey;
    for (method, selector) in &candidates {
        let present = ctx.count(selector).await.map_err(|e| (*method, e))? > 0;
        if present {
            ctx.driver
                .click(selector, 0, false, ctx.config.step_timeout_ms)
                .await
                .map_err(|e| (*method, HarnessError::click(selector.clone(), format!("{:#}", e))))?;
            used = *method;
            break;
        }
    }
    if used == CloseMethod::CancelKey {
        ctx.driver
            .press_key(&ctx.config.cancel_key)
            .await
            .map_err(|e| {
                (
                    CloseMethod::CancelKey,
                    HarnessError::click(format!("key {}", ctx.config.cancel_key), format!("{:#}", e)),
                )
            })?;
    }

    sleep(Duration::from_millis(ctx.config.close_settle_ms)).await;
    let still_open = ctx
        .wait_until_visible(&selectors.modal, 0, 0)
        .await
        .map_err(|e| (used, e))?;
    Ok((used, !still_open))
}

/// Click the same entry `repetitions` times, `interval` apart, closing any
/// modal in between. Records exactly one result per attempt.
pub async fn rapid_click_stress(
    ctx: &mut StepContext<'_>,
    index: usize,
    repetitions: u32,
    interval: Duration,
) -> Vec<ScenarioResult> {
    let selector = ctx.config.selectors.leaderboard_entry.clone();
    let mut results = Vec::with_capacity(repetitions as usize);

    for attempt in 1..=repetitions {
        let step = format!("rapid_click_{}", attempt);
        let mut data = StepData::ClickAttempt {
            index,
            attempt,
            modal_opened: false,
        };

        if let Err(e) = ctx
            .driver
            .click(&selector, index, true, ctx.config.step_timeout_ms)
            .await
        {
            let err = HarnessError::click(
                format!("leaderboard entry {} (attempt {})", index + 1, attempt),
                format!("{:#}", e),
            );
            log::debug!("{}", err);
            results.push(ScenarioResult::failure(step, StepKind::RapidClick, &err, data));
            sleep(interval).await;
            continue;
        }

        sleep(interval).await;

        let opened = ctx
            .wait_until_visible(&ctx.config.selectors.modal, 0, 0)
            .await
            .unwrap_or(false);
        data = StepData::ClickAttempt {
            index,
            attempt,
            modal_opened: opened,
        };

        let result = if opened {
            let close = close_modal(ctx).await;
            if close.succeeded {
                ScenarioResult::success(step, StepKind::RapidClick, data)
            } else {
                let detail = close.detail.unwrap_or_default();
                ScenarioResult {
                    step_name: step,
                    kind: StepKind::RapidClick,
                    succeeded: false,
                    detail: Some(format!("modal could not be closed: {}", detail)),
                    error_kind: close.error_kind,
                    data,
                }
            }
        } else {
            ScenarioResult::success(step, StepKind::RapidClick, data)
        };
        results.push(result);
    }

    results
}

/// Capture a named screenshot of the current page
pub async fn checkpoint(ctx: &mut StepContext<'_>, name: &str) -> ScenarioResult {
    let screenshot = ctx.screenshot(name).await;
    let result = ScenarioResult::success(
        format!("checkpoint_{}", name),
        StepKind::Checkpoint,
        StepData::Checkpoint {
            screenshot: screenshot.clone(),
        },
    );
    if screenshot.is_none() {
        result.with_detail("screenshot unavailable")
    } else {
        result
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeDriver, FakeEntry, FakePage};
    use crate::report::types::VerdictPolicy;

    fn fast_config() -> HarnessConfig {
        HarnessConfig {
            settle_ms: 20,
            registration_settle_ms: 20,
            close_settle_ms: 0,
            output_dir: PathBuf::from("shots"),
            ..Default::default()
        }
    }

    fn accumulator() -> ResultAccumulator {
        ResultAccumulator::new("s", "http://localhost:8080", VerdictPolicy::default())
    }

    #[tokio::test]
    async fn test_list_entries_returns_one_row_per_entry() {
        let config = fast_config();
        for n in [0usize, 1, 7] {
            let page = FakePage {
                entries: (0..n).map(|i| FakeEntry::player(&format!("P{}", i), 1)).collect(),
                ..Default::default()
            };
            let driver = FakeDriver::new(page);
            let mut acc = accumulator();
            let mut ctx = StepContext::new(&driver, &config, &mut acc);

            let result = list_leaderboard_entries(&mut ctx).await;
            assert!(result.succeeded);
            assert_eq!(ctx.entry_count, Some(n));
            match result.data {
                StepData::Leaderboard { count, entries } => {
                    assert_eq!(count, n);
                    assert_eq!(entries.len(), n);
                    assert!(entries.iter().skip(5).all(|e| e.text.is_none()));
                    assert!(entries.iter().take(5).all(|e| e.text.is_some()));
                }
                other => panic!("unexpected data {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_close_modal_without_modal_is_noop() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage::default());
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        for _ in 0..2 {
            let result = close_modal(&mut ctx).await;
            assert!(result.succeeded);
            assert_eq!(
                result.data,
                StepData::Close {
                    method: CloseMethod::NotOpen,
                    closed: true
                }
            );
        }
        assert!(driver.log().clicks.is_empty());
        assert!(driver.log().keys.is_empty());
    }

    #[tokio::test]
    async fn test_close_modal_priority_order() {
        let config = fast_config();
        let cases = [
            (true, true, CloseMethod::CloseButton),
            (false, true, CloseMethod::DismissIcon),
            (false, false, CloseMethod::CancelKey),
        ];
        for (close_button, dismiss_icon, expected) in cases {
            let driver = FakeDriver::new(FakePage {
                modal_open: Some(0),
                modal_has_close_button: close_button,
                modal_has_dismiss_icon: dismiss_icon,
                ..Default::default()
            });
            let mut acc = accumulator();
            let mut ctx = StepContext::new(&driver, &config, &mut acc);

            let result = close_modal(&mut ctx).await;
            assert!(result.succeeded);
            assert_eq!(
                result.data,
                StepData::Close {
                    method: expected,
                    closed: true
                }
            );
            let log = driver.log();
            assert_eq!(log.clicks.len() + log.keys.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_click_entry_observes_modal() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage {
            modal_loading: true,
            ..Default::default()
        });
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = click_entry_and_observe_modal(&mut ctx, 1).await;
        assert!(result.succeeded);
        assert_eq!(
            result.data,
            StepData::Modal {
                index: 1,
                player_name: Some("Bob".to_string()),
                modal_opened: true,
                title: Some("Bob - Statistics".to_string()),
                has_spinner: true,
                has_stats: true,
            }
        );
        assert_eq!(driver.log().clicks[0], (".leaderboard-item".to_string(), 1, true));
        assert_eq!(
            driver.log().screenshots,
            vec![PathBuf::from("shots/01_modal_player_2.png")]
        );
    }

    #[tokio::test]
    async fn test_click_entry_without_modal_is_recorded_failure() {
        let config = fast_config();
        let mut page = FakePage::default();
        page.entries[0].opens_modal = false;
        let driver = FakeDriver::new(page);
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = click_entry_and_observe_modal(&mut ctx, 0).await;
        assert!(!result.succeeded);
        assert!(result
            .detail
            .as_deref()
            .unwrap()
            .starts_with("modal did not open"));
        assert_eq!(result.error_kind.as_deref(), Some("ModalTimeoutError"));
        assert!(driver.log().screenshots.is_empty());
    }

    fn stuck_modal_page() -> FakePage {
        let mut page = FakePage {
            modal_has_close_button: false,
            modal_has_dismiss_icon: false,
            ..Default::default()
        };
        for entry in page.entries.iter_mut().skip(1) {
            entry.opens_modal = false;
        }
        page
    }

    #[tokio::test]
    async fn test_close_modal_fails_when_modal_stays_open() {
        let config = HarnessConfig {
            cancel_key: "Enter".to_string(),
            ..fast_config()
        };
        let driver = FakeDriver::new(FakePage {
            modal_open: Some(0),
            ..stuck_modal_page()
        });
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = close_modal(&mut ctx).await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind.as_deref(), Some("ModalStillOpenError"));
        assert_eq!(
            result.data,
            StepData::Close {
                method: CloseMethod::CancelKey,
                closed: false
            }
        );
        assert_eq!(driver.log().keys, vec!["Enter".to_string()]);
    }

    #[tokio::test]
    async fn test_leftover_modal_is_not_credited_to_next_entry() {
        let config = HarnessConfig {
            cancel_key: "Enter".to_string(),
            ..fast_config()
        };
        let driver = FakeDriver::new(stuck_modal_page());
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        assert!(click_entry_and_observe_modal(&mut ctx, 0).await.succeeded);
        assert!(!close_modal(&mut ctx).await.succeeded);

        for index in 1..3 {
            let result = click_entry_and_observe_modal(&mut ctx, index).await;
            assert!(!result.succeeded);
            assert!(result
                .detail
                .as_deref()
                .unwrap()
                .contains("previous modal still open"));
            assert!(matches!(
                result.data,
                StepData::Modal {
                    modal_opened: false,
                    ..
                }
            ));
        }
        assert!(driver
            .log()
            .clicks
            .iter()
            .all(|(sel, idx, _)| sel != ".leaderboard-item" || *idx == 0));
    }

    #[tokio::test]
    async fn test_rapid_click_records_every_attempt_even_when_all_fail() {
        let config = fast_config();
        let mut page = FakePage::default();
        page.entries[0].click_fails = true;
        let driver = FakeDriver::new(page);
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let results = rapid_click_stress(&mut ctx, 0, 3, Duration::from_millis(100)).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.succeeded));
        let names: Vec<_> = results.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(names, ["rapid_click_1", "rapid_click_2", "rapid_click_3"]);
        assert_eq!(driver.log().clicks.len(), 3);
    }

    #[tokio::test]
    async fn test_rapid_click_closes_modal_between_attempts() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage::default());
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let results = rapid_click_stress(&mut ctx, 0, 3, Duration::from_millis(1)).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.succeeded));
        assert!(driver.page().modal_open.is_none());
    }

    #[tokio::test]
    async fn test_register_user_absent_form_is_noop() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage {
            registration_form: false,
            dashboard_visible: true,
            ..Default::default()
        });
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = register_user(&mut ctx, "Test User").await;
        assert!(result.succeeded);
        assert!(driver.log().filled.is_empty());
        assert!(matches!(
            result.data,
            StepData::Registration {
                form_present: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_register_user_fills_and_submits() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage::default());
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = register_user(&mut ctx, "Test User").await;
        assert!(result.succeeded);
        assert_eq!(
            driver.log().filled,
            vec![("#player-name".to_string(), "Test User".to_string())]
        );
        assert_eq!(acc.screenshots().len(), 1);
    }

    #[tokio::test]
    async fn test_register_user_without_dashboard_fails() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage {
            registration_works: false,
            ..Default::default()
        });
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let result = register_user(&mut ctx, "Test User").await;
        assert!(!result.succeeded);
        assert_eq!(result.error_kind.as_deref(), Some("RegistrationError"));
    }

    #[tokio::test]
    async fn test_navigate_unreachable_is_fatal() {
        let config = fast_config();
        let driver = FakeDriver::new(FakePage {
            reachable: false,
            ..Default::default()
        });
        let mut acc = accumulator();
        let mut ctx = StepContext::new(&driver, &config, &mut acc);

        let err = navigate(&mut ctx, "http://localhost:9").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "NavigationError");
    }

    #[test]
    fn test_preview_and_first_line() {
        assert_eq!(preview("  Alice\n   40 pts ", 50), "Alice 40 pts");
        assert_eq!(preview("abcdef", 3), "abc");
        assert_eq!(first_line("\n  Alice \n40"), Some("Alice".to_string()));
        assert_eq!(first_line("   "), None);
    }
}
