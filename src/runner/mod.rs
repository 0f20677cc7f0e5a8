pub mod events;
pub mod session;
pub mod state;
pub mod steps;

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::HarnessError;
use crate::report::types::{Report, VerdictPolicy};
use crate::utils::config::HarnessConfig;

pub use events::*;
pub use session::Session;
pub use state::*;
pub use steps::{ScenarioStep, StepContext};

/// Build the fixed probe pipeline for a configuration
pub fn build_plan(config: &HarnessConfig) -> Vec<ScenarioStep> {
    let mut plan = vec![ScenarioStep::Navigate {
        url: config.base_url.clone(),
    }];

    for name in &config.player_names {
        plan.push(ScenarioStep::RegisterUser { name: name.clone() });
    }

    plan.push(ScenarioStep::ListLeaderboardEntries);
    plan.push(ScenarioStep::Checkpoint {
        name: "populated_leaderboard".to_string(),
    });

    for index in 0..config.max_click_cycles {
        plan.push(ScenarioStep::ClickCycle { index });
    }

    if config.rapid_click.repetitions > 0 {
        plan.push(ScenarioStep::RapidClickStress {
            index: config.rapid_click.index,
            repetitions: config.rapid_click.repetitions,
            interval: Duration::from_millis(config.rapid_click.interval_ms),
        });
    }

    plan.push(ScenarioStep::Checkpoint {
        name: "final_state".to_string(),
    });
    plan
}

/// Launch a browser, run the pipeline, and tear the browser down.
///
/// Always returns a report; a browser that cannot be launched yields a
/// failing report with a single `session_start` result.
pub async fn run_harness(
    config: &HarnessConfig,
    emitter: &EventEmitter,
    cancel: &AtomicBool,
) -> Report {
    let started = Session::start(config).await;
    run_started(started, config, emitter, cancel).await
}

/// Run the pipeline on the outcome of a session start, then stop the session.
///
/// The session is stopped even if a step panics; the panic is resumed
/// after teardown.
pub async fn run_started(
    started: Result<Session, HarnessError>,
    config: &HarnessConfig,
    emitter: &EventEmitter,
    cancel: &AtomicBool,
) -> Report {
    let mut session = match started {
        Ok(session) => session,
        Err(err) => return session_start_failed(&err, config, emitter),
    };

    let outcome = AssertUnwindSafe(run_session(&mut session, config, emitter, cancel))
        .catch_unwind()
        .await;
    session.stop().await;

    match outcome {
        Ok(report) => report,
        Err(panic) => {
            log::error!("pipeline panicked, browser released");
            std::panic::resume_unwind(panic)
        }
    }
}

fn session_start_failed(
    err: &HarnessError,
    config: &HarnessConfig,
    emitter: &EventEmitter,
) -> Report {
    log::error!("{}", err);
    let session_id = uuid::Uuid::new_v4().to_string();
    emitter.emit(HarnessEvent::RunStarted {
        session_id: session_id.clone(),
        target_url: config.base_url.clone(),
    });

    let policy = VerdictPolicy {
        error_tolerance: config.error_tolerance,
    };
    let mut acc = ResultAccumulator::new(&session_id, &config.base_url, policy);
    let result = ScenarioResult::failure("session_start", StepKind::SessionStart, err, StepData::None);
    emitter.emit(HarnessEvent::StepFinished {
        ordinal: 0,
        result: result.clone(),
        duration_ms: 0,
    });
    acc.record(result);

    let report = acc.finalize();
    emitter.emit(HarnessEvent::RunFinished {
        verdict: report.verdict,
    });
    report
}

/// Run the pipeline against an already started session.
/// Does not stop the session.
pub async fn run_session(
    session: &mut Session,
    config: &HarnessConfig,
    emitter: &EventEmitter,
    cancel: &AtomicBool,
) -> Report {
    let policy = VerdictPolicy {
        error_tolerance: config.error_tolerance,
    };
    let mut acc = ResultAccumulator::new(session.id(), &config.base_url, policy);

    emitter.emit(HarnessEvent::RunStarted {
        session_id: session.id().to_string(),
        target_url: config.base_url.clone(),
    });

    let plan = build_plan(config);
    let mut entry_count = None;

    for (i, step) in plan.iter().enumerate() {
        let ordinal = i + 1;

        if cancel.load(Ordering::SeqCst) {
            emitter.emit(HarnessEvent::Log {
                message: format!("run cancelled before step {}", ordinal),
            });
            log::warn!("run cancelled, {} steps not executed", plan.len() - i);
            break;
        }

        let outcome = {
            let mut ctx = StepContext::new(session.driver(), config, &mut acc);
            ctx.entry_count = entry_count;

            if let Some(reason) = step.skip_reason(&ctx) {
                emitter.emit(HarnessEvent::StepSkipped {
                    ordinal,
                    step: step.label(),
                    reason,
                });
                continue;
            }

            emitter.emit(HarnessEvent::StepStarted {
                ordinal,
                step: step.label(),
            });
            let started = Instant::now();
            let outcome = step.execute(&mut ctx).await;
            entry_count = ctx.entry_count;
            (outcome, started.elapsed().as_millis() as u64)
        };

        let (outcome, duration_ms) = outcome;
        let fatal = match outcome {
            Ok(results) => {
                for result in results {
                    emitter.emit(HarnessEvent::StepFinished {
                        ordinal,
                        result: result.clone(),
                        duration_ms,
                    });
                    acc.record(result);
                }
                false
            }
            Err(err) => {
                log::error!("{}", err);
                let result = ScenarioResult::failure(
                    step_name(step),
                    step.kind(),
                    &err,
                    StepData::None,
                );
                emitter.emit(HarnessEvent::StepFinished {
                    ordinal,
                    result: result.clone(),
                    duration_ms,
                });
                acc.record(result);
                err.is_fatal()
            }
        };

        forward_console(session, &mut acc, emitter);

        if fatal {
            break;
        }
    }

    // Page errors raised by the last actions may still be in flight.
    if config.console_grace_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.console_grace_ms)).await;
    }
    forward_console(session, &mut acc, emitter);

    let report = acc.finalize();
    emitter.emit(HarnessEvent::RunFinished {
        verdict: report.verdict,
    });
    report
}

fn forward_console(session: &mut Session, acc: &mut ResultAccumulator, emitter: &EventEmitter) {
    for event in session.drain_console(acc) {
        emitter.emit(HarnessEvent::Console(event));
    }
}

fn step_name(step: &ScenarioStep) -> &'static str {
    match step {
        ScenarioStep::Navigate { .. } => "navigate",
        ScenarioStep::RegisterUser { .. } => "register_user",
        ScenarioStep::ListLeaderboardEntries => "list_leaderboard_entries",
        ScenarioStep::ClickCycle { .. } => "click_cycle",
        ScenarioStep::RapidClickStress { .. } => "rapid_click",
        ScenarioStep::Checkpoint { .. } => "checkpoint",
    }
}
