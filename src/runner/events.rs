use super::state::{ConsoleEvent, ScenarioResult, Severity};
use crate::report::types::Verdict;
use tokio::sync::broadcast;

/// Harness events for real-time updates
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    RunStarted {
        session_id: String,
        target_url: String,
    },
    RunFinished {
        verdict: Verdict,
    },

    StepStarted {
        ordinal: usize,
        step: String,
    },
    StepFinished {
        ordinal: usize,
        result: ScenarioResult,
        duration_ms: u64,
    },
    StepSkipped {
        ordinal: usize,
        step: String,
        reason: String,
    },

    Console(ConsoleEvent),

    Log {
        message: String,
    },
}

/// Event emitter for broadcasting harness events
pub struct EventEmitter {
    sender: broadcast::Sender<HarnessEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<HarnessEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: HarnessEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HarnessEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<HarnessEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let is_tty = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("progress listener lagged, {} events dropped", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                HarnessEvent::RunStarted {
                    session_id,
                    target_url,
                } => {
                    println!(
                        "\n{} Probe session started: {}",
                        "▶".green().bold(),
                        session_id.cyan()
                    );
                    println!("  Target: {}", target_url.cyan());
                }

                HarnessEvent::RunFinished { verdict } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let verdict_str = match verdict {
                        Verdict::Pass => "PASS".green().bold(),
                        Verdict::Fail => "FAIL".red().bold(),
                    };
                    println!("\n{} Probe session finished [{}]", "■".blue().bold(), verdict_str);
                    break;
                }

                HarnessEvent::StepStarted { ordinal, step } => {
                    step_text = format!("[{}] {}... ", ordinal, step.dimmed());

                    let pb = if is_tty {
                        ProgressBar::new_spinner()
                    } else {
                        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
                    };
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner());
                    pb.set_style(style);
                    pb.set_message(step_text.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                HarnessEvent::StepFinished {
                    result,
                    duration_ms,
                    ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    if result.succeeded {
                        println!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                    } else {
                        println!(
                            "    {} {}({}ms) {}",
                            "✗".red(),
                            step_text,
                            duration_ms,
                            result.detail.unwrap_or_default().red()
                        );
                    }
                }

                HarnessEvent::StepSkipped {
                    ordinal,
                    step,
                    reason,
                } => {
                    println!(
                        "    {} [{}] {} ({})",
                        "○".yellow(),
                        ordinal,
                        step.dimmed(),
                        reason.dimmed()
                    );
                }

                HarnessEvent::Console(event) => {
                    let line = format!("      console.{}: {}", event.severity, event.message);
                    let line = match event.severity {
                        Severity::Error => line.red().to_string(),
                        Severity::Warning => line.yellow().to_string(),
                        _ => line.dimmed().to_string(),
                    };
                    match &spinner {
                        Some(pb) => pb.println(line),
                        None => println!("{}", line),
                    }
                }

                HarnessEvent::Log { message } => match &spinner {
                    Some(pb) => pb.println(format!("      {}", message)),
                    None => println!("      {}", message),
                },
            }
        }
    }
}
