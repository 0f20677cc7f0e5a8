use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use leaderboard_probe::report;
use leaderboard_probe::runner::{self, ConsoleEventListener, EventEmitter};
use leaderboard_probe::utils::config::{BrowserKind, HarnessConfig};

#[derive(Parser)]
#[command(name = "leaderboard-probe")]
#[command(version = "0.1.0")]
#[command(about = "Probe the Iron Turtle leaderboard and player statistics modal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page to probe (overrides config and PROBE_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Run without a visible browser window
    #[arg(long)]
    headless: bool,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<BrowserKind>,

    /// Per-action timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Console errors tolerated by a passing run
    #[arg(long)]
    error_tolerance: Option<usize>,

    /// Output directory for screenshots and reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a JUnit report
    #[arg(long)]
    junit: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-render a saved report
    Report {
        /// Path to report JSON
        results: PathBuf,

        /// Output format (text, json, junit)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<HarnessConfig> {
        let mut config = HarnessConfig::load(self.config.as_deref())?;
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if let Some(timeout) = self.timeout_ms {
            config.step_timeout_ms = timeout;
        }
        if let Some(tolerance) = self.error_tolerance {
            config.error_tolerance = tolerance;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if self.junit {
            config.junit = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Some(Commands::Report {
        results,
        format,
        output,
    }) = cli.command
    {
        log::info!("rendering {} report from {}", format, results.display());
        report::generate_report(&results, &format, output.as_deref()).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = cli.run.into_config()?;

    println!(
        "{} Probing: {}",
        "▶".green().bold(),
        config.base_url.cyan()
    );
    println!("  Browser: {:?} (headless: {})", config.browser, config.headless);
    println!("  Output: {}", config.output_dir.display().to_string().cyan());
    println!("  Error tolerance: {}", config.error_tolerance);

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        println!("\n{} Stopping after the current step...", "⏹".yellow());
        cancel_handler.store(true, Ordering::SeqCst);
    })?;

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    let report = runner::run_harness(&config, &emitter, &cancel).await;
    drop(emitter);
    let _ = listener.await;

    let rendered = report::render(&report)?;
    print!("{}", rendered.text);

    match report::write_artifacts(&report, &config) {
        Ok(paths) => {
            for path in paths {
                println!("  Report: {}", path.display().to_string().cyan());
            }
        }
        Err(e) => log::error!("failed to write report: {:#}", e),
    }

    Ok(if report.verdict.is_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
