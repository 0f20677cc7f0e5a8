pub mod json;
pub mod junit;
pub mod text;
pub mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::utils::config::HarnessConfig;
use types::Report;

/// Both renderings of one report
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// Summary for standard output
    pub text: String,
    /// Structured artifact (pretty JSON)
    pub artifact: String,
}

pub fn render(report: &Report) -> Result<RenderedReport> {
    Ok(RenderedReport {
        text: text::render(report),
        artifact: json::to_json(report)?,
    })
}

/// Persist the configured report artifacts, returning the written paths
pub fn write_artifacts(report: &Report, config: &HarnessConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let json_path = config.report_path();
    json::generate(report, Some(&json_path))?;
    written.push(json_path);

    if config.junit {
        let junit_path = config.junit_path();
        junit::write_report(report, &junit_path)?;
        written.push(junit_path);
    }

    Ok(written)
}

/// Re-render a saved JSON report
pub async fn generate_report(
    results_path: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let report = json::load(results_path)?;

    match format {
        "json" => json::generate(&report, output),
        "junit" => match output {
            Some(path) => junit::write_report(&report, path),
            None => {
                println!("{}", junit::generate_junit_xml(&report)?);
                Ok(())
            }
        },
        "text" => {
            let rendered = text::render(&report);
            match output {
                Some(path) => {
                    std::fs::write(path, rendered)?;
                    Ok(())
                }
                None => {
                    print!("{}", rendered);
                    Ok(())
                }
            }
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
