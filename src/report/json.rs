use anyhow::{Context, Result};
use std::path::Path;

use super::types::Report;

/// Serialize a report as pretty JSON
pub fn to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a JSON report to `output`, or print it when no path is given
pub fn generate(report: &Report, output: Option<&Path>) -> Result<()> {
    let json = to_json(report)?;

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Read a JSON report written by a previous run
pub fn load(path: &Path) -> Result<Report> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid report: {}", path.display()))
}
