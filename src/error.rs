use thiserror::Error;

/// Failures a harness run can run into.
///
/// Only session-lifecycle failures ([`HarnessError::SessionStart`] and
/// [`HarnessError::Navigation`]) abort a run. Every other variant is caught
/// at the step boundary and recorded as a failed scenario result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HarnessError {
    #[error("failed to start browser session: {0}")]
    SessionStart(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("registration of '{name}' failed: {reason}")]
    Registration { name: String, reason: String },

    #[error("modal did not open within {timeout_ms}ms (entry {index})")]
    ModalTimeout { index: usize, timeout_ms: u64 },

    #[error("modal still open after {method}")]
    ModalStillOpen { method: String },

    #[error("click on {target} failed: {reason}")]
    Click { target: String, reason: String },

    #[error("query '{selector}' failed: {reason}")]
    Query { selector: String, reason: String },

    #[error("console capture failed: {0}")]
    ConsoleCapture(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    /// Whether this failure ends the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::SessionStart(_) | HarnessError::Navigation { .. }
        )
    }

    /// Short machine-friendly name, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::SessionStart(_) => "SessionStartError",
            HarnessError::Navigation { .. } => "NavigationError",
            HarnessError::Registration { .. } => "RegistrationError",
            HarnessError::ModalTimeout { .. } => "ModalTimeoutError",
            HarnessError::ModalStillOpen { .. } => "ModalStillOpenError",
            HarnessError::Click { .. } => "ClickError",
            HarnessError::Query { .. } => "QueryError",
            HarnessError::ConsoleCapture(_) => "ConsoleCaptureError",
            HarnessError::Config(_) => "ConfigError",
        }
    }

    pub(crate) fn query(selector: &str, err: impl std::fmt::Display) -> Self {
        HarnessError::Query {
            selector: selector.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn click(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        HarnessError::Click {
            target: target.into(),
            reason: err.to_string(),
        }
    }
}
