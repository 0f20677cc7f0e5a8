use tokio::sync::mpsc;

use crate::driver::traits::BrowserDriver;
use crate::driver::web::{WebDriver, WebDriverConfig};
use crate::error::HarnessError;
use crate::runner::state::{ConsoleEvent, ResultAccumulator};
use crate::utils::config::HarnessConfig;

/// One browser + one page, owned for the duration of a run.
///
/// Console capture is wired up before the session is handed out, so a
/// caller never sees a half-initialised session. `stop` tears the browser
/// down at most once. Dropping does not close the browser; callers must
/// reach `stop` on every path (see [`crate::runner::run_started`]).
pub struct Session {
    id: String,
    driver: Box<dyn BrowserDriver>,
    console_rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    stopped: bool,
}

impl Session {
    /// Launch the configured browser and attach to it
    pub async fn start(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let driver = WebDriver::launch(WebDriverConfig::from(config))
            .await
            .map_err(|e| HarnessError::SessionStart(format!("{:#}", e)))?;
        Ok(Self::attach(Box::new(driver)).await)
    }

    /// Wrap an already launched driver and begin console capture
    pub async fn attach(driver: Box<dyn BrowserDriver>) -> Self {
        let (tx, console_rx) = mpsc::unbounded_channel();

        if let Err(e) = driver.subscribe_console(tx.clone()).await {
            let err = HarnessError::ConsoleCapture(format!("{:#}", e));
            log::warn!("{}", err);
            let _ = tx.send(ConsoleEvent::capture_failure(&err));
        }

        let id = uuid::Uuid::new_v4().to_string();
        log::debug!("session {} attached to {}", id, driver.name());

        Self {
            id,
            driver,
            console_rx,
            stopped: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Move every console event received so far into the accumulator.
    /// Never waits for new events.
    pub fn drain_console(&mut self, acc: &mut ResultAccumulator) -> Vec<ConsoleEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.console_rx.try_recv() {
            acc.record_console_event(event.clone());
            drained.push(event);
        }
        drained
    }

    /// Release the browser. Returns `false` if the session was already stopped.
    pub async fn stop(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.stopped = true;

        if let Err(e) = self.driver.close().await {
            log::warn!("browser close failed for session {}: {:#}", self.id, e);
        }
        self.console_rx.close();
        log::debug!("session {} stopped", self.id);
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.stopped {
            log::warn!(
                "session {} dropped without stop, browser may still be running",
                self.id
            );
        }
    }
}
