use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// How often the token is checked while a session is live.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Recurring timer that runs a check until it reports the session is over.
///
/// At most one timer is active: starting again cancels the previous one.
pub struct ExpiryMonitor {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Run `check` every interval until it returns `true`.
    ///
    /// Must be called from within a Tokio runtime; otherwise the monitor is
    /// not started.
    pub fn start<F>(&self, mut check: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, token monitoring disabled");
                return;
            }
        };

        let period = self.interval;
        let first_tick = Instant::now() + period;
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        *task = Some(runtime.spawn(async move {
            let mut ticker = time::interval_at(first_tick, period);
            loop {
                ticker.tick().await;
                if check() {
                    debug!("Token monitor finished");
                    break;
                }
            }
        }));
        debug!(interval_secs = period.as_secs(), "Token monitor started");
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("Token monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Default for ExpiryMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_INTERVAL)
    }
}

impl Drop for ExpiryMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
