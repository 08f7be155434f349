use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{client::UnitClient, Error, Operation, Result, UnitStatus};

/// Cadence and budget of the completion poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between two inspections
    pub interval: Duration,
    /// Maximum time to wait for the unit to terminate
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Poll the unit until its container terminates and return the exit code.
///
/// The first inspection happens immediately, then once every `interval`. Polling stops:
/// - with the exit code on the first `Terminated` observation
/// - with the inspection error if the unit is gone or the call fails
/// - with [`Error::DeadlineExceeded`] once `timeout` has elapsed, without polling past it
/// - with [`Error::Cancelled`] as soon as `cancel` fires, interrupting any pending sleep
///   or in-flight inspection
#[instrument(skip(client, settings, cancel), fields(interval = ?settings.interval, timeout = ?settings.timeout))]
pub async fn await_termination<C>(
    client: &C,
    name: &str,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> Result<i32>
where
    C: UnitClient + ?Sized,
{
    let deadline = Instant::now() + settings.timeout;
    let mut last_status = None;
    let mut attempts = 0usize;

    loop {
        attempts += 1;

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(name, attempts)),
            inspected = time::timeout_at(deadline, client.inspect(name)) => match inspected {
                Ok(status) => status?,
                Err(_) => return Err(deadline_exceeded(name, settings, attempts)),
            },
        };

        if last_status != Some(status) {
            debug!(unit = name, ?status, attempts, "Execution unit status changed");
            last_status = Some(status);
        }

        if let UnitStatus::Terminated { exit_code } = status {
            debug!(unit = name, exit_code, attempts, "Execution unit terminated");
            return Ok(exit_code);
        }

        let wake_at = (Instant::now() + settings.interval).min(deadline);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(name, attempts)),
            _ = time::sleep_until(wake_at) => {}
        }

        if Instant::now() >= deadline {
            return Err(deadline_exceeded(name, settings, attempts));
        }
    }
}

fn cancelled(name: &str, attempts: usize) -> Error {
    debug!(unit = name, attempts, "Polling cancelled");
    Error::Cancelled {
        name: name.to_string(),
    }
}

fn deadline_exceeded(name: &str, settings: &PollSettings, attempts: usize) -> Error {
    warn!(unit = name, attempts, "Execution unit did not terminate in time");
    Error::DeadlineExceeded {
        name: name.to_string(),
        timeout: settings.timeout,
    }
}
