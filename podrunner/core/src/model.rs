use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single workload to run: one container image, its command and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Container image reference, e.g. `alpine:3.20`
    pub image: String,
    /// Entrypoint executed inside the container
    pub command: String,
    /// Arguments passed to `command`, in order
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExecutionRequest {
    pub fn new(image: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            image: image.into(),
            command: command.into(),
            args,
        }
    }

    /// Reject requests the orchestrator could never run
    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(Error::Validation("image must not be empty".to_string()));
        }
        if self.image.chars().any(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "image `{}` must not contain whitespace",
                self.image
            )));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Outcome of a finished execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub output: String,
}

/// Snapshot of an execution unit's single container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// No container status reported yet, or the container is waiting to start
    Pending,
    Running,
    /// The container exited; no further transition occurs
    Terminated { exit_code: i32 },
}
