use std::time::Duration;

use podrunner_core::{
    naming::{InvalidPrefix, UnitNamer},
    poller::PollSettings,
};
use thiserror::Error;

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Namespace cannot be empty")]
    EmptyNamespace,

    #[error("Container name cannot be empty")]
    EmptyContainerName,

    #[error("API key cannot be empty")]
    EmptyApiKey,

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Poll timeout ({timeout:?}) must not be shorter than the poll interval ({interval:?})")]
    InvalidPollTimeout {
        interval: Duration,
        timeout: Duration,
    },

    #[error(transparent)]
    InvalidNamePrefix(#[from] InvalidPrefix),
}

/// Configuration for the gateway
#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    pub container_name: String,
    pub namer: UnitNamer,
    pub poll: PollSettings,
    pub api_key: Option<String>,
}

impl Config {
    /// Create a new config with validation
    pub fn try_new(
        namespace: String,
        container_name: String,
        name_prefix: String,
        poll: PollSettings,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        if namespace.trim().is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }

        if container_name.trim().is_empty() {
            return Err(ConfigError::EmptyContainerName);
        }

        if api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            return Err(ConfigError::EmptyApiKey);
        }

        if poll.interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval);
        }

        if poll.timeout < poll.interval {
            return Err(ConfigError::InvalidPollTimeout {
                interval: poll.interval,
                timeout: poll.timeout,
            });
        }

        let namer = UnitNamer::try_new(name_prefix)?;

        Ok(Self {
            namespace,
            container_name,
            namer,
            poll,
            api_key,
        })
    }
}
