//! How a controller learns that a native transition finished.

use core_runtime::config::{CoreConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use std::time::Duration;

/// Poll loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between `is_playing()` checks.
    pub interval: Duration,
    /// Time after which an unconfirmed transition fails.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Completion detection strategy chosen when a synchronous backend is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDetection {
    /// The backend reports every transition through its event sink.
    EventDriven,
    /// The backend reports nothing; poll `is_playing()` until the expected
    /// state shows up or the timeout elapses.
    Polled(PollConfig),
}

impl CompletionDetection {
    pub fn polled(interval: Duration, timeout: Duration) -> Self {
        CompletionDetection::Polled(PollConfig { interval, timeout })
    }

    /// The strategy `config` asks for.
    pub fn from_config(config: &CoreConfig) -> Self {
        if config.event_driven_by_default {
            CompletionDetection::EventDriven
        } else {
            Self::polled(config.poll_interval, config.poll_timeout)
        }
    }

    pub fn poll_config(&self) -> Option<PollConfig> {
        match self {
            CompletionDetection::EventDriven => None,
            CompletionDetection::Polled(config) => Some(*config),
        }
    }
}

impl Default for CompletionDetection {
    fn default() -> Self {
        CompletionDetection::Polled(PollConfig::default())
    }
}
