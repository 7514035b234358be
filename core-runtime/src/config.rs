//! # Core Configuration Module
//!
//! Provides configuration management for the media core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the tuning knobs of the playback layer and the optional
//! platform bridges it talks to. Validation is fail-fast: `build()` refuses
//! inconsistent timing settings instead of letting a poll loop misbehave at
//! runtime.
//!
//! ## Settings
//!
//! - `poll_interval` - How often a wrapped synchronous backend is polled
//!   while a transition is pending (default 50 ms)
//! - `poll_timeout` - How long a transition may stay unconfirmed before the
//!   request fails with a timeout (default 10 s)
//! - `default_audio_buffer_capacity` - Capacity, in samples, of audio buffers
//!   created without an explicit size (default 256)
//! - `event_driven_by_default` - Whether wrapped backends are trusted to
//!   report transitions through events instead of being polled
//! - `remote_control_service` - Platform remote-control bridge (optional)
//! - `logging` - Logging configuration
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .poll_interval(Duration::from_millis(20))
//!     .poll_timeout(Duration::from_secs(5))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.poll_interval, Duration::from_millis(20));
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! // A timeout shorter than one poll interval can never be observed.
//! let config = CoreConfig::builder()
//!     .poll_interval(Duration::from_secs(1))
//!     .poll_timeout(Duration::from_millis(10))
//!     .build()
//!     .expect("Should fail - timeout shorter than interval");
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::RemoteControlService;
use std::sync::Arc;
use std::time::Duration;

/// Default poll interval for synchronous backends.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default time a transition may stay unconfirmed.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound accepted for `poll_timeout`.
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default audio buffer capacity in samples.
pub const DEFAULT_AUDIO_BUFFER_CAPACITY: usize = 256;

/// Core configuration for the media core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Interval between `is_playing()` checks while a transition is pending
    pub poll_interval: Duration,

    /// Maximum time a transition may stay unconfirmed
    pub poll_timeout: Duration,

    /// Capacity for audio buffers created without an explicit size
    pub default_audio_buffer_capacity: usize,

    /// Trust wrapped backends to report completion through events
    pub event_driven_by_default: bool,

    /// Remote control bridge (optional)
    pub remote_control_service: Option<Arc<dyn RemoteControlService>>,

    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("poll_interval", &self.poll_interval)
            .field("poll_timeout", &self.poll_timeout)
            .field(
                "default_audio_buffer_capacity",
                &self.default_audio_buffer_capacity,
            )
            .field("event_driven_by_default", &self.event_driven_by_default)
            .field(
                "remote_control_service",
                &self.remote_control_service.as_ref().map(|_| "<service>"),
            )
            .field("logging", &self.logging)
            .finish()
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            default_audio_buffer_capacity: DEFAULT_AUDIO_BUFFER_CAPACITY,
            event_driven_by_default: false,
            remote_control_service: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Poll interval is non-zero
    /// - Poll timeout covers at least one interval and at most ten minutes
    /// - Default audio buffer capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }

        if self.poll_timeout < self.poll_interval {
            return Err(Error::Config(format!(
                "Poll timeout ({:?}) must be at least one poll interval ({:?})",
                self.poll_timeout, self.poll_interval
            )));
        }

        if self.poll_timeout > MAX_POLL_TIMEOUT {
            return Err(Error::Config(format!(
                "Poll timeout exceeds maximum of {:?}",
                MAX_POLL_TIMEOUT
            )));
        }

        if self.default_audio_buffer_capacity == 0 {
            return Err(Error::Config(
                "Default audio buffer capacity must be greater than 0 samples".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Unset options fall back to the documented defaults; [`build()`] validates
/// the result.
///
/// [`build()`]: CoreConfigBuilder::build
#[derive(Default)]
pub struct CoreConfigBuilder {
    poll_interval: Option<Duration>,
    poll_timeout: Option<Duration>,
    default_audio_buffer_capacity: Option<usize>,
    event_driven_by_default: Option<bool>,
    remote_control_service: Option<Arc<dyn RemoteControlService>>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the poll interval.
    ///
    /// Default: 50 ms
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the poll timeout.
    ///
    /// Default: 10 s
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Sets the capacity, in samples, of audio buffers created by name only.
    ///
    /// Default: 256
    pub fn default_audio_buffer_capacity(mut self, capacity: usize) -> Self {
        self.default_audio_buffer_capacity = Some(capacity);
        self
    }

    /// Trust wrapped backends to report transitions through events.
    ///
    /// Default: false
    pub fn event_driven_by_default(mut self, enabled: bool) -> Self {
        self.event_driven_by_default = Some(enabled);
        self
    }

    /// Sets the remote control service implementation (optional).
    pub fn remote_control_service(mut self, service: Arc<dyn RemoteControlService>) -> Self {
        self.remote_control_service = Some(service);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the timing or capacity settings are
    /// inconsistent.
    pub fn build(self) -> Result<CoreConfig> {
        let config = CoreConfig {
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            poll_timeout: self.poll_timeout.unwrap_or(DEFAULT_POLL_TIMEOUT),
            default_audio_buffer_capacity: self
                .default_audio_buffer_capacity
                .unwrap_or(DEFAULT_AUDIO_BUFFER_CAPACITY),
            event_driven_by_default: self.event_driven_by_default.unwrap_or(false),
            remote_control_service: self.remote_control_service,
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
