//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the media core:
//! - Configuration management (`CoreConfig` and its builder)
//! - Logging and tracing infrastructure
//!
//! ## Overview
//!
//! Hosts build one [`CoreConfig`] at startup, initialise logging from it and
//! hand it to the media registry. Everything timing-related in the core
//! (poll cadence, poll timeouts) and the native remote-control service come
//! from here.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
