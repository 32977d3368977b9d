//! Event core: turns flat records into canonical ones, verifies them and
//! hands them to the installed consumer.
//!
//! A process normally uses the shared core through the free functions
//! ([`init`], [`add_event`], [`flush`], [`close`], [`toggle_logger`]).
//! [`DtCore::new`] builds an isolated core.

pub mod logger;

pub mod config;
pub mod consumer;
pub mod processing;
pub mod registry;
pub mod verification;

pub use config::{ConfigError, ConfigParser, CoreConfig, CoreOptions, DtConfig};
pub use processing::CORE_VERSION;
pub use registry::{DtCore, add_event, close, flush, global, init, toggle_logger};
