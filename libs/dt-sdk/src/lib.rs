//! Server-side analytics SDK.
//!
//! ```no_run
//! use dt_sdk::{DTAnalytics, DTLogConsumer, Properties};
//!
//! # fn main() -> Result<(), dt_sdk::SdkError> {
//! let consumer = DTLogConsumer::new("log", 200, "dt", 10 * 1024 * 1024)?;
//! let dt = DTAnalytics::new(&consumer, false)?;
//!
//! let mut props = Properties::new();
//! props.insert("level".into(), 3.into());
//! dt.track("device-id", Some("account-id"), "level_up", props)?;
//!
//! dt.close()?;
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod consumer;
pub mod error;
pub mod properties;

pub use analytics::{DTAnalytics, DTAnalyticsBuilder, SDK_TYPE, SDK_VERSION};
pub use consumer::{DTConsumer, DTLogConsumer};
pub use dt_api::Properties;
pub use error::SdkError;
pub use properties::{DynamicProperties, merge_properties};
