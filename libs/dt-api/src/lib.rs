//! Contract shared by the analytics SDK and the event core.
//!
//! The SDK only ever talks to an [`event_core::EventCore`]; the core only ever
//! talks to a [`consumer::Consumer`]. Neither side knows the other's
//! concrete types.

pub mod consumer;
pub mod event_core;
pub mod error;
pub mod event;

pub use consumer::Consumer;
pub use event_core::{Config, EventCore};
pub use error::{CoreError, ErrorKind};
pub use event::{Event, EventType, Properties};
