//! Process-wide switch for the core's diagnostic output.
//!
//! Debug, info and warn diagnostics go through the gated macros below and are
//! dropped while the switch is off. Errors always go straight to
//! `tracing::error!`. The switch never touches event content.

use std::sync::atomic::{AtomicBool, Ordering};

static LOG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn set_enabled(enabled: bool) {
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    LOG_ENABLED.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! core_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_enabled() {
            ::tracing::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! core_info {
    ($($arg:tt)*) => {
        if $crate::logger::is_enabled() {
            ::tracing::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! core_warn {
    ($($arg:tt)*) => {
        if $crate::logger::is_enabled() {
            ::tracing::warn!($($arg)*);
        }
    };
}
