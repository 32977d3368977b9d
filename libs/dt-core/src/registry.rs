use std::sync::{LazyLock, Mutex, MutexGuard};

use dt_api::event::keys;
use dt_api::{Config, Consumer, CoreError, Event, EventCore};

use crate::config::{CoreConfig, CoreOptions};
use crate::{consumer, core_info, core_warn, logger, processing, verification};

struct Slot {
    consumer: Box<dyn Consumer>,
    options: CoreOptions,
}

/// Event core: owns at most one consumer and feeds it verified records.
///
/// Calls from several threads are serialized on the consumer slot.
pub struct DtCore {
    slot: Mutex<Option<Slot>>,
}

impl Default for DtCore {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for DtCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DtCore")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl DtCore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Slot>> {
        match self.slot.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("event core lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Install a caller-built consumer.
    pub fn init_with(&self, consumer: Box<dyn Consumer>, options: CoreOptions) -> Result<(), CoreError> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(CoreError::state("core is already initialized"));
        }
        core_info!(consumer = consumer.kind(), debug = options.debug, "event core initialized");
        *slot = Some(Slot { consumer, options });
        Ok(())
    }
}

fn not_initialized() -> CoreError {
    CoreError::state("core is not initialized")
}

impl EventCore for DtCore {
    fn init(&self, config: Config) -> Result<(), CoreError> {
        let config = CoreConfig::from_map(config)?;
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(CoreError::state("core is already initialized"));
        }
        let consumer = consumer::build(&config.consumer)?;
        core_info!(
            consumer = consumer.kind(),
            debug = config.options.debug,
            "event core initialized"
        );
        *slot = Some(Slot {
            consumer,
            options: config.options,
        });
        Ok(())
    }

    fn add_event(&self, event: Event) -> Result<bool, CoreError> {
        let mut guard = self.lock();
        let slot = guard.as_mut().ok_or_else(not_initialized)?;

        let name = event
            .get(keys::EVENT_NAME)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let verified = processing::normalize(event, &slot.options)
            .and_then(|e| verification::verify_event(&e).map(|_| e));
        let canonical = match verified {
            Ok(e) => e,
            Err(e) if e.is_verify() => {
                core_warn!(event = %name, reason = %e.message, "event rejected");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        slot.consumer
            .add(canonical)
            .map_err(|e| e.with_context(slot.consumer.kind()))?;
        Ok(true)
    }

    fn flush(&self) -> Result<(), CoreError> {
        let mut guard = self.lock();
        let slot = guard.as_mut().ok_or_else(not_initialized)?;
        slot.consumer
            .flush()
            .map_err(|e| e.with_context(slot.consumer.kind()))
    }

    fn close(&self) -> Result<(), CoreError> {
        let mut slot = self.lock().take().ok_or_else(not_initialized)?;
        let result = slot.consumer.close();
        if let Err(e) = &result {
            tracing::error!(consumer = slot.consumer.kind(), error = %e, "failed to close consumer");
        }
        core_info!(consumer = slot.consumer.kind(), "event core closed");
        result
    }

    fn toggle_logger(&self, enabled: bool) {
        logger::set_enabled(enabled);
    }
}

// ════════════════════════════════════════════════════════════════
//  Process-wide core
// ════════════════════════════════════════════════════════════════

static GLOBAL: LazyLock<DtCore> = LazyLock::new(DtCore::new);

/// The process-wide core used by the free functions below.
pub fn global() -> &'static DtCore {
    &GLOBAL
}

pub fn init(config: Config) -> Result<(), CoreError> {
    GLOBAL.init(config)
}

pub fn add_event(event: Event) -> Result<bool, CoreError> {
    GLOBAL.add_event(event)
}

pub fn flush() -> Result<(), CoreError> {
    GLOBAL.flush()
}

pub fn close() -> Result<(), CoreError> {
    GLOBAL.close()
}

pub fn toggle_logger(enabled: bool) {
    GLOBAL.toggle_logger(enabled)
}
