use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use dt_api::event::{UserOp, is_composer_key, is_preset, keys};
use dt_api::{Config, EventCore, EventType, Properties};
use dt_core::core_warn;

use crate::consumer::DTConsumer;
use crate::error::SdkError;
use crate::properties::{DynamicProperties, merge_properties};

pub const SDK_TYPE: &str = "dt_server_sdk_rust";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

enum CoreHandle {
    /// The process-wide core of `dt_core`.
    Global,
    Shared(Arc<dyn EventCore>),
}

impl CoreHandle {
    fn get(&self) -> &dyn EventCore {
        match self {
            CoreHandle::Global => dt_core::global(),
            CoreHandle::Shared(core) => core.as_ref(),
        }
    }
}

#[derive(Default)]
struct CommonProperties {
    static_props: Properties,
    dynamic: Option<Arc<dyn DynamicProperties>>,
}

/// Reserved composer key inside `props`, if any.
fn reserved_key(props: &Properties) -> Option<&str> {
    props.keys().map(String::as_str).find(|k| is_composer_key(k))
}

// ════════════════════════════════════════════════════════════════
//  DTAnalytics
// ════════════════════════════════════════════════════════════════

/// Entry point of the SDK.
///
/// Each call composes one flat record and hands it to the event core.
/// Validation problems come back as `Ok(false)`; `Err` means the core is
/// unusable (not initialized, sink failure).
pub struct DTAnalytics {
    core: CoreHandle,
    common: RwLock<CommonProperties>,
}

impl std::fmt::Debug for DTAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let global = matches!(self.core, CoreHandle::Global);
        f.debug_struct("DTAnalytics").field("global_core", &global).finish()
    }
}

impl DTAnalytics {
    /// Initialize the process-wide core with `consumer`.
    ///
    /// With `debug` set, the data is kept out of the production environment.
    pub fn new(consumer: &impl DTConsumer, debug: bool) -> Result<Self, SdkError> {
        Self::builder(consumer).debug(debug).build()
    }

    pub fn builder(consumer: &impl DTConsumer) -> DTAnalyticsBuilder {
        DTAnalyticsBuilder {
            config: consumer.config().clone(),
            debug: false,
            log_enabled: false,
            core: None,
            static_props: Properties::new(),
        }
    }

    /// Wrap a core that is already initialized.
    pub fn attach(core: Arc<dyn EventCore>) -> Self {
        Self {
            core: CoreHandle::Shared(core),
            common: RwLock::new(CommonProperties::default()),
        }
    }

    fn read_common(&self) -> RwLockReadGuard<'_, CommonProperties> {
        match self.common.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("common properties read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_common(&self) -> RwLockWriteGuard<'_, CommonProperties> {
        match self.common.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("common properties write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    // ---- common properties ----

    /// Properties attached to every `track` event. Reserved keys are rejected.
    pub fn set_static_common_properties(&self, props: Properties) -> Result<(), SdkError> {
        if let Some(key) = reserved_key(&props) {
            return Err(SdkError::Config(format!(
                "static common property \"{key}\" is a reserved key"
            )));
        }
        self.write_common().static_props = props;
        Ok(())
    }

    pub fn clear_static_common_properties(&self) {
        self.write_common().static_props.clear();
    }

    pub fn set_dynamic_common_properties(&self, provider: impl DynamicProperties + 'static) {
        self.write_common().dynamic = Some(Arc::new(provider));
    }

    pub fn clear_dynamic_common_properties(&self) {
        self.write_common().dynamic = None;
    }

    // ---- events ----

    /// Track an event. `event_name` is a custom name or a `#`-prefixed preset.
    pub fn track(
        &self,
        dt_id: &str,
        acid: Option<&str>,
        event_name: &str,
        properties: Properties,
    ) -> Result<bool, SdkError> {
        let (static_props, dynamic) = {
            let common = self.read_common();
            (common.static_props.clone(), common.dynamic.clone())
        };
        let dynamic = dynamic.map(|p| p.properties()).unwrap_or_default();
        let properties = merge_properties(properties, &static_props, dynamic);
        self.add(dt_id, acid, event_name, EventType::Track, properties)
    }

    /// Set user properties, overriding existing values.
    pub fn user_set(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.user(UserOp::Set, dt_id, acid, properties)
    }

    /// Set user properties that are not set yet.
    pub fn user_set_once(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.user(UserOp::SetOnce, dt_id, acid, properties)
    }

    /// Add to numeric user properties. Custom values must be numbers.
    pub fn user_add(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.user(UserOp::Add, dt_id, acid, properties)
    }

    /// Unset user properties. Only the custom keys matter; their values are
    /// replaced with `0`. Preset keys keep their values.
    pub fn user_unset(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        let zeroed: Properties = properties
            .into_iter()
            .map(|(k, v)| if is_preset(&k) { (k, v) } else { (k, Value::from(0)) })
            .collect();
        self.user(UserOp::Unset, dt_id, acid, zeroed)
    }

    /// Delete the user. Only preset properties are meaningful.
    pub fn user_delete(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.user(UserOp::Delete, dt_id, acid, properties)
    }

    /// Append to list user properties. Custom values must be arrays.
    pub fn user_append(&self, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.user(UserOp::Append, dt_id, acid, properties)
    }

    /// Like [`Self::user_append`] but skips values already present.
    pub fn user_uniq_append(
        &self,
        dt_id: &str,
        acid: Option<&str>,
        properties: Properties,
    ) -> Result<bool, SdkError> {
        self.user(UserOp::UniqAppend, dt_id, acid, properties)
    }

    fn user(&self, op: UserOp, dt_id: &str, acid: Option<&str>, properties: Properties) -> Result<bool, SdkError> {
        self.add(dt_id, acid, op.event_name(), EventType::User, properties)
    }

    fn add(
        &self,
        dt_id: &str,
        acid: Option<&str>,
        event_name: &str,
        event_type: EventType,
        properties: Properties,
    ) -> Result<bool, SdkError> {
        if let Some(key) = reserved_key(&properties) {
            core_warn!(event = event_name, key, "property collides with a reserved key");
            return Ok(false);
        }

        let mut event = properties;
        event.insert(keys::DT_ID.into(), Value::from(dt_id));
        if let Some(acid) = acid {
            event.insert(keys::ACID.into(), Value::from(acid));
        }
        event.insert(keys::EVENT_NAME.into(), Value::from(event_name));
        event.insert(keys::EVENT_TYPE.into(), Value::from(event_type.as_str()));
        event.insert(keys::SDK_TYPE.into(), Value::from(SDK_TYPE));
        event.insert(keys::SDK_VERSION_NAME.into(), Value::from(SDK_VERSION));

        Ok(self.core.get().add_event(event)?)
    }

    // ---- lifecycle ----

    /// Write buffered events now.
    pub fn flush(&self) -> Result<(), SdkError> {
        Ok(self.core.get().flush()?)
    }

    /// Flush and release the sink. Call before the process exits, or
    /// buffered events may be lost.
    pub fn close(&self) -> Result<(), SdkError> {
        Ok(self.core.get().close()?)
    }

    /// Switch core diagnostics for the whole process.
    pub fn toggle_logger(&self, enabled: bool) {
        self.core.get().toggle_logger(enabled);
    }

    pub fn enable_log(&self) {
        self.toggle_logger(true);
    }

    pub fn disable_log(&self) {
        self.toggle_logger(false);
    }
}

// ════════════════════════════════════════════════════════════════
//  Builder
// ════════════════════════════════════════════════════════════════

pub struct DTAnalyticsBuilder {
    config: Config,
    debug: bool,
    log_enabled: bool,
    core: Option<Arc<dyn EventCore>>,
    static_props: Properties,
}

impl DTAnalyticsBuilder {
    /// Mark every event as debug data.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Turn the core's diagnostics on before it is initialized.
    ///
    /// The switch is process-wide: it also applies to every other core in
    /// the process, including one passed through [`core`](Self::core).
    pub fn log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// Use `core` instead of the process-wide one.
    pub fn core(mut self, core: Arc<dyn EventCore>) -> Self {
        self.core = Some(core);
        self
    }

    pub fn static_properties(mut self, props: Properties) -> Self {
        self.static_props = props;
        self
    }

    pub fn build(self) -> Result<DTAnalytics, SdkError> {
        let analytics = DTAnalytics {
            core: match self.core {
                Some(core) => CoreHandle::Shared(core),
                None => CoreHandle::Global,
            },
            common: RwLock::new(CommonProperties::default()),
        };
        analytics.set_static_common_properties(self.static_props)?;

        let mut config = self.config;
        config.insert("_debug".into(), Value::Bool(self.debug));

        let core = analytics.core.get();
        if self.log_enabled {
            core.toggle_logger(true);
        }
        core.init(config)?;
        Ok(analytics)
    }
}
