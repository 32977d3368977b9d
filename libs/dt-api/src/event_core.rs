use crate::error::CoreError;
use crate::event::Event;

/// Consumer configuration as handed to [`EventCore::init`].
pub type Config = serde_json::Map<String, serde_json::Value>;

/// The five-operation boundary between the SDK and the event core.
///
/// Every call is a synchronous hand-off. Validation problems with a record
/// are reported as `Ok(false)` from [`EventCore::add_event`]; `Err` is
/// reserved for initialization and transport failures.
pub trait EventCore: Send + Sync {
    /// Build and install the consumer described by `config`.
    fn init(&self, config: Config) -> Result<(), CoreError>;

    /// Normalize, verify and forward one flat record.
    fn add_event(&self, event: Event) -> Result<bool, CoreError>;

    fn flush(&self) -> Result<(), CoreError>;

    /// Flush and release the consumer. Must be the last call.
    fn close(&self) -> Result<(), CoreError>;

    /// Enable or disable the core's diagnostic output.
    fn toggle_logger(&self, enabled: bool);
}
