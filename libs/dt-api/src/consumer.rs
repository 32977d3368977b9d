use crate::error::CoreError;
use crate::event::Event;

/// Sink for canonical event records.
///
/// The core doesn't know concrete implementations; it installs one consumer
/// at init time and drives it through this trait. A consumer is owned by a
/// single core slot, so methods take `&mut self`.
pub trait Consumer: Send {
    /// Short name used in diagnostics, e.g. `"log"`.
    fn kind(&self) -> &'static str;

    /// Accept one canonical record. May buffer.
    fn add(&mut self, event: Event) -> Result<(), CoreError>;

    /// Persist everything buffered so far. Blocking.
    fn flush(&mut self) -> Result<(), CoreError>;

    /// Flush and release resources. The consumer is not used afterwards.
    fn close(&mut self) -> Result<(), CoreError>;
}
