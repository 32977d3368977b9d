use std::sync::{Arc, Mutex, MutexGuard};

use dt_api::{Consumer, CoreError, Event};

#[derive(Debug, Default)]
struct MemoryState {
    events: Vec<Event>,
    flushes: usize,
    closed: bool,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    match state.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("memory consumer lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Keeps canonical records in memory.
///
/// The consumer itself is moved into the core; the paired [`MemoryHandle`]
/// stays with the caller and observes what was delivered.
#[derive(Debug)]
pub struct MemoryConsumer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConsumer {
    pub fn new() -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryHandle { state },
        )
    }
}

impl Consumer for MemoryConsumer {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn add(&mut self, event: Event) -> Result<(), CoreError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(CoreError::state("memory consumer is closed"));
        }
        state.events.push(event);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CoreError> {
        lock(&self.state).flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CoreError> {
        let mut state = lock(&self.state);
        state.flushes += 1;
        state.closed = true;
        Ok(())
    }
}

/// Read side of a [`MemoryConsumer`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    /// Snapshot of every delivered record, in delivery order.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.state).events.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush_count(&self) -> usize {
        lock(&self.state).flushes
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_sees_delivered_events() {
        let (mut consumer, handle) = MemoryConsumer::new();
        assert!(handle.is_empty());

        consumer.add(Event::new()).unwrap();
        consumer.flush().unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.flush_count(), 1);

        consumer.close().unwrap();
        assert!(handle.is_closed());
        assert!(consumer.add(Event::new()).is_err());
        assert_eq!(handle.events().len(), 1);
    }
}
