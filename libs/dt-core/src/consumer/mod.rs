//! Event sinks installed by the core.

mod log;
mod memory;

pub use log::{Clock, LogConsumer, shard_file_name};
pub use memory::{MemoryConsumer, MemoryHandle};

use dt_api::{Consumer, CoreError};

use crate::config::ConsumerConfig;

/// Build the consumer described by a parsed init map.
pub fn build(config: &ConsumerConfig) -> Result<Box<dyn Consumer>, CoreError> {
    match config {
        ConsumerConfig::Log(cfg) => Ok(Box::new(LogConsumer::open(cfg)?)),
    }
}
