use serde_json::Value;

use dt_api::Config;

use crate::error::SdkError;

/// Anything that can describe a sink to the event core.
pub trait DTConsumer {
    /// Init map handed to the core. Immutable once built.
    fn config(&self) -> &Config;
}

/// Rotating log-file sink.
///
/// Events are buffered by the core and written every `max_batch_len`
/// events into `{path}/{name_prefix}-{hour}_{revision}.log`. A shard is
/// closed every hour or when it would grow past `max_file_size_bytes`
/// (`0` for unlimited).
#[derive(Debug, Clone)]
pub struct DTLogConsumer {
    config: Config,
}

impl DTLogConsumer {
    pub fn new(
        path: impl Into<String>,
        max_batch_len: u32,
        name_prefix: impl Into<String>,
        max_file_size_bytes: u64,
    ) -> Result<Self, SdkError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SdkError::Config("path must not be empty".into()));
        }
        if max_batch_len == 0 {
            return Err(SdkError::Config("max_batch_len must be positive".into()));
        }

        let mut config = Config::new();
        config.insert("consumer".into(), Value::from("log"));
        config.insert("path".into(), Value::from(path));
        config.insert("max_batch_len".into(), Value::from(max_batch_len));
        config.insert("name_prefix".into(), Value::from(name_prefix.into()));
        config.insert("max_file_size_bytes".into(), Value::from(max_file_size_bytes));
        Ok(Self { config })
    }
}

impl DTConsumer for DTLogConsumer {
    fn config(&self) -> &Config {
        &self.config
    }
}
