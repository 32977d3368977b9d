use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use dt_api::{Config, CoreError, Properties};

pub const DEFAULT_NAME_PREFIX: &str = "dt";

// ════════════════════════════════════════════════════════════════
//  Init map (handed to `init`)
// ════════════════════════════════════════════════════════════════

/// Settings of the rotating log-file consumer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConsumerConfig {
    /// Directory for log shards, created if missing.
    pub path: String,
    /// Number of buffered events that triggers a write.
    pub max_batch_len: u32,
    /// Shard file name prefix. Empty or absent means [`DEFAULT_NAME_PREFIX`].
    #[serde(default)]
    pub name_prefix: Option<String>,
    /// Approximate shard size limit in bytes, `0` for unlimited.
    #[serde(default)]
    pub max_file_size_bytes: u64,
}

impl LogConsumerConfig {
    pub fn name_prefix(&self) -> &str {
        match self.name_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix,
            _ => DEFAULT_NAME_PREFIX,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.path.trim().is_empty() {
            return Err(CoreError::config("\"path\" must not be empty"));
        }
        if self.max_batch_len == 0 {
            return Err(CoreError::config("\"max_batch_len\" must be a positive number"));
        }
        Ok(())
    }
}

/// Consumer kind, selected by the `consumer` tag of the init map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "consumer", rename_all = "snake_case")]
pub enum ConsumerConfig {
    Log(LogConsumerConfig),
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            ConsumerConfig::Log(cfg) => cfg.validate(),
        }
    }
}

/// Core-wide options that are not part of any consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreOptions {
    /// Marks every record with `#debug: true` so it stays out of production data.
    pub debug: bool,
}

/// Parsed and validated init map.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub consumer: ConsumerConfig,
    pub options: CoreOptions,
}

impl CoreConfig {
    /// Parse the init map. A missing `consumer` tag means `"log"`.
    pub fn from_map(mut map: Config) -> Result<Self, CoreError> {
        let debug = match map.remove("_debug") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            // Hosts without a bool type pass 0/1.
            Some(Value::Number(n)) => n.as_u64().is_some_and(|n| n != 0),
            Some(other) => {
                return Err(CoreError::config(format!("\"_debug\" should be a bool, got {other}")));
            }
        };

        map.entry("consumer")
            .or_insert_with(|| Value::String("log".to_string()));

        let consumer: ConsumerConfig = serde_json::from_value(Value::Object(map))
            .map_err(|e| CoreError::config(format!("invalid consumer config: {e}")))?;
        consumer.validate()?;

        Ok(Self {
            consumer,
            options: CoreOptions { debug },
        })
    }
}

// ════════════════════════════════════════════════════════════════
//  Config files (TOML built in, other formats via ConfigParser)
// ════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parse: {0}")]
    Parse(String),

    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),
}

/// Root of a configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DtConfig {
    /// Passed to the core as `_debug`.
    #[serde(default)]
    pub debug: bool,

    /// Initial state of the diagnostic switch.
    #[serde(default)]
    pub log_enabled: bool,

    /// Init map for the consumer, see [`CoreConfig::from_map`].
    pub consumer: Config,

    /// Properties attached to every `track` event.
    #[serde(default)]
    pub static_properties: Properties,
}

/// Parser for one configuration file format.
pub trait ConfigParser {
    /// File extensions handled by this parser, without the dot.
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<DtConfig, ConfigError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<DtConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

impl DtConfig {
    /// Load a config file, picking the parser by file extension.
    ///
    /// TOML is always available; `extra` adds other formats.
    pub fn load(path: &Path, extra: &[&dyn ConfigParser]) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let toml = TomlParser;
        let parser = std::iter::once(&toml as &dyn ConfigParser)
            .chain(extra.iter().copied())
            .find(|p| p.extensions().contains(&ext.as_str()))
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        parser.parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        TomlParser.parse(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dt_api::ErrorKind;
    use serde_json::json;

    fn map(v: Value) -> Config {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn parses_log_consumer() {
        let cfg = CoreConfig::from_map(map(json!({
            "consumer": "log",
            "path": "log",
            "max_batch_len": 200,
            "name_prefix": "dt_rs",
            "max_file_size_bytes": 1024,
        })))
        .unwrap();

        let ConsumerConfig::Log(log) = &cfg.consumer;
        assert_eq!(log.path, "log");
        assert_eq!(log.max_batch_len, 200);
        assert_eq!(log.name_prefix(), "dt_rs");
        assert_eq!(log.max_file_size_bytes, 1024);
        assert!(!cfg.options.debug);
    }

    #[test]
    fn defaults_when_optional_keys_missing() {
        let cfg = CoreConfig::from_map(map(json!({
            "path": "log",
            "max_batch_len": 1,
            "name_prefix": null,
            "_debug": 1,
        })))
        .unwrap();

        let ConsumerConfig::Log(log) = &cfg.consumer;
        assert_eq!(log.name_prefix(), DEFAULT_NAME_PREFIX);
        assert_eq!(log.max_file_size_bytes, 0);
        assert!(cfg.options.debug);
    }

    #[test]
    fn rejects_malformed_maps() {
        let cases = [
            json!({ "max_batch_len": 10 }),
            json!({ "path": "", "max_batch_len": 10 }),
            json!({ "path": "log", "max_batch_len": 0 }),
            json!({ "path": "log", "max_batch_len": -5 }),
            json!({ "path": "log", "max_batch_len": 10, "max_file_size_bytes": -1 }),
            json!({ "consumer": "kafka", "path": "log", "max_batch_len": 10 }),
            json!({ "path": "log", "max_batch_len": 10, "_debug": "yes" }),
        ];
        for case in cases {
            let err = CoreConfig::from_map(map(case.clone())).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Config, "{case}");
        }
    }

    #[test]
    fn toml_file_config() {
        let cfg = DtConfig::parse_toml(
            r#"
            debug = true
            log_enabled = true

            [consumer]
            consumer = "log"
            path = "log"
            max_batch_len = 200
            max_file_size_bytes = 10485760

            [static_properties]
            region = "eu"
            shard = 3
            "#,
        )
        .unwrap();

        assert!(cfg.debug);
        assert!(cfg.log_enabled);
        assert_eq!(cfg.consumer["max_batch_len"], json!(200));
        assert_eq!(cfg.static_properties["region"], json!("eu"));

        let core = CoreConfig::from_map(cfg.consumer).unwrap();
        let ConsumerConfig::Log(log) = core.consumer;
        assert_eq!(log.max_file_size_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn load_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dt.toml");
        std::fs::write(&path, "[consumer]\npath = \"log\"\nmax_batch_len = 5\n").unwrap();
        let cfg = DtConfig::load(&path, &[]).unwrap();
        assert_eq!(cfg.consumer["path"], json!("log"));

        let yaml = dir.path().join("dt.yaml");
        std::fs::write(&yaml, "consumer: {}").unwrap();
        assert!(matches!(
            DtConfig::load(&yaml, &[]),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            DtConfig::load(&missing, &[]),
            Err(ConfigError::Read { .. })
        ));
    }
}
