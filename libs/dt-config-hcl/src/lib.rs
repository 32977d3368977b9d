use dt_core::config::{ConfigError, ConfigParser, DtConfig};

pub struct HclParser;

impl ConfigParser for HclParser {
    fn extensions(&self) -> &[&str] {
        &["hcl"]
    }

    fn parse(&self, content: &str) -> Result<DtConfig, ConfigError> {
        hcl::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_hcl_config() {
        let cfg = HclParser
            .parse(
                r#"
                debug       = true
                log_enabled = false

                consumer {
                  consumer            = "log"
                  path                = "log"
                  max_batch_len       = 200
                  name_prefix         = "dt"
                  max_file_size_bytes = 0
                }

                static_properties {
                  region = "eu"
                }
                "#,
            )
            .unwrap();

        assert!(cfg.debug);
        assert!(!cfg.log_enabled);
        assert_eq!(cfg.consumer["max_batch_len"], json!(200));
        assert_eq!(cfg.static_properties["region"], json!("eu"));
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dt.hcl");
        std::fs::write(&path, "consumer {\n  path = \"log\"\n  max_batch_len = 1\n}\n").unwrap();

        assert!(matches!(
            DtConfig::load(&path, &[]),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        let cfg = DtConfig::load(&path, &[&HclParser]).unwrap();
        assert_eq!(cfg.consumer["path"], json!("log"));
    }
}
