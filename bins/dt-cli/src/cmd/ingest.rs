use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use serde::Deserialize;

use dt_api::Config;
use dt_config_hcl::HclParser;
use dt_core::{DtConfig, DtCore};
use dt_sdk::{DTAnalytics, DTConsumer, Properties, SdkError};

use crate::config::IngestArgs;
use crate::error::CliError;

/// Consumer described by the `[consumer]` table of a config file.
struct FileConsumer {
    config: Config,
}

impl DTConsumer for FileConsumer {
    fn config(&self) -> &Config {
        &self.config
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Op {
    Track,
    UserSet,
    UserSetOnce,
    UserAdd,
    UserUnset,
    UserDelete,
    UserAppend,
    UserUniqAppend,
}

/// One line of the input file.
#[derive(Debug, Deserialize)]
struct Call {
    op: Op,
    dt_id: String,
    #[serde(default)]
    acid: Option<String>,
    #[serde(default)]
    event_name: Option<String>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "accepted: {}, rejected: {}", self.accepted, self.rejected)
    }
}

fn apply(dt: &DTAnalytics, call: Call) -> Result<bool, SdkError> {
    let acid = call.acid.as_deref();
    let props = call.properties;
    match call.op {
        Op::Track => match call.event_name.as_deref() {
            Some(name) => dt.track(&call.dt_id, acid, name, props),
            None => {
                tracing::warn!(dt_id = %call.dt_id, "track call without event_name");
                Ok(false)
            }
        },
        Op::UserSet => dt.user_set(&call.dt_id, acid, props),
        Op::UserSetOnce => dt.user_set_once(&call.dt_id, acid, props),
        Op::UserAdd => dt.user_add(&call.dt_id, acid, props),
        Op::UserUnset => dt.user_unset(&call.dt_id, acid, props),
        Op::UserDelete => dt.user_delete(&call.dt_id, acid, props),
        Op::UserAppend => dt.user_append(&call.dt_id, acid, props),
        Op::UserUniqAppend => dt.user_uniq_append(&call.dt_id, acid, props),
    }
}

pub fn run(args: IngestArgs) -> Result<Summary, CliError> {
    let config = DtConfig::load(&args.config, &[&HclParser])?;
    tracing::info!(config = %args.config.display(), "loaded config");

    let consumer = FileConsumer {
        config: config.consumer,
    };
    let dt = DTAnalytics::builder(&consumer)
        .core(Arc::new(DtCore::new()))
        .debug(config.debug)
        .log_enabled(config.log_enabled || args.log)
        .static_properties(config.static_properties)
        .build()?;

    let input_err = |source| CliError::Input {
        path: args.input.display().to_string(),
        source,
    };
    let reader = BufReader::new(File::open(&args.input).map_err(input_err)?);

    let mut summary = Summary::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(input_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let accepted = match serde_json::from_str::<Call>(&line) {
            Ok(call) => apply(&dt, call)?,
            Err(e) => {
                tracing::warn!(line = idx + 1, error = %e, "skipping malformed call");
                false
            }
        };
        if accepted {
            summary.accepted += 1;
        } else {
            summary.rejected += 1;
        }
    }

    dt.flush()?;
    dt.close()?;
    tracing::info!(accepted = summary.accepted, rejected = summary.rejected, "ingest finished");
    Ok(summary)
}
