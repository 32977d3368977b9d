use serde_json::Value;

use dt_api::event::{is_meta_key, keys};
use dt_api::{CoreError, Event, Properties};

use crate::config::CoreOptions;

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turn a flat record into the canonical shape.
///
/// Meta keys stay at the top level, everything else moves under
/// `properties`. An existing `properties` object seeds the nested map and
/// flat keys win on collision. Missing `#event_time` and `#event_syn` are
/// generated here.
pub fn normalize(flat: Event, options: &CoreOptions) -> Result<Event, CoreError> {
    let mut event = Event::new();
    let mut properties = Properties::new();

    for (key, value) in flat {
        if key == keys::PROPERTIES {
            match value {
                Value::Object(nested) => {
                    for (k, v) in nested {
                        properties.entry(k).or_insert(v);
                    }
                }
                other => {
                    return Err(CoreError::verify(format!(
                        "properties should be an object, got {other}"
                    )));
                }
            }
        } else if is_meta_key(&key) {
            event.insert(key, value);
        } else {
            properties.insert(key, value);
        }
    }

    event
        .entry(keys::EVENT_TIME)
        .or_insert_with(|| Value::from(chrono::Utc::now().timestamp_millis()));
    event
        .entry(keys::EVENT_SYN)
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()));
    if options.debug {
        event.insert(keys::DEBUG.to_string(), Value::Bool(true));
    }

    inject_core_version(&mut properties);
    event.insert(keys::PROPERTIES.to_string(), Value::Object(properties));
    Ok(event)
}

/// `#sdk_version_name` becomes `"{sdk}_{core}"`, or `"_{core}"` when absent.
fn inject_core_version(properties: &mut Properties) {
    let sdk_version = match properties.remove(keys::SDK_VERSION_NAME) {
        Some(Value::String(v)) => v,
        _ => String::new(),
    };
    properties.insert(
        keys::SDK_VERSION_NAME.to_string(),
        Value::String(format!("{sdk_version}_{CORE_VERSION}")),
    );
}
