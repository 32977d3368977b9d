//! Verification of canonical records before they reach a consumer.
//!
//! Checks the meta keys, the name rules and, for `#`-prefixed properties,
//! the preset tables below. Custom properties are unrestricted except for
//! the per-operation value rules of `#user_add` and the append operations.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use dt_api::event::{UserOp, is_preset, keys};
use dt_api::{CoreError, Event, EventType, Properties};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z#][a-zA-Z\d_]{0,63}$").expect("name regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeConstraint {
    String,
    /// Integer or float.
    Number,
    Integer,
    Float,
    Bool,
    Object,
    Array,
}

impl TypeConstraint {
    pub fn accepts(self, value: &Value) -> bool {
        match value {
            Value::String(_) => self == Self::String,
            Value::Bool(_) => self == Self::Bool,
            Value::Object(_) => self == Self::Object,
            Value::Array(_) => self == Self::Array,
            Value::Number(n) => match self {
                Self::Number => true,
                Self::Integer => n.is_i64() || n.is_u64(),
                Self::Float => n.is_f64(),
                _ => false,
            },
            Value::Null => false,
        }
    }
}

type Table = &'static [(&'static str, TypeConstraint)];

use TypeConstraint as T;

// ---- meta ----

const META: Table = &[
    (keys::APP_ID, T::String),
    (keys::BUNDLE_ID, T::String),
    (keys::ANDROID_ID, T::String),
    (keys::GAID, T::String),
    (keys::DT_ID, T::String),
    (keys::ACID, T::String),
    (keys::EVENT_NAME, T::String),
    (keys::EVENT_TYPE, T::String),
    (keys::EVENT_TIME, T::Integer),
    (keys::EVENT_SYN, T::String),
    (keys::PROPERTIES, T::Object),
    (keys::DEBUG, T::Bool),
];

const COMPULSORY_META: [&str; 6] = [
    keys::DT_ID,
    keys::EVENT_TIME,
    keys::EVENT_NAME,
    keys::EVENT_TYPE,
    keys::EVENT_SYN,
    keys::PROPERTIES,
];

// ---- preset property tables ----

const SDK_COMMON: Table = &[
    (keys::SDK_TYPE, T::String),
    (keys::SDK_VERSION_NAME, T::String),
];

const EVENT_COMMON: Table = &[
    ("#zone_offset", T::Number),
    ("#session_id", T::String),
    ("#device_manufacturer", T::String),
    ("#is_foreground", T::Bool),
    ("#mcc", T::String),
    ("#mnc", T::String),
    ("#os_country_code", T::String),
    ("#os_lang_code", T::String),
    ("#app_version_code", T::Integer),
    ("#app_version_name", T::String),
    ("#os", T::String),
    ("#os_version_name", T::String),
    ("#os_version_code", T::Number),
    ("#device_brand", T::String),
    ("#device_model", T::String),
    ("#screen_height", T::Number),
    ("#screen_width", T::Number),
    ("#memory_used", T::String),
    ("#storage_used", T::String),
    ("#network_type", T::String),
    ("#simulator", T::Bool),
    ("#fps", T::Number),
    ("#scene", T::String),
    ("#mp_platform", T::String),
    ("#build_device", T::String),
    ("#duration", T::String),
    ("#firebase_iid", T::String),
    ("#appsflyer_id", T::String),
    ("#adjust_id", T::String),
    ("#kochava_id", T::String),
];

const USER_COMMON: Table = &[
    ("#active_device_model", T::String),
    ("#active_network_type", T::String),
    ("#active_os_version_name", T::String),
    ("#active_os", T::String),
    ("#active_os_lang_code", T::String),
    ("#firebase_iid", T::String),
    ("#active_bundle_id", T::String),
    ("#active_device_manufacturer", T::String),
    ("#active_screen_width", T::Number),
    ("#active_mcc", T::String),
    ("#active_os_country_code", T::String),
    ("#active_mnc", T::String),
    ("#active_storage_used", T::String),
    ("#active_user_agent", T::String),
    ("#active_app_version_code", T::Number),
    ("#active_sdk_type", T::String),
    ("#active_device_brand", T::String),
    ("#active_memory_used", T::String),
    ("#active_sdk_version_name", T::String),
    ("#active_screen_height", T::Number),
    ("#active_app_version_name", T::String),
    ("#active_simulator", T::Bool),
];

const AD: Table = &[
    ("#ad_seq", T::String),
    ("#ad_id", T::String),
    ("#ad_type_code", T::Integer),
    ("#ad_platform_code", T::Integer),
    ("#ad_mediation_code", T::Integer),
    ("#ad_mediation_id", T::String),
];

const AD_PLACEMENT: Table = &[("#ad_entrance", T::String), ("#ad_location", T::String)];

const AD_LOAD_END: Table = &[("#load_result", T::Bool), ("#load_duration", T::Number)];

const AD_FAILED: Table = &[("#error_code", T::Integer), ("#error_message", T::String)];

const AD_PAID: Table = &[
    ("#ad_value", T::Number),
    ("#ad_currency", T::String),
    ("#ad_precision", T::String),
    ("#ad_country_code", T::String),
];

const AD_CONVERSION: Table = &[("#ad_conversion_source", T::String)];

const IAS: Table = &[
    ("#ias_original_order", T::String),
    ("#ias_order", T::String),
    ("#ias_sku", T::String),
    ("#ias_price", T::Number),
    ("#ias_currency", T::String),
];

const IAP_PURCHASE_SUCCESS: Table = &[
    ("#iap_order", T::String),
    ("#iap_sku", T::String),
    ("#iap_price", T::Number),
    ("#iap_currency", T::String),
];

const APP_INSTALL: Table = &[
    ("#referrer_url", T::String),
    ("#referrer_click_time", T::Integer),
    ("#referrer_click_time_server", T::Integer),
    ("#app_install_time", T::Integer),
    ("#app_install_time_server", T::Integer),
    ("#instant_experience_launched", T::Bool),
    ("#failed_reason", T::String),
    ("#cnl", T::String),
];

const SESSION_START: Table = &[
    ("#is_first_time", T::Bool),
    ("#resume_from_background", T::Bool),
    ("#start_reason", T::String),
    ("#background_duration", T::Integer),
];

const SESSION_END: Table = &[("#session_duration", T::Integer)];

/// Event-specific tables of a preset `track` event, `None` for unknown names.
fn preset_event_tables(name: &str) -> Option<&'static [Table]> {
    let tables: &'static [Table] = match name {
        "#app_install" => &[APP_INSTALL],
        "#session_start" => &[SESSION_START],
        "#session_end" => &[SESSION_END],
        "#ad_load_begin" => &[AD],
        "#ad_load_end" => &[AD, AD_LOAD_END, AD_FAILED],
        "#ad_to_show" | "#ad_show" | "#ad_close" | "#ad_click" | "#ad_rewarded" => {
            &[AD, AD_PLACEMENT]
        }
        "#ad_show_failed" => &[AD, AD_PLACEMENT, AD_FAILED],
        "#ad_conversion" => &[AD, AD_PLACEMENT, AD_CONVERSION],
        "#ad_paid" => &[AD, AD_PLACEMENT, AD_PAID],
        "#iap_purchase_success" => &[IAP_PURCHASE_SUCCESS],
        "#ias_subscribe_success" | "#ias_subscribe_notify" => &[IAS],
        _ => return None,
    };
    Some(tables)
}

fn lookup(tables: &[Table], key: &str) -> Option<TypeConstraint> {
    tables
        .iter()
        .flat_map(|t| t.iter())
        .find(|(name, _)| *name == key)
        .map(|(_, c)| *c)
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

// ════════════════════════════════════════════════════════════════
//  Entry point
// ════════════════════════════════════════════════════════════════

/// Verify a canonical record. Any failure is a [`dt_api::ErrorKind::Verify`] error.
pub fn verify_event(event: &Event) -> Result<(), CoreError> {
    for key in COMPULSORY_META {
        if !event.contains_key(key) {
            return Err(CoreError::verify(format!("meta property \"{key}\" is required, but missing")));
        }
    }
    for (key, constraint) in META {
        match event.get(*key) {
            Some(value) if !constraint.accepts(value) => {
                return Err(CoreError::verify(format!(
                    "meta property \"{key}\" should be {constraint:?}, got {value}"
                )));
            }
            _ => {}
        }
    }

    non_empty(event, keys::DT_ID)?;
    if event.contains_key(keys::APP_ID) {
        non_empty(event, keys::APP_ID)?;
    }

    let Some(Value::String(name)) = event.get(keys::EVENT_NAME) else {
        return Err(CoreError::verify("#event_name should be a string"));
    };
    if !is_valid_name(name) {
        return Err(CoreError::verify(format!("event name \"{name}\" is invalid")));
    }

    let Some(Value::String(event_type)) = event.get(keys::EVENT_TYPE) else {
        return Err(CoreError::verify("#event_type should be a string"));
    };
    let Some(Value::Object(properties)) = event.get(keys::PROPERTIES) else {
        return Err(CoreError::verify("properties should be an object"));
    };

    match EventType::parse(event_type) {
        Some(EventType::Track) if is_preset(name) => {
            let Some(tables) = preset_event_tables(name) else {
                return Err(CoreError::verify(format!("preset event \"{name}\" is unknown")));
            };
            verify_track(name, properties, tables)
        }
        Some(EventType::Track) => verify_track(name, properties, &[]),
        Some(EventType::User) => verify_user(name, properties),
        None => Err(CoreError::verify(format!("event type \"{event_type}\" is invalid"))),
    }
}

fn non_empty(event: &Event, key: &str) -> Result<(), CoreError> {
    match event.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(()),
        Some(Value::String(_)) => Err(CoreError::verify(format!("{key} cannot be empty"))),
        Some(_) => Err(CoreError::verify(format!("{key} should be a string"))),
        None => Err(CoreError::verify(format!("{key} is required, but missing"))),
    }
}

fn verify_track(name: &str, properties: &Properties, tables: &[Table]) -> Result<(), CoreError> {
    for (key, value) in properties {
        let constraint = lookup(tables, key).or_else(|| lookup(&[EVENT_COMMON, SDK_COMMON], key));
        verify_property(name, key, value, constraint)?;
    }
    Ok(())
}

fn verify_user(name: &str, properties: &Properties) -> Result<(), CoreError> {
    let Some(op) = UserOp::from_event_name(name) else {
        return Err(CoreError::verify(format!("user event \"{name}\" is unknown")));
    };

    for (key, value) in properties {
        let constraint = lookup(&[USER_COMMON, SDK_COMMON], key);
        verify_property(name, key, value, constraint)?;
    }

    let mut custom = properties.iter().filter(|(k, _)| !is_preset(k));
    match op {
        UserOp::Add => {
            if let Some((key, _)) = custom.find(|(_, v)| !v.is_number()) {
                return Err(CoreError::verify(format!("{name}: value of \"{key}\" should be a number")));
            }
        }
        UserOp::Append | UserOp::UniqAppend => {
            if let Some((key, _)) = custom.find(|(_, v)| !v.is_array()) {
                return Err(CoreError::verify(format!("{name}: value of \"{key}\" should be a list")));
            }
        }
        _ => {}
    }
    Ok(())
}

fn verify_property(
    event_name: &str,
    key: &str,
    value: &Value,
    constraint: Option<TypeConstraint>,
) -> Result<(), CoreError> {
    if !is_valid_name(key) {
        return Err(CoreError::verify(format!("property name \"{key}\" is invalid")));
    }
    if !is_preset(key) {
        return Ok(());
    }
    match constraint {
        Some(c) if c.accepts(value) => Ok(()),
        Some(c) => Err(CoreError::verify(format!(
            "property \"{key}\" should be {c:?}, got {value}"
        ))),
        None => Err(CoreError::verify(format!(
            "property \"{key}\" is out of scope for event \"{event_name}\""
        ))),
    }
}
