use serde::{Deserialize, Serialize};

/// An event record: string keys to heterogeneous JSON values.
///
/// The SDK hands the core a *flat* record (properties and meta keys side by
/// side); the core normalizes it into the canonical shape with a nested
/// `properties` object before it reaches a consumer.
pub type Event = serde_json::Map<String, serde_json::Value>;

/// A property mapping supplied by the caller.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Well-known keys of an event record.
pub mod keys {
    pub const DT_ID: &str = "#dt_id";
    pub const ACID: &str = "#acid";
    pub const EVENT_NAME: &str = "#event_name";
    pub const EVENT_TYPE: &str = "#event_type";
    pub const EVENT_TIME: &str = "#event_time";
    pub const EVENT_SYN: &str = "#event_syn";
    pub const APP_ID: &str = "#app_id";
    pub const BUNDLE_ID: &str = "#bundle_id";
    pub const ANDROID_ID: &str = "#android_id";
    pub const GAID: &str = "#gaid";
    pub const DEBUG: &str = "#debug";
    pub const SDK_TYPE: &str = "#sdk_type";
    pub const SDK_VERSION_NAME: &str = "#sdk_version_name";
    pub const PROPERTIES: &str = "properties";
}

/// Keys the SDK composer injects into every record. A caller property with
/// one of these names is a collision, never a silent override.
pub const COMPOSER_KEYS: [&str; 6] = [
    keys::DT_ID,
    keys::ACID,
    keys::EVENT_NAME,
    keys::EVENT_TYPE,
    keys::SDK_TYPE,
    keys::SDK_VERSION_NAME,
];

/// Keys that live at the top level of a canonical record. Everything else
/// goes into `properties`.
pub const META_KEYS: [&str; 11] = [
    keys::APP_ID,
    keys::BUNDLE_ID,
    keys::ANDROID_ID,
    keys::GAID,
    keys::DT_ID,
    keys::ACID,
    keys::EVENT_NAME,
    keys::EVENT_TYPE,
    keys::EVENT_TIME,
    keys::EVENT_SYN,
    keys::DEBUG,
];

/// Preset names (events and properties) start with `#`.
pub fn is_preset(name: &str) -> bool {
    name.starts_with('#')
}

pub fn is_meta_key(key: &str) -> bool {
    META_KEYS.contains(&key)
}

pub fn is_composer_key(key: &str) -> bool {
    COMPOSER_KEYS.contains(&key)
}

/// `#event_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Track,
    User,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Track => "track",
            EventType::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "track" => Some(EventType::Track),
            "user" => Some(EventType::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile operations. Each maps to a fixed reserved event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOp {
    Set,
    SetOnce,
    Add,
    Unset,
    Delete,
    Append,
    UniqAppend,
}

impl UserOp {
    pub const ALL: [UserOp; 7] = [
        UserOp::Set,
        UserOp::SetOnce,
        UserOp::Add,
        UserOp::Unset,
        UserOp::Delete,
        UserOp::Append,
        UserOp::UniqAppend,
    ];

    pub fn event_name(&self) -> &'static str {
        match self {
            UserOp::Set => "#user_set",
            UserOp::SetOnce => "#user_set_once",
            UserOp::Add => "#user_add",
            UserOp::Unset => "#user_unset",
            UserOp::Delete => "#user_delete",
            UserOp::Append => "#user_append",
            UserOp::UniqAppend => "#user_uniq_append",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.event_name() == name)
    }
}
