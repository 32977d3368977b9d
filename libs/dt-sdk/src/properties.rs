//! Common properties merged into every `track` event.

use dt_api::Properties;

/// Properties computed at call time, e.g. a session id or a build flag.
///
/// Evaluated once per `track` call.
pub trait DynamicProperties: Send + Sync {
    fn properties(&self) -> Properties;
}

impl<F> DynamicProperties for F
where
    F: Fn() -> Properties + Send + Sync,
{
    fn properties(&self) -> Properties {
        self()
    }
}

/// Merge the three property tiers. On key collision dynamic wins over
/// static, and static wins over per-call.
pub fn merge_properties(
    per_call: Properties,
    static_props: &Properties,
    dynamic: Properties,
) -> Properties {
    let mut merged = per_call;
    merged.extend(static_props.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.extend(dynamic);
    merged
}
