// Timing and outcome records for requests made by the target.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

pub const TOPIC_DOM_LOAD: &str = "performance.system.domLoad";
pub const TOPIC_DOM_LOAD_FAIL: &str = "performance.system.domLoad.fail";
pub const TOPIC_SERIALIZE_FOR_CACHE: &str = "performance.system.serializeforcache";
pub const TOPIC_SERIALIZE_FOR_CACHE_NO_KEY: &str =
    "performance.system.serializeforcache.nocachekey";
pub const TOPIC_SERIALIZE_FOR_CACHE_FAIL: &str = "performance.system.serializeforcache.fail";
pub const TOPIC_SAVE_ERROR: &str = "performance.user.saveError";
pub const TOPIC_SUBMIT_FAIL: &str = "performance.system.submit.fail";

/// Suffixes of `performance.system.<event>.*` for cache-key aware requests.
pub const WITH_CACHE_KEY: &str = "withCacheKey";
pub const WITHOUT_CACHE_KEY: &str = "withoutCacheKey";
pub const BAD_CACHE_KEY: &str = "badCacheKey";
/// Transfer failed before any reply arrived.
pub const FAIL: &str = "fail";

/// `performance.system.<event>.<suffix>`
pub fn system_topic(event: &str, suffix: &str) -> String {
    format!("performance.system.{event}.{suffix}")
}

/// Payload of a tracked event. Fields are optional because each topic
/// records a different subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackData {
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsoid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

impl TrackData {
    pub fn timed(duration: Duration) -> Self {
        Self { duration, ..Self::default() }
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

pub trait Tracker: Send + Sync {
    fn track(&self, topic: &str, data: &TrackData);
}

/// Writes every record to the `wikiedit::track` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracker;

impl Tracker for TracingTracker {
    fn track(&self, topic: &str, data: &TrackData) {
        info!(
            target: "wikiedit::track",
            topic,
            duration_ms = data.duration.as_millis() as u64,
            bytes = data.bytes,
            cache_hit = data.cache_hit,
            parsoid = data.parsoid.as_deref(),
            retries = data.retries,
            kind = data.kind,
            "track"
        );
    }
}
