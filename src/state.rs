//! Connector state document.
//!
//! State is a small JSON object persisted per connector instance. The
//! runtime owns a handful of keys (stream cursor, recovery deadline, last
//! error, last run); connector logic may store anything else alongside.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Last consumed stream event id.
pub const START_FROM: &str = "start_from";
/// Recovery deadline sent as the stream `recover` parameter.
pub const RECOVER_UNTIL: &str = "recover_until";
/// Message of the last failure.
pub const ERROR: &str = "error";
/// Unix seconds of the last handled cycle.
pub const LAST_RUN: &str = "last_run";

/// Older name of [`START_FROM`].
pub const LEGACY_START_FROM: &str = "connectorLastEventId";
/// Older name of [`RECOVER_UNTIL`].
pub const LEGACY_RECOVER_UNTIL: &str = "connectorStartTime";

const LEGACY_KEYS: [(&str, &str); 2] = [
    (LEGACY_START_FROM, START_FROM),
    (LEGACY_RECOVER_UNTIL, RECOVER_UNTIL),
];

/// Opaque mapping of string keys to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorState(Map<String, Value>);

impl ConnectorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`; empty strings count as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Merge `other` into `self`, last write wins per key.
    pub fn merge(&mut self, other: ConnectorState) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    /// Copy legacy cursor keys to their current names.
    ///
    /// A legacy value is only used when the current key is absent or empty.
    /// Legacy keys are left in place. Returns the current-name keys that
    /// were filled in.
    pub fn migrate_legacy_keys(&mut self) -> Vec<&'static str> {
        let mut migrated = Vec::new();
        for (legacy, current) in LEGACY_KEYS {
            if self.get_str(current).is_some() {
                continue;
            }
            if let Some(value) = self.get_str(legacy).map(str::to_string) {
                self.insert(current, value);
                migrated.push(current);
            }
        }
        migrated
    }

    pub fn error(&self) -> Option<&str> {
        self.get_str(ERROR)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.get_i64(LAST_RUN)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// Partial state recording a failure.
    pub fn error_entry(message: impl Into<String>) -> Self {
        Self::new().with(ERROR, message.into())
    }

    /// Partial state recording a handled cycle at `at`.
    pub fn last_run_entry(at: DateTime<Utc>) -> Self {
        Self::new().with(LAST_RUN, at.timestamp())
    }
}

impl From<Map<String, Value>> for ConnectorState {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
