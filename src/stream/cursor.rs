//! Live stream cursor: last consumed event id plus recovery deadline.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::StreamSettings;
use crate::state::{ConnectorState, RECOVER_UNTIL, START_FROM};
use crate::traits::{StateError, StateStore};

/// Cursor used when nothing else is known: the beginning of the stream.
pub const ORIGIN: &str = "0-0";

static EVENT_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("Invalid event id regex pattern"));

/// Parsed `<timestamp>-<sequence>` stream event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub timestamp: u64,
    pub sequence: u64,
}

impl EventId {
    pub fn new(timestamp: u64, sequence: u64) -> Self {
        Self {
            timestamp,
            sequence,
        }
    }
}

impl Ord for EventId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.sequence).cmp(&(other.timestamp, other.sequence))
    }
}

impl PartialOrd for EventId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.sequence)
    }
}

impl FromStr for EventId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = EVENT_ID_REGEX
            .captures(s.trim())
            .ok_or_else(|| format!("invalid event id: {}", s))?;
        let timestamp = caps[1].parse().map_err(|e| format!("{}: {}", s, e))?;
        let sequence = caps[2].parse().map_err(|e| format!("{}: {}", s, e))?;
        Ok(Self {
            timestamp,
            sequence,
        })
    }
}

/// Position in the live stream and the recovery deadline sent on connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCursor {
    start_from: String,
    recover_until: String,
}

impl StreamCursor {
    pub fn new(start_from: impl Into<String>, recover_until: impl Into<String>) -> Self {
        Self {
            start_from: start_from.into(),
            recover_until: recover_until.into(),
        }
    }

    /// Pick the starting point from (already migrated) state.
    ///
    /// `start_from`: stored value, else `<start_timestamp>-0`, else `0-0`.
    /// `recover_until`: stored value, else the configured date, else `now`.
    pub fn resolve(state: &ConnectorState, settings: &StreamSettings, now: DateTime<Utc>) -> Self {
        let start_from = state
            .get_str(START_FROM)
            .map(str::to_string)
            .or_else(|| settings.start_timestamp.map(|ts| format!("{}-0", ts)))
            .unwrap_or_else(|| ORIGIN.to_string());

        let recover_until = state
            .get_str(RECOVER_UNTIL)
            .map(str::to_string)
            .or_else(|| settings.recover_iso_date.clone().filter(|d| !d.is_empty()))
            .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Secs, true));

        Self {
            start_from,
            recover_until,
        }
    }

    /// Load state, migrate legacy keys, resolve the cursor and persist both
    /// values before any event is read.
    pub async fn load(
        store: &dyn StateStore,
        settings: &StreamSettings,
    ) -> Result<Self, StateError> {
        let mut state = store.get_state().await?;
        let migrated = state.migrate_legacy_keys();
        if !migrated.is_empty() {
            info!("Migrated legacy stream state keys: {:?}", migrated);
        }

        let cursor = Self::resolve(&state, settings, Utc::now());
        store.set_state(cursor.to_state()).await?;
        debug!(
            "Stream cursor resolved: from={} recover={}",
            cursor.start_from, cursor.recover_until
        );
        Ok(cursor)
    }

    pub fn start_from(&self) -> &str {
        &self.start_from
    }

    pub fn recover_until(&self) -> &str {
        &self.recover_until
    }

    /// Move to `event_id`.
    ///
    /// Refuses (and returns `false`) when both ids parse and `event_id` is
    /// lower than the current position. Opaque ids are always accepted.
    pub fn advance(&mut self, event_id: &str) -> bool {
        if let (Ok(current), Ok(next)) = (
            self.start_from.parse::<EventId>(),
            event_id.parse::<EventId>(),
        ) {
            if next < current {
                warn!(
                    "Ignoring stream cursor regression from {} to {}",
                    current, next
                );
                return false;
            }
        }
        self.start_from = event_id.to_string();
        true
    }

    /// Both cursor keys as a partial state.
    pub fn to_state(&self) -> ConnectorState {
        ConnectorState::new()
            .with(START_FROM, self.start_from.clone())
            .with(RECOVER_UNTIL, self.recover_until.clone())
    }

    /// Per-event checkpoint: position and last-run marker.
    pub fn checkpoint(&self, now: DateTime<Utc>) -> ConnectorState {
        let mut state = ConnectorState::last_run_entry(now);
        state.insert(START_FROM, self.start_from.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LEGACY_RECOVER_UNTIL, LEGACY_START_FROM, LAST_RUN};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn test_event_id_parse_and_order() {
        let a: EventId = "1690000000000-0".parse().unwrap();
        let b: EventId = "1690000000000-12".parse().unwrap();
        let c: EventId = "1690000000001-0".parse().unwrap();

        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.to_string(), "1690000000000-12");
        assert!("not-an-id".parse::<EventId>().is_err());
        assert!("12".parse::<EventId>().is_err());
    }

    #[test]
    fn test_event_id_numeric_not_lexical() {
        let nine: EventId = "9-0".parse().unwrap();
        let ten: EventId = "10-0".parse().unwrap();
        assert!(nine < ten);
    }

    #[test]
    fn test_resolve_cold_start() {
        let cursor = StreamCursor::resolve(&ConnectorState::new(), &StreamSettings::default(), now());
        assert_eq!(cursor.start_from(), "0-0");
        assert_eq!(cursor.recover_until(), "2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_resolve_configured_fallbacks() {
        let settings = StreamSettings {
            start_timestamp: Some(1_700_000_000_000),
            recover_iso_date: Some("2024-01-01T00:00:00Z".to_string()),
            ..StreamSettings::default()
        };
        let cursor = StreamCursor::resolve(&ConnectorState::new(), &settings, now());
        assert_eq!(cursor.start_from(), "1700000000000-0");
        assert_eq!(cursor.recover_until(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_resolve_prefers_state() {
        let settings = StreamSettings {
            start_timestamp: Some(1),
            ..StreamSettings::default()
        };
        let state = ConnectorState::new()
            .with(START_FROM, "42-3")
            .with(RECOVER_UNTIL, "2023-01-01T00:00:00Z");
        let cursor = StreamCursor::resolve(&state, &settings, now());
        assert_eq!(cursor.start_from(), "42-3");
        assert_eq!(cursor.recover_until(), "2023-01-01T00:00:00Z");
    }

    #[test]
    fn test_resolve_uses_migrated_legacy_keys() {
        let mut state = ConnectorState::new()
            .with(LEGACY_START_FROM, "7-7")
            .with(LEGACY_RECOVER_UNTIL, "2022-05-05T00:00:00Z");
        state.migrate_legacy_keys();

        let cursor = StreamCursor::resolve(&state, &StreamSettings::default(), now());
        assert_eq!(cursor.start_from(), "7-7");
        assert_eq!(cursor.recover_until(), "2022-05-05T00:00:00Z");
    }

    #[test]
    fn test_advance_never_regresses() {
        let mut cursor = StreamCursor::new("5-0", "x");
        assert!(cursor.advance("6-0"));
        assert!(cursor.advance("6-0"));
        assert!(!cursor.advance("5-9"));
        assert_eq!(cursor.start_from(), "6-0");
    }

    #[test]
    fn test_advance_accepts_opaque_ids() {
        let mut cursor = StreamCursor::new("5-0", "x");
        assert!(cursor.advance("opaque-token"));
        assert!(cursor.advance("1-0"));
        assert_eq!(cursor.start_from(), "1-0");
    }

    #[test]
    fn test_checkpoint_contains_position_and_last_run() {
        let cursor = StreamCursor::new("9-1", "x");
        let state = cursor.checkpoint(now());
        assert_eq!(state.get_str(START_FROM), Some("9-1"));
        assert_eq!(state.get_i64(LAST_RUN), Some(now().timestamp()));
        assert!(!state.contains_key(RECOVER_UNTIL));
    }
}
