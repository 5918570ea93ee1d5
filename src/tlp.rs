//! Traffic Light Protocol levels and the forwarding ceiling.
//!
//! An object may be sent only if every TLP marking it carries is at or
//! below the connector's configured ceiling:
//!
//! | ceiling | allowed |
//! |---------|---------|
//! | RED | WHITE, GREEN, AMBER, RED |
//! | AMBER | WHITE, GREEN, AMBER |
//! | GREEN | WHITE, GREEN |
//! | WHITE | WHITE |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Bundle, MarkingDefinition};

/// Marking applied when an entity carries no TLP marking at all.
pub const DEFAULT_MARKING: &str = "TLP:CLEAR";

/// STIX 2.1 ids of the four standard TLP marking definitions.
pub const WELL_KNOWN_MARKINGS: [(&str, TlpLevel); 4] = [
    (
        "marking-definition--613f2e26-407d-48c7-9eca-b8e91df99dc9",
        TlpLevel::White,
    ),
    (
        "marking-definition--34098fce-860f-48ae-8e50-ebd3cc5e41da",
        TlpLevel::Green,
    ),
    (
        "marking-definition--f88d31f6-486f-44da-b317-01333bde0b82",
        TlpLevel::Amber,
    ),
    (
        "marking-definition--5e57c739-391a-4eb3-b6be-7d15ca92d5ed",
        TlpLevel::Red,
    ),
];

/// Ordered TLP levels, least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TlpLevel {
    /// Also accepted as `TLP:CLEAR`.
    White,
    Green,
    Amber,
    Red,
}

impl TlpLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlpLevel::White => "TLP:WHITE",
            TlpLevel::Green => "TLP:GREEN",
            TlpLevel::Amber => "TLP:AMBER",
            TlpLevel::Red => "TLP:RED",
        }
    }

    /// Whether data marked `level` may be sent under this ceiling.
    pub fn allows(&self, level: TlpLevel) -> bool {
        level <= *self
    }
}

impl fmt::Display for TlpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised TLP label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTlp(pub String);

impl fmt::Display for UnknownTlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown TLP marking: {}", self.0)
    }
}

impl std::error::Error for UnknownTlp {}

impl FromStr for TlpLevel {
    type Err = UnknownTlp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TLP:WHITE" | "TLP:CLEAR" => Ok(TlpLevel::White),
            "TLP:GREEN" => Ok(TlpLevel::Green),
            "TLP:AMBER" => Ok(TlpLevel::Amber),
            "TLP:RED" => Ok(TlpLevel::Red),
            _ => Err(UnknownTlp(s.to_string())),
        }
    }
}

impl TryFrom<String> for TlpLevel {
    type Error = UnknownTlp;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TlpLevel> for String {
    fn from(level: TlpLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Check whether marking `tlp` may be sent under ceiling `max_tlp`.
///
/// Unknown labels on either side never pass.
pub fn check_max_tlp(tlp: &str, max_tlp: &str) -> bool {
    match (tlp.parse::<TlpLevel>(), max_tlp.parse::<TlpLevel>()) {
        (Ok(level), Ok(ceiling)) => ceiling.allows(level),
        _ => false,
    }
}

/// TLP labels that apply to an entity: the default marking plus every TLP
/// marking definition it carries.
pub fn entity_tlps(markings: &[MarkingDefinition]) -> Vec<String> {
    let mut tlps = vec![DEFAULT_MARKING.to_string()];
    tlps.extend(
        markings
            .iter()
            .filter(|m| m.is_tlp())
            .map(|m| m.definition.clone()),
    );
    tlps
}

/// First TLP label in `tlps` that exceeds `ceiling`, if any.
pub fn first_exceeding<'a>(tlps: &'a [String], ceiling: TlpLevel) -> Option<&'a str> {
    tlps.iter()
        .map(String::as_str)
        .find(|tlp| !check_max_tlp(tlp, ceiling.as_str()))
}

/// TLP level declared by a marking-definition object.
fn marking_object_level(object: &Value) -> Option<TlpLevel> {
    let definition_type = object.get("definition_type")?.as_str()?;
    if !definition_type.eq_ignore_ascii_case("tlp") {
        return None;
    }
    match object.get("definition") {
        Some(Value::Object(def)) => def
            .get("tlp")
            .and_then(Value::as_str)
            .and_then(|t| format!("TLP:{}", t).parse().ok()),
        Some(Value::String(label)) => label.parse().ok(),
        _ => object
            .get("name")
            .and_then(Value::as_str)
            .and_then(|n| n.parse().ok()),
    }
}

fn is_marking_definition(object: &Value) -> bool {
    object.get("type").and_then(Value::as_str) == Some("marking-definition")
}

/// Drop every object that references a TLP marking above `ceiling`.
///
/// Marking references are resolved against marking definitions carried in
/// the bundle and the well-known STIX TLP ids. Non-TLP markings are
/// ignored. Marking definitions themselves are always kept.
pub fn filter_bundle(bundle: &Bundle, ceiling: TlpLevel) -> Bundle {
    let mut levels: HashMap<&str, TlpLevel> = WELL_KNOWN_MARKINGS.iter().copied().collect();
    for object in bundle.objects.iter().filter(|o| is_marking_definition(o)) {
        if let (Some(id), Some(level)) = (
            object.get("id").and_then(Value::as_str),
            marking_object_level(object),
        ) {
            levels.insert(id, level);
        }
    }

    let kept = bundle
        .objects
        .iter()
        .filter(|object| {
            if is_marking_definition(object) {
                return true;
            }
            let refs = object
                .get("object_marking_refs")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            refs.iter()
                .filter_map(Value::as_str)
                .filter_map(|id| levels.get(id))
                .all(|level| ceiling.allows(*level))
        })
        .cloned()
        .collect();

    bundle.with_objects(kept)
}
