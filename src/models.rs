//! Data model shared by all connector kinds.
//!
//! Inbound broker messages, platform entities, bundles and the outputs of
//! user connector logic.

use serde::{Deserialize, Serialize};

/// The kind of a connector, as registered with the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectorType {
    /// From remote sources into the platform, on a schedule.
    ExternalImport,
    /// From platform file storage into the platform.
    InternalImportFile,
    /// From a platform entity to more platform data.
    InternalEnrichment,
    /// Consumes the platform live stream.
    Stream,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::ExternalImport => "EXTERNAL_IMPORT",
            ConnectorType::InternalImportFile => "INTERNAL_IMPORT_FILE",
            ConnectorType::InternalEnrichment => "INTERNAL_ENRICHMENT",
            ConnectorType::Stream => "STREAM",
        }
    }
}

impl std::fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered batch of structured objects produced for one work unit.
///
/// Objects are opaque JSON; only `type`, `id` and `object_marking_refs` are
/// ever inspected (for marking and scope filtering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "bundle")]
pub struct Bundle {
    pub id: String,
    #[serde(default)]
    pub objects: Vec<serde_json::Value>,
}

impl Bundle {
    /// Create a bundle with a fresh `bundle--<uuid>` id.
    pub fn new(objects: Vec<serde_json::Value>) -> Self {
        Self {
            id: format!("bundle--{}", uuid::Uuid::new_v4()),
            objects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Same envelope id, different object list.
    pub fn with_objects(&self, objects: Vec<serde_json::Value>) -> Self {
        Self {
            id: self.id.clone(),
            objects,
        }
    }

    /// Keep objects whose `type` is in `scope` (case-insensitive), plus
    /// marking definitions.
    pub fn retain_scope(&self, scope: &[String]) -> Self {
        let kept = self
            .objects
            .iter()
            .filter(|object| match object.get("type").and_then(|t| t.as_str()) {
                Some("marking-definition") => true,
                Some(object_type) => scope.iter().any(|s| s.eq_ignore_ascii_case(object_type)),
                None => false,
            })
            .cloned()
            .collect();
        self.with_objects(kept)
    }
}

/// A marking definition attached to a platform entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingDefinition {
    #[serde(alias = "definitionType")]
    pub definition_type: String,
    pub definition: String,
}

impl MarkingDefinition {
    pub fn tlp(definition: impl Into<String>) -> Self {
        Self {
            definition_type: "TLP".to_string(),
            definition: definition.into(),
        }
    }

    pub fn is_tlp(&self) -> bool {
        self.definition_type.eq_ignore_ascii_case("TLP")
    }
}

/// A platform entity as read by the enrichment lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default, alias = "entityType")]
    pub entity_type: Option<String>,
    #[serde(default, alias = "objectMarking")]
    pub object_marking: Vec<MarkingDefinition>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: None,
            object_marking: Vec::new(),
        }
    }

    pub fn with_marking(mut self, marking: MarkingDefinition) -> Self {
        self.object_marking.push(marking);
        self
    }
}

/// Work tracking metadata carried by every internal broker message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalMeta {
    #[serde(alias = "workId")]
    pub work_id: String,
    #[serde(default, alias = "applicantId")]
    pub applicant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentEvent {
    #[serde(alias = "entityId")]
    pub entity_id: String,
}

/// Broker message that triggers an enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentMessage {
    pub event: EnrichmentEvent,
    pub internal: InternalMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFileEvent {
    #[serde(alias = "fileFetch")]
    pub file_fetch: String,
    #[serde(alias = "fileMime")]
    pub file_mime: String,
    #[serde(default, alias = "entityId")]
    pub entity_id: Option<String>,
}

/// Broker message that triggers a file import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFileMessage {
    pub event: ImportFileEvent,
    pub internal: InternalMeta,
}

/// What import and enrichment logic returns on success.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunOutput {
    /// Reported as the work unit's processed message.
    pub summary: String,
    pub bundles: Vec<Bundle>,
}

impl RunOutput {
    pub fn new(summary: impl Into<String>, bundles: Vec<Bundle>) -> Self {
        Self {
            summary: summary.into(),
            bundles,
        }
    }
}

/// What stream logic returns for one event.
///
/// Bundles are submitted only when `work_id` is set and bundles exist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamOutput {
    pub work_id: Option<String>,
    pub bundles: Vec<Bundle>,
}

impl StreamOutput {
    /// Event consumed, nothing to import.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_bundles(work_id: impl Into<String>, bundles: Vec<Bundle>) -> Self {
        Self {
            work_id: Some(work_id.into()),
            bundles,
        }
    }
}
