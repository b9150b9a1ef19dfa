//! Domain entities: registry records and the documents holding them

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::{DomainError, DomainResult};

/// The three registries a removal touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    ConfigEntries,
    Devices,
    Entities,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 3] = [
        RegistryKind::ConfigEntries,
        RegistryKind::Devices,
        RegistryKind::Entities,
    ];

    /// Name of the record array under the document's `data` object.
    pub fn collection(&self) -> &'static str {
        match self {
            RegistryKind::ConfigEntries => "entries",
            RegistryKind::Devices => "devices",
            RegistryKind::Entities => "entities",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryKind::ConfigEntries => "config entries",
            RegistryKind::Devices => "devices",
            RegistryKind::Entities => "entities",
        };
        write!(f, "{}", name)
    }
}

/// Typed view over a raw registry record.
///
/// Only the fields the cascade needs are deserialized; the raw JSON value
/// stays the source of truth for persistence.
pub trait RegistryRecord: DeserializeOwned {
    const KIND: RegistryKind;

    /// Unique identifier within the collection.
    fn key(&self) -> &str;

    /// Human-readable text for summaries.
    fn label(&self) -> &str;

    /// Deserialize the view from a raw record.
    fn from_raw(raw: &Value, position: usize) -> DomainResult<Self> {
        Self::deserialize(raw).map_err(|e| DomainError::InvalidRecord {
            collection: Self::KIND.collection().to_string(),
            position,
            message: e.to_string(),
        })
    }
}

/// An integration configuration, possibly shared by several devices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub title: String,
}

impl RegistryRecord for ConfigEntry {
    const KIND: RegistryKind = RegistryKind::ConfigEntries;

    fn key(&self) -> &str {
        &self.entry_id
    }

    fn label(&self) -> &str {
        &self.title
    }
}

/// A hardware or logical node, optionally connected via a parent device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_by_user: Option<String>,
    pub config_entries: Vec<String>,
    #[serde(default)]
    pub via_device_id: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
}

impl RegistryRecord for Device {
    const KIND: RegistryKind = RegistryKind::Devices;

    fn key(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// A single controllable or observable feature of a device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Owning device; null for entities not attached to any device
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub disabled_by: Option<String>,
}

impl RegistryRecord for Entity {
    const KIND: RegistryKind = RegistryKind::Entities;

    fn key(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// A whole registry document: `{ "data": { "<collection>": [ ... ] }, ... }`.
///
/// Everything outside the record array is carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryDocument {
    kind: RegistryKind,
    raw: Value,
}

impl RegistryDocument {
    pub fn new(kind: RegistryKind, raw: Value) -> DomainResult<Self> {
        let has_records = raw
            .get("data")
            .and_then(|data| data.get(kind.collection()))
            .map(Value::is_array)
            .unwrap_or(false);
        if !has_records {
            return Err(DomainError::InvalidDocument {
                collection: kind.collection().to_string(),
                message: format!("missing array at data.{}", kind.collection()),
            });
        }
        Ok(Self { kind, raw })
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn records(&self) -> &[Value] {
        self.raw
            .get("data")
            .and_then(|data| data.get(self.kind.collection()))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Copy of this document with its record array replaced.
    pub fn with_records(&self, records: Vec<Value>) -> Self {
        let mut raw = self.raw.clone();
        if let Some(data) = raw.get_mut("data").and_then(Value::as_object_mut) {
            data.insert(self.kind.collection().to_string(), Value::Array(records));
        }
        Self {
            kind: self.kind,
            raw,
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }
}

/// The three registry documents as loaded from (or headed back to) storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySnapshot {
    pub config_entries: RegistryDocument,
    pub devices: RegistryDocument,
    pub entities: RegistryDocument,
}

impl RegistrySnapshot {
    pub fn document(&self, kind: RegistryKind) -> &RegistryDocument {
        match kind {
            RegistryKind::ConfigEntries => &self.config_entries,
            RegistryKind::Devices => &self.devices,
            RegistryKind::Entities => &self.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn given_device_without_config_entries_when_parsing_then_invalid_record() {
        let raw = json!({"id": "d1", "name": "Hub"});
        let err = Device::from_raw(&raw, 3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidRecord { position: 3, .. }
        ));
    }

    #[test]
    fn given_entity_with_null_name_when_labeling_then_placeholder() {
        let raw = json!({"id": "e1", "name": null, "device_id": "d1"});
        let entity = Entity::from_raw(&raw, 0).unwrap();
        assert_eq!(entity.label(), "(unnamed)");
        assert_eq!(entity.device_id.as_deref(), Some("d1"));
    }

    #[test]
    fn given_document_without_collection_when_creating_then_invalid_document() {
        let raw = json!({"data": {"devices": []}});
        let result = RegistryDocument::new(RegistryKind::Entities, raw);
        assert!(matches!(result, Err(DomainError::InvalidDocument { .. })));
    }

    #[test]
    fn given_document_when_replacing_records_then_other_keys_survive() {
        let raw = json!({
            "version": 1,
            "minor_version": 4,
            "key": "core.device_registry",
            "data": {"devices": [{"id": "d1"}], "deleted_devices": []}
        });
        let doc = RegistryDocument::new(RegistryKind::Devices, raw).unwrap();

        let updated = doc.with_records(vec![]);

        assert!(updated.records().is_empty());
        assert_eq!(doc.records().len(), 1);
        assert_eq!(updated.as_value()["minor_version"], json!(4));
        assert_eq!(updated.as_value()["data"]["deleted_devices"], json!([]));
    }
}
