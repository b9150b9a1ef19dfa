//! Cross-reference indexes over the device and entity registries.

use indexmap::{IndexMap, IndexSet};
use tracing::{info, instrument};

use crate::domain::entities::{Device, Entity};
use crate::domain::store::RecordStore;

/// Device ids keyed by some other identifier, insertion-ordered.
pub type DeviceSets = IndexMap<String, IndexSet<String>>;

/// A config entry referenced by more than one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConfigEntry {
    pub entry_id: String,
    pub device_count: usize,
}

/// Secondary indexes needed to resolve a cascade.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    pub device_by_name: IndexMap<String, String>,
    pub device_by_user_alias: IndexMap<String, String>,
    pub children_by_parent: DeviceSets,
    pub referencing_devices_by_config_entry: DeviceSets,
    pub entity_ids_by_device: DeviceSets,
}

impl CrossReferenceIndex {
    /// Build all indexes in one pass per collection.
    ///
    /// Shared config entries are logged here, before any removal is
    /// computed.
    #[instrument(level = "debug", skip_all)]
    pub fn build(devices: &RecordStore<Device>, entities: &RecordStore<Entity>) -> Self {
        let mut index = Self::default();

        for device in devices.items() {
            if let Some(name) = &device.name {
                index.device_by_name.insert(name.clone(), device.id.clone());
            }
            if let Some(alias) = &device.name_by_user {
                index
                    .device_by_user_alias
                    .insert(alias.clone(), device.id.clone());
            }
            if let Some(parent) = &device.via_device_id {
                index
                    .children_by_parent
                    .entry(parent.clone())
                    .or_default()
                    .insert(device.id.clone());
            }
            for entry_id in &device.config_entries {
                index
                    .referencing_devices_by_config_entry
                    .entry(entry_id.clone())
                    .or_default()
                    .insert(device.id.clone());
            }
        }

        for entity in entities.items() {
            if let Some(device_id) = &entity.device_id {
                index
                    .entity_ids_by_device
                    .entry(device_id.clone())
                    .or_default()
                    .insert(entity.id.clone());
            }
        }

        for shared in index.shared_config_entries() {
            info!(
                "config entry \"{}\" is referenced from {} devices",
                shared.entry_id, shared.device_count
            );
        }

        index
    }

    /// Config entries referenced by more than one device.
    pub fn shared_config_entries(&self) -> Vec<SharedConfigEntry> {
        self.referencing_devices_by_config_entry
            .iter()
            .filter(|(_, devices)| devices.len() > 1)
            .map(|(entry_id, devices)| SharedConfigEntry {
                entry_id: entry_id.clone(),
                device_count: devices.len(),
            })
            .collect()
    }

    /// Resolve a user-supplied target to a device id.
    ///
    /// The device name is tried first, then the user-assigned alias.
    pub fn resolve_target(&self, target: &str) -> Option<&str> {
        self.device_by_name
            .get(target)
            .or_else(|| self.device_by_user_alias.get(target))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{RegistryDocument, RegistryKind};
    use serde_json::json;

    fn stores() -> (RecordStore<Device>, RecordStore<Entity>) {
        let devices = RegistryDocument::new(
            RegistryKind::Devices,
            json!({"data": {"devices": [
                {"id": "d1", "name": "Hub", "name_by_user": null, "config_entries": ["c1"], "via_device_id": null},
                {"id": "d2", "name": "Bulb", "name_by_user": "Desk Lamp", "config_entries": ["c1", "c2"], "via_device_id": "d1"},
                {"id": "d3", "name": "Plug", "name_by_user": null, "config_entries": ["c2"], "via_device_id": "d1"}
            ]}}),
        )
        .unwrap();
        let entities = RegistryDocument::new(
            RegistryKind::Entities,
            json!({"data": {"entities": [
                {"id": "e1", "name": "Light", "device_id": "d2"},
                {"id": "e2", "name": "Power", "device_id": "d3"},
                {"id": "e3", "name": "Sun", "device_id": null}
            ]}}),
        )
        .unwrap();
        (
            RecordStore::from_document(&devices).unwrap(),
            RecordStore::from_document(&entities).unwrap(),
        )
    }

    #[test]
    fn given_registries_when_building_then_children_follow_document_order() {
        let (devices, entities) = stores();
        let index = CrossReferenceIndex::build(&devices, &entities);

        let children: Vec<&str> = index.children_by_parent["d1"]
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(children, vec!["d2", "d3"]);
        assert_eq!(index.entity_ids_by_device.len(), 2);
    }

    #[test]
    fn given_shared_entries_when_building_then_reports_them() {
        let (devices, entities) = stores();
        let index = CrossReferenceIndex::build(&devices, &entities);

        assert_eq!(
            index.shared_config_entries(),
            vec![
                SharedConfigEntry {
                    entry_id: "c1".into(),
                    device_count: 2
                },
                SharedConfigEntry {
                    entry_id: "c2".into(),
                    device_count: 2
                },
            ]
        );
    }

    #[test]
    fn given_name_or_alias_when_resolving_then_finds_device() {
        let (devices, entities) = stores();
        let index = CrossReferenceIndex::build(&devices, &entities);

        assert_eq!(index.resolve_target("Hub"), Some("d1"));
        assert_eq!(index.resolve_target("Desk Lamp"), Some("d2"));
        assert_eq!(index.resolve_target("Bulb"), Some("d2"));
        assert_eq!(index.resolve_target("Nope"), None);
    }
}
