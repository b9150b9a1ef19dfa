//! Cascade resolution and application.
//!
//! Given the closure of a removed device, derive which config entries
//! become orphaned and which entities lose their device, then produce the
//! three pruned registry documents.

use indexmap::IndexSet;
use tracing::{debug, instrument, warn};

use crate::domain::entities::RegistrySnapshot;
use crate::domain::index::CrossReferenceIndex;
use crate::domain::store::Registries;

/// Keys to delete from each registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadePlan {
    pub devices: IndexSet<String>,
    pub config_entries: IndexSet<String>,
    pub entities: IndexSet<String>,
}

/// Derive the deletion sets for a device closure.
///
/// Reference counting runs on a copy of the index, so `index` still
/// describes the state before removal afterwards.
#[instrument(level = "debug", skip_all, fields(devices = closure.len()))]
pub fn resolve(
    closure: &[String],
    registries: &Registries,
    index: &CrossReferenceIndex,
) -> CascadePlan {
    let devices: IndexSet<String> = closure.iter().cloned().collect();

    let mut references = index.referencing_devices_by_config_entry.clone();
    for device_id in &devices {
        let Some(device) = registries.devices.get(device_id) else {
            continue;
        };
        for entry_id in &device.config_entries {
            if let Some(referencing) = references.get_mut(entry_id) {
                referencing.shift_remove(device_id);
            }
        }
    }

    let mut config_entries = IndexSet::new();
    for (entry_id, referencing) in &references {
        if !referencing.is_empty() {
            continue;
        }
        if registries.config_entries.contains(entry_id) {
            config_entries.insert(entry_id.clone());
        } else {
            warn!("config entry \"{}\" is referenced but not registered", entry_id);
        }
    }

    let entities: IndexSet<String> = devices
        .iter()
        .filter_map(|device_id| index.entity_ids_by_device.get(device_id))
        .flatten()
        .cloned()
        .collect();

    debug!(
        "plan: {} devices, {} config entries, {} entities",
        devices.len(),
        config_entries.len(),
        entities.len()
    );
    CascadePlan {
        devices,
        config_entries,
        entities,
    }
}

/// Apply a plan, returning fresh documents. The input snapshot is untouched.
#[instrument(level = "debug", skip_all)]
pub fn apply(
    plan: &CascadePlan,
    snapshot: &RegistrySnapshot,
    registries: &Registries,
) -> RegistrySnapshot {
    RegistrySnapshot {
        config_entries: snapshot
            .config_entries
            .with_records(registries.config_entries.without_keys(&plan.config_entries)),
        devices: snapshot
            .devices
            .with_records(registries.devices.without_keys(&plan.devices)),
        entities: snapshot
            .entities
            .with_records(registries.entities.without_keys(&plan.entities)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::closure::device_closure;
    use crate::domain::entities::{RegistryDocument, RegistryKind};
    use serde_json::{json, Value};

    fn snapshot(entries: Value, devices: Value, entities: Value) -> RegistrySnapshot {
        RegistrySnapshot {
            config_entries: RegistryDocument::new(
                RegistryKind::ConfigEntries,
                json!({"data": {"entries": entries}}),
            )
            .unwrap(),
            devices: RegistryDocument::new(
                RegistryKind::Devices,
                json!({"data": {"devices": devices}}),
            )
            .unwrap(),
            entities: RegistryDocument::new(
                RegistryKind::Entities,
                json!({"data": {"entities": entities}}),
            )
            .unwrap(),
        }
    }

    fn plan_for(snapshot: &RegistrySnapshot, root: &str) -> (CascadePlan, Registries) {
        let registries = Registries::from_snapshot(snapshot).unwrap();
        let index = CrossReferenceIndex::build(&registries.devices, &registries.entities);
        let closure = device_closure(root, &index.children_by_parent);
        (resolve(&closure, &registries, &index), registries)
    }

    #[test]
    fn given_entry_shared_outside_closure_when_resolving_then_entry_kept() {
        let snap = snapshot(
            json!([{"entry_id": "c1", "title": "Zigbee"}]),
            json!([
                {"id": "d1", "name": "Hub", "config_entries": ["c1"]},
                {"id": "d3", "name": "Other", "config_entries": ["c1"]}
            ]),
            json!([]),
        );

        let (plan, _) = plan_for(&snap, "d1");

        assert!(plan.config_entries.is_empty());
        assert_eq!(plan.devices.len(), 1);
    }

    #[test]
    fn given_unregistered_entry_when_resolving_then_not_planned() {
        let snap = snapshot(
            json!([]),
            json!([{"id": "d1", "name": "Hub", "config_entries": ["ghost"]}]),
            json!([]),
        );

        let (plan, _) = plan_for(&snap, "d1");

        assert!(plan.config_entries.is_empty());
    }

    #[test]
    fn given_plan_when_applying_then_input_snapshot_unchanged() {
        let snap = snapshot(
            json!([{"entry_id": "c1", "title": "Zigbee"}]),
            json!([{"id": "d1", "name": "Hub", "config_entries": ["c1"]}]),
            json!([{"id": "e1", "name": "Light", "device_id": "d1"}]),
        );
        let original = snap.clone();
        let (plan, registries) = plan_for(&snap, "d1");

        let pruned = apply(&plan, &snap, &registries);

        assert_eq!(snap, original);
        assert!(pruned.config_entries.records().is_empty());
        assert!(pruned.devices.records().is_empty());
        assert!(pruned.entities.records().is_empty());
    }
}
