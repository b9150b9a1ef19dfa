//! Device removal service
//!
//! Resolves a device by name or alias and cascades its removal through the
//! three registries. Pure: no I/O, no state kept between calls.

use std::fmt;

use tracing::{debug, info, instrument};

use crate::application::ApplicationResult;
use crate::domain::cascade;
use crate::domain::{
    device_closure, walk_descendants, CrossReferenceIndex, RecordStore, Registries, RegistryRecord,
    RegistrySnapshot, SharedConfigEntry,
};

/// One removed record, rendered as `id - label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub id: String,
    pub label: String,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.id, self.label)
    }
}

/// Result of a successful removal.
#[derive(Debug, Clone)]
pub struct RemovalReport {
    pub target: String,
    pub device_id: String,
    /// Documents with all cascaded records removed
    pub snapshot: RegistrySnapshot,
    pub devices: Vec<SummaryLine>,
    pub config_entries: Vec<SummaryLine>,
    pub entities: Vec<SummaryLine>,
    /// Config entries shared by several devices, before removal
    pub shared_config_entries: Vec<SharedConfigEntry>,
}

#[derive(Debug, Clone)]
pub enum RemovalOutcome {
    Removed(RemovalReport),
    /// No device has this name or alias; the documents are returned as given.
    NotFound {
        target: String,
        snapshot: RegistrySnapshot,
    },
}

/// A device in the removal tree of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    pub id: String,
    pub name: String,
    pub depth: usize,
    pub entity_count: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RemovalService;

impl RemovalService {
    pub fn new() -> Self {
        Self
    }

    /// Remove `target` and everything depending on it.
    #[instrument(level = "debug", skip(self, snapshot))]
    pub fn remove(
        &self,
        snapshot: RegistrySnapshot,
        target: &str,
    ) -> ApplicationResult<RemovalOutcome> {
        let registries = Registries::from_snapshot(&snapshot)?;
        let index = CrossReferenceIndex::build(&registries.devices, &registries.entities);
        let shared_config_entries = index.shared_config_entries();

        let Some(device_id) = index.resolve_target(target).map(str::to_string) else {
            info!("no device named \"{}\"", target);
            return Ok(RemovalOutcome::NotFound {
                target: target.to_string(),
                snapshot,
            });
        };
        debug!("target \"{}\" resolved to {}", target, device_id);

        let closure = device_closure(&device_id, &index.children_by_parent);
        let plan = cascade::resolve(&closure, &registries, &index);
        let pruned = cascade::apply(&plan, &snapshot, &registries);

        Ok(RemovalOutcome::Removed(RemovalReport {
            target: target.to_string(),
            device_id,
            devices: summarize(&registries.devices, &plan.devices),
            config_entries: summarize(&registries.config_entries, &plan.config_entries),
            entities: summarize(&registries.entities, &plan.entities),
            snapshot: pruned,
            shared_config_entries,
        }))
    }

    /// Devices that removing `target` would take with it, without removing
    /// anything.
    #[instrument(level = "debug", skip(self, snapshot))]
    pub fn preview(
        &self,
        snapshot: &RegistrySnapshot,
        target: &str,
    ) -> ApplicationResult<Option<Vec<DeviceNode>>> {
        let registries = Registries::from_snapshot(snapshot)?;
        let index = CrossReferenceIndex::build(&registries.devices, &registries.entities);

        let Some(device_id) = index.resolve_target(target) else {
            return Ok(None);
        };

        let nodes = walk_descendants(device_id, &index.children_by_parent)
            .into_iter()
            .map(|visited| DeviceNode {
                name: registries
                    .devices
                    .get(&visited.id)
                    .map(|d| d.label().to_string())
                    .unwrap_or_default(),
                entity_count: index
                    .entity_ids_by_device
                    .get(&visited.id)
                    .map(|ids| ids.len())
                    .unwrap_or(0),
                depth: visited.depth,
                id: visited.id,
            })
            .collect();
        Ok(Some(nodes))
    }

    /// Config entries referenced by more than one device.
    pub fn shared_config_entries(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> ApplicationResult<Vec<SharedConfigEntry>> {
        let registries = Registries::from_snapshot(snapshot)?;
        let index = CrossReferenceIndex::build(&registries.devices, &registries.entities);
        Ok(index.shared_config_entries())
    }
}

fn summarize<T: RegistryRecord>(
    store: &RecordStore<T>,
    keys: &indexmap::IndexSet<String>,
) -> Vec<SummaryLine> {
    keys.iter()
        .filter_map(|key| store.get(key))
        .map(|record| SummaryLine {
            id: record.key().to_string(),
            label: record.label().to_string(),
        })
        .collect()
}
