//! Indexed record collections.
//!
//! A store keeps the raw records in document order next to their typed
//! views and a key → position index. Removal never touches the input; it
//! produces a fresh sequence of the surviving raw records.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::instrument;

use crate::domain::entities::{
    ConfigEntry, Device, Entity, RegistryDocument, RegistryRecord, RegistrySnapshot,
};
use crate::domain::error::{DomainError, DomainResult};

/// Map every record's key to its position.
///
/// Fails on the first key seen twice instead of letting the later record
/// shadow the earlier one.
pub fn build_index<R, K, F>(
    collection: &str,
    records: &[R],
    key_of: F,
) -> DomainResult<IndexMap<K, usize>>
where
    K: Hash + Eq + ToString,
    F: Fn(&R) -> K,
{
    let mut index = IndexMap::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let key = key_of(record);
        if index.contains_key(&key) {
            return Err(DomainError::DuplicateKey {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }
        index.insert(key, position);
    }
    Ok(index)
}

/// Every record whose key is not in `keys`, in original order.
///
/// Keys missing from `index` are ignored.
pub fn remove_by_keys<R, K>(records: &[R], keys: &IndexSet<K>, index: &IndexMap<K, usize>) -> Vec<R>
where
    R: Clone,
    K: Hash + Eq,
{
    let doomed: IndexSet<usize> = keys.iter().filter_map(|k| index.get(k).copied()).collect();
    records
        .iter()
        .enumerate()
        .filter(|(position, _)| !doomed.contains(position))
        .map(|(_, record)| record.clone())
        .collect()
}

/// Raw records of one registry together with typed views and a key index.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    raw: Vec<Value>,
    items: Vec<T>,
    index: IndexMap<String, usize>,
}

impl<T: RegistryRecord> RecordStore<T> {
    #[instrument(level = "debug", skip(document), fields(kind = %document.kind()))]
    pub fn from_document(document: &RegistryDocument) -> DomainResult<Self> {
        let raw = document.records().to_vec();
        let items = raw
            .iter()
            .enumerate()
            .map(|(position, value)| T::from_raw(value, position))
            .collect::<DomainResult<Vec<T>>>()?;
        let index = build_index(T::KIND.collection(), &items, |item| item.key().to_string())?;
        tracing::debug!("indexed {} records", items.len());
        Ok(Self { raw, items, index })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.items[position])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Raw records that survive removal of `keys`.
    pub fn without_keys(&self, keys: &IndexSet<String>) -> Vec<Value> {
        remove_by_keys(&self.raw, keys, &self.index)
    }
}

/// Indexed views over all three registries of a snapshot.
#[derive(Debug, Clone)]
pub struct Registries {
    pub config_entries: RecordStore<ConfigEntry>,
    pub devices: RecordStore<Device>,
    pub entities: RecordStore<Entity>,
}

impl Registries {
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> DomainResult<Self> {
        Ok(Self {
            config_entries: RecordStore::from_document(&snapshot.config_entries)?,
            devices: RecordStore::from_document(&snapshot.devices)?,
            entities: RecordStore::from_document(&snapshot.entities)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_unique_keys_when_indexing_then_maps_positions() {
        let records = vec!["a", "b", "c"];
        let index = build_index("letters", &records, |r| r.to_string()).unwrap();
        assert_eq!(index.get("b"), Some(&1));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn given_repeated_key_when_indexing_then_duplicate_key_error() {
        let records = vec!["a", "b", "a"];
        let err = build_index("letters", &records, |r| r.to_string()).unwrap_err();
        assert_eq!(
            err,
            DomainError::DuplicateKey {
                collection: "letters".into(),
                key: "a".into()
            }
        );
    }

    #[test]
    fn given_keys_when_removing_then_preserves_order_and_input() {
        let records = vec!["a", "b", "c", "d"];
        let index = build_index("letters", &records, |r| r.to_string()).unwrap();
        let keys: IndexSet<String> = ["c", "a", "zz"].iter().map(|s| s.to_string()).collect();

        let survivors = remove_by_keys(&records, &keys, &index);

        assert_eq!(survivors, vec!["b", "d"]);
        assert_eq!(records.len(), 4);
    }
}
