//! In-memory table of service records, the unit the snapshot backends
//! materialize, mutate and write back.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::StoreError;
use crate::ids::{IdGenerator, MAX_ID_ATTEMPTS};
use crate::record::{authorize, merge_payload, validate_owner, ServiceRecord, StoredService};

/// Records keyed by `service_id`. Key order gives every listing a stable order.
///
/// Deserializing rejects a document that repeats a `service_id` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServiceTable {
    rows: BTreeMap<String, StoredService>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a decoded row; returns `false` (and leaves the table untouched)
    /// when the id is already present.
    pub fn insert_row(&mut self, service_id: String, row: StoredService) -> bool {
        if self.rows.contains_key(&service_id) {
            return false;
        }
        self.rows.insert(service_id, row);
        true
    }

    pub fn rows(&self) -> impl Iterator<Item = (&String, &StoredService)> {
        self.rows.iter()
    }

    pub fn get(&self, service_id: &str) -> Option<ServiceRecord> {
        self.rows
            .get(service_id)
            .map(|row| row.clone().into_record(service_id.to_string()))
    }

    pub fn records(&self, owner_id: Option<&str>) -> Vec<ServiceRecord> {
        self.rows
            .iter()
            .filter(|(_, row)| owner_id.map_or(true, |owner| row.owner_id == owner))
            .map(|(id, row)| row.clone().into_record(id.clone()))
            .collect()
    }

    /// Allocate an unused id and insert the record under it.
    pub fn add(&mut self, owner_id: &str, payload: Value, ids: &dyn IdGenerator) -> Result<String, StoreError> {
        validate_owner(owner_id)?;
        let service_id = self.allocate_id(ids)?;
        self.rows.insert(
            service_id.clone(),
            StoredService { owner_id: owner_id.to_string(), payload },
        );
        Ok(service_id)
    }

    fn allocate_id(&self, ids: &dyn IdGenerator) -> Result<String, StoreError> {
        let mut last_id = String::new();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = ids.next_id();
            if !self.rows.contains_key(&candidate) {
                return Ok(candidate);
            }
            warn!(service_id = %candidate, attempt, "generated service id already taken; regenerating");
            last_id = candidate;
        }
        Err(StoreError::Conflict { attempts: MAX_ID_ATTEMPTS, last_id })
    }

    /// Shallow-merge `partial` into a record the caller owns.
    pub fn update(&mut self, owner_id: &str, service_id: &str, partial: Value) -> Result<(), StoreError> {
        let row = self
            .rows
            .get_mut(service_id)
            .ok_or_else(|| StoreError::not_found(service_id))?;
        authorize(service_id, &row.owner_id, owner_id)?;
        merge_payload(&mut row.payload, partial)
    }

    /// Remove a record the caller owns.
    pub fn remove(&mut self, owner_id: &str, service_id: &str) -> Result<(), StoreError> {
        let row = self
            .rows
            .get(service_id)
            .ok_or_else(|| StoreError::not_found(service_id))?;
        authorize(service_id, &row.owner_id, owner_id)?;
        self.rows.remove(service_id);
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ServiceTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = ServiceTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object keyed by service_id")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut table = ServiceTable::new();
        while let Some((service_id, row)) = map.next_entry::<String, StoredService>()? {
            if !table.insert_row(service_id.clone(), row) {
                return Err(de::Error::custom(format!("duplicate service_id {service_id}")));
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{mock::SequenceIds, UuidGenerator};
    use serde_json::json;

    #[test]
    fn add_regenerates_taken_ids() {
        let mut table = ServiceTable::new();
        let ids = SequenceIds::new(["a", "a", "a", "b"]);
        assert_eq!(table.add("alice", json!({}), &ids).unwrap(), "a");
        assert_eq!(table.add("alice", json!({}), &ids).unwrap(), "b");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn add_gives_up_with_conflict() {
        let mut table = ServiceTable::new();
        table.add("alice", json!({}), &SequenceIds::new(["x"])).unwrap();
        let stuck = SequenceIds::new(std::iter::repeat("x").take(MAX_ID_ATTEMPTS));
        let err = table.add("bob", json!({}), &stuck).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { attempts, ref last_id } if attempts == MAX_ID_ATTEMPTS && last_id == "x"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn add_rejects_blank_owner() {
        let mut table = ServiceTable::new();
        let err = table.add("  ", json!({}), &UuidGenerator).unwrap_err();
        assert!(matches!(err, StoreError::InvalidOwner(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn update_and_remove_enforce_ownership() {
        let mut table = ServiceTable::new();
        let id = table.add("alice", json!({"a": 1, "k": 0}), &UuidGenerator).unwrap();

        assert!(matches!(table.update("bob", &id, json!({"k": 9})), Err(StoreError::Forbidden(_))));
        assert!(matches!(table.remove("bob", &id), Err(StoreError::Forbidden(_))));
        assert_eq!(table.get(&id).unwrap().payload, json!({"a": 1, "k": 0}));

        table.update("alice", &id, json!({"k": 9})).unwrap();
        assert_eq!(table.get(&id).unwrap().payload, json!({"a": 1, "k": 9}));
        assert_eq!(table.get(&id).unwrap().owner_id, "alice");

        table.remove("alice", &id).unwrap();
        assert!(table.get(&id).is_none());
        assert!(matches!(table.remove("alice", &id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn records_filter_by_owner_in_key_order() {
        let mut table = ServiceTable::new();
        let ids = SequenceIds::new(["c", "a", "b"]);
        table.add("alice", json!(1), &ids).unwrap();
        table.add("bob", json!(2), &ids).unwrap();
        table.add("alice", json!(3), &ids).unwrap();

        let all: Vec<_> = table.records(None).into_iter().map(|r| r.service_id).collect();
        assert_eq!(all, ["a", "b", "c"]);
        let alice: Vec<_> = table.records(Some("alice")).into_iter().map(|r| r.service_id).collect();
        assert_eq!(alice, ["b", "c"]);
    }

    #[test]
    fn insert_row_refuses_duplicates() {
        let mut table = ServiceTable::new();
        let row = StoredService { owner_id: "alice".into(), payload: json!({}) };
        assert!(table.insert_row("a".into(), row.clone()));
        assert!(!table.insert_row("a".into(), StoredService { owner_id: "bob".into(), ..row }));
        assert_eq!(table.get("a").unwrap().owner_id, "alice");
    }
}
