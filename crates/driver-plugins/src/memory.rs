//! In-memory host.
//!
//! Implements both host seams over plain collections so the driver can be
//! exercised without a CMS. Entities live in a `RefCell` keyed by
//! `(entity_type, id)`; numeric ids are assigned per host, in save order.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use driver_core::errors::{DriverError, DriverResult};

use crate::handler::scalar_text;
use crate::host::{EntityRecord, EntityStorage, EntityTypeInfo, FieldInfo, KeyQuery, SchemaIntrospection};

struct FieldEntry {
    entity_type: String,
    /// `None` = base field, present on every bundle.
    bundle: Option<String>,
    info: FieldInfo,
}

#[derive(Default)]
pub struct InMemoryHost {
    entity_types: Vec<EntityTypeInfo>,
    fields: Vec<FieldEntry>,
    records: RefCell<BTreeMap<(String, String), EntityRecord>>,
    next_id: Cell<u64>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_type(mut self, info: EntityTypeInfo) -> Self {
        self.entity_types.push(info);
        self
    }

    /// Add a field to one bundle, or to every bundle when `bundle` is `None`.
    pub fn with_field(mut self, entity_type: &str, bundle: Option<&str>, info: FieldInfo) -> Self {
        self.fields.push(FieldEntry {
            entity_type: entity_type.to_string(),
            bundle: bundle.map(str::to_string),
            info,
        });
        self
    }

    /// Store a record directly, bypassing any handler. Returns its id.
    pub fn insert(&self, record: EntityRecord) -> DriverResult<String> {
        self.save(&record)
    }

    /// Number of stored entities of a type.
    pub fn count(&self, entity_type: &str) -> usize {
        self.records
            .borrow()
            .keys()
            .filter(|(t, _)| t == entity_type)
            .count()
    }

    fn id_key(&self, entity_type: &str) -> Option<String> {
        self.entity_types
            .iter()
            .find(|t| t.machine_name == entity_type)
            .and_then(|t| t.keys.id.clone())
    }

    fn allocate_id(&self) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id.to_string()
    }
}

impl SchemaIntrospection for InMemoryHost {
    fn entity_types(&self) -> Vec<EntityTypeInfo> {
        self.entity_types.clone()
    }

    fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldInfo> {
        self.fields
            .iter()
            .filter(|f| f.entity_type == entity_type)
            .filter(|f| f.bundle.as_deref().map_or(true, |b| b == bundle))
            .map(|f| f.info.clone())
            .collect()
    }
}

impl EntityStorage for InMemoryHost {
    fn save(&self, record: &EntityRecord) -> DriverResult<String> {
        // Config entities carry their own id in the id key field.
        let given = self
            .id_key(&record.entity_type)
            .and_then(|key| record.fields.get(&key))
            .and_then(scalar_text);
        let id = match record.id.clone().or(given) {
            Some(id) => id,
            None => self.allocate_id(),
        };

        let mut stored = record.clone();
        stored.id = Some(id.clone());
        self.records
            .borrow_mut()
            .insert((record.entity_type.clone(), id.clone()), stored);
        Ok(id)
    }

    fn load(&self, entity_type: &str, id: &str) -> DriverResult<Option<EntityRecord>> {
        Ok(self
            .records
            .borrow()
            .get(&(entity_type.to_string(), id.to_string()))
            .cloned())
    }

    fn delete(&self, entity_type: &str, id: &str) -> DriverResult<()> {
        match self
            .records
            .borrow_mut()
            .remove(&(entity_type.to_string(), id.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(DriverError::host(format!(
                "cannot delete missing '{entity_type}' entity '{id}'"
            ))),
        }
    }

    fn query_by_key(&self, query: &KeyQuery<'_>) -> DriverResult<Option<String>> {
        let id_key = self.id_key(query.entity_type);
        let records = self.records.borrow();

        let hit = records
            .iter()
            .filter(|((t, _), _)| t == query.entity_type)
            .map(|(_, r)| r)
            .filter(|r| {
                query.bundles.is_empty()
                    || r.bundle.as_ref().is_some_and(|b| query.bundles.contains(b))
            })
            .find(|r| {
                if id_key.as_deref() == Some(query.key) {
                    r.id.as_deref() == Some(query.value)
                } else {
                    r.fields
                        .get(query.key)
                        .and_then(scalar_text)
                        .is_some_and(|v| v == query.value)
                }
            });

        Ok(hit.and_then(|r| r.id.clone()))
    }
}
