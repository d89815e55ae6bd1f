//! Generic storage-backed entity handler.
//!
//! Works for any entity type the schema describes. Field inputs are
//! resolved and processed as `DriverField`s and stored on an
//! `EntityRecord`; persistence goes through `EntityStorage`.
//!
//! `node7` is the same handler with the legacy node keys pinned, so nodes
//! keep `nid`/`title` even when the schema leaves the keys out.

#![cfg(feature = "builtin")]

use std::rc::Rc;

use serde_json::Value;

use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};
use driver_core::names::NameCandidates;

use crate::context::DriverContext;
use crate::entity::EntityHandlerConfig;
use crate::field::DriverField;
use crate::handler::{scalar_text, EntityHandler, FieldInput};
use crate::host::{EntityRecord, EntityTypeInfo};

pub struct GenericEntityHandler {
    definition: Definition,
    ctx: Rc<DriverContext>,
    info: EntityTypeInfo,
    bundle: String,
    record: Option<EntityRecord>,
    is_new: bool,
}

impl GenericEntityHandler {
    pub fn new(definition: Definition, config: &EntityHandlerConfig, ctx: &Rc<DriverContext>) -> DriverResult<Self> {
        let info = ctx.schema().entity_type(&config.entity_type).ok_or_else(|| {
            DriverError::instantiation(format!(
                "DriverEntity plugin '{}' cannot handle unknown entity type '{}'",
                definition.id, config.entity_type
            ))
        })?;
        Ok(Self {
            definition,
            ctx: Rc::clone(ctx),
            info,
            bundle: config.bundle.clone(),
            record: None,
            is_new: true,
        })
    }

    /// Override the id and label keys reported by the schema.
    pub fn with_keys(mut self, id: &str, label: &str) -> Self {
        self.info.keys.id = Some(id.to_string());
        self.info.keys.label = Some(label.to_string());
        self
    }

    fn record(&self) -> DriverResult<&EntityRecord> {
        self.record
            .as_ref()
            .ok_or_else(|| DriverError::invalid_state("No entity is attached to this plugin"))
    }

    fn saved_id(&self) -> DriverResult<String> {
        self.record()?
            .id
            .clone()
            .ok_or_else(|| DriverError::invalid_state("Entity has not been saved yet"))
    }

    fn new_record(&self) -> EntityRecord {
        let bundle = self.supports_bundles().then(|| self.bundle.clone());
        let mut record = EntityRecord::new(self.info.machine_name.clone(), bundle.clone());
        if let (Some(key), Some(bundle)) = (self.bundle_key(), bundle) {
            record.fields.insert(key, Value::String(bundle));
        }
        record
    }

    fn load_record(&self, entity_id: &str) -> DriverResult<EntityRecord> {
        self.ctx
            .storage()
            .load(&self.info.machine_name, entity_id)?
            .ok_or_else(|| {
                DriverError::no_match(format!(
                    "No '{}' entity with id '{entity_id}' exists.",
                    self.info.machine_name
                ))
            })
    }
}

impl EntityHandler for GenericEntityHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn entity_type(&self) -> &str {
        &self.info.machine_name
    }

    fn bundle(&self) -> &str {
        &self.bundle
    }

    fn bundle_key(&self) -> Option<String> {
        self.info.keys.bundle.clone().filter(|k| !k.is_empty())
    }

    /// The bundle key itself plus the label of the field storing it.
    fn bundle_key_labels(&self) -> Vec<String> {
        let Some(key) = self.bundle_key() else {
            return Vec::new();
        };
        let mut labels = self
            .ctx
            .schema()
            .fields(&self.info.machine_name, &self.bundle)
            .into_iter()
            .filter(|f| f.machine_name == key && !f.label.trim().is_empty())
            .map(|f| f.label)
            .collect::<Vec<_>>();
        labels.push(key);
        labels
    }

    fn bundles(&self) -> NameCandidates {
        self.info.bundle_candidates()
    }

    fn label_keys(&self) -> Vec<String> {
        self.info.keys.label.iter().cloned().collect()
    }

    fn id_key(&self) -> Option<String> {
        self.info.keys.id.clone()
    }

    fn id(&self) -> DriverResult<String> {
        self.saved_id()
    }

    fn label(&self) -> DriverResult<String> {
        let record = self.record()?;
        self.label_keys()
            .iter()
            .find_map(|key| record.fields.get(key).and_then(scalar_text))
            .ok_or_else(|| {
                DriverError::no_match(format!(
                    "'{}' entity has no label value",
                    self.info.machine_name
                ))
            })
    }

    fn is_new(&self) -> bool {
        self.record.is_none() || self.is_new
    }

    fn load(&mut self, entity_id: &str) -> DriverResult<&EntityRecord> {
        if self.record.is_some() {
            return Err(DriverError::invalid_state(
                "A host entity is already attached to this plugin",
            ));
        }
        let record = self.load_record(entity_id)?;
        self.is_new = false;
        Ok(&*self.record.insert(record))
    }

    fn reload(&mut self) -> DriverResult<()> {
        let id = match self.record.as_ref().and_then(|r| r.id.clone()) {
            Some(id) => id,
            None => {
                return Err(DriverError::invalid_state(
                    "There is no attached entity so it cannot be reloaded",
                ))
            }
        };
        self.record = Some(self.load_record(&id)?);
        Ok(())
    }

    fn save(&mut self) -> DriverResult<()> {
        let id = self.ctx.storage().save(self.record()?)?;
        if let Some(record) = self.record.as_mut() {
            record.id = Some(id);
        }
        self.is_new = false;
        Ok(())
    }

    fn delete(&mut self) -> DriverResult<()> {
        let id = self.saved_id()?;
        self.ctx.storage().delete(&self.info.machine_name, &id)?;
        self.is_new = true;
        if let Some(record) = self.record.as_mut() {
            record.id = None;
        }
        Ok(())
    }

    fn set_fields(&mut self, fields: Vec<(String, FieldInput)>) -> DriverResult<()> {
        let mut values = Vec::with_capacity(fields.len());
        for (identifier, input) in fields {
            let mut field = match input {
                FieldInput::Prepared(field) => field,
                FieldInput::Raw(values) => DriverField::new(
                    &self.ctx,
                    values,
                    &identifier,
                    &self.info.machine_name,
                    Some(&self.bundle),
                )?,
            };
            values.push((field.name().to_string(), field.processed_values()?));
        }

        if self.record.is_none() {
            self.record = Some(self.new_record());
        }
        if let Some(record) = self.record.as_mut() {
            record.fields.extend(values);
        }
        Ok(())
    }

    fn url(&self, rel: &str) -> DriverResult<String> {
        let id = self.saved_id()?;
        let base = format!("/{}/{id}", self.info.machine_name);
        match rel {
            "canonical" => Ok(base),
            "edit-form" => Ok(format!("{base}/edit")),
            "delete-form" => Ok(format!("{base}/delete")),
            other => Err(DriverError::no_match(format!(
                "'{}' entities have no '{other}' link",
                self.info.machine_name
            ))),
        }
    }

    fn tear_down(&mut self) -> DriverResult<()> {
        if self.record.as_ref().is_some_and(|r| r.id.is_some()) {
            self.delete()?;
        }
        Ok(())
    }

    fn entity(&self) -> Option<&EntityRecord> {
        self.record.as_ref()
    }
}

pub(crate) fn generic_entity(
    definition: &Definition,
    config: &EntityHandlerConfig,
    ctx: &Rc<DriverContext>,
) -> DriverResult<Box<dyn EntityHandler>> {
    Ok(Box::new(GenericEntityHandler::new(definition.clone(), config, ctx)?))
}

pub(crate) fn node7(
    definition: &Definition,
    config: &EntityHandlerConfig,
    ctx: &Rc<DriverContext>,
) -> DriverResult<Box<dyn EntityHandler>> {
    let handler = GenericEntityHandler::new(definition.clone(), config, ctx)?.with_keys("nid", "title");
    Ok(Box::new(handler))
}
