//! Reference field handlers.
//!
//! Reference fields point at other entities. Test authors name the target by
//! id or label; the handlers turn that into the target's id.
//!
//! Resolution (`resolve_reference`) tries, in order, and stops at the first
//! hit:
//! 1. id key = identifier
//! 2. each label key = identifier
//! 3. id key = identifier with spaces replaced by `_` (config entity ids)
//!
//! Strategies whose key is unknown are skipped. Storage access goes through
//! `ReferenceLookup` so the algorithm stays independent of how a host
//! version queries entities.

#![cfg(feature = "builtin")]

use std::rc::Rc;

use serde_json::{Map, Value};

use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};

use crate::builtin::language::LanguageWrapped;
use crate::context::DriverContext;
use crate::entity::EntityHandlerConfig;
use crate::field::FieldContext;
use crate::handler::FieldHandler;
use crate::host::{EntityStorage, KeyQuery};

const TERM_ENTITY_TYPE: &str = "taxonomy_term";

/// Storage queries needed to resolve a reference.
pub trait ReferenceLookup {
    /// Entity type being referenced.
    fn entity_type(&self) -> &str;

    /// Id of the first target whose `key` equals `value`.
    fn query_by_key(&self, key: &str, value: &str) -> DriverResult<Option<String>>;

    /// Bundles targets are restricted to; empty = any.
    fn target_bundles(&self) -> &[String];
}

/// `ReferenceLookup` over the host's `EntityStorage`.
pub struct StorageLookup {
    storage: Rc<dyn EntityStorage>,
    entity_type: String,
    target_bundles: Vec<String>,
}

impl StorageLookup {
    /// `target_bundles` only restrict queries when the target type has a
    /// bundle key; pass an empty list otherwise.
    pub fn new(storage: Rc<dyn EntityStorage>, entity_type: impl Into<String>, target_bundles: Vec<String>) -> Self {
        Self {
            storage,
            entity_type: entity_type.into(),
            target_bundles,
        }
    }
}

impl ReferenceLookup for StorageLookup {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn query_by_key(&self, key: &str, value: &str) -> DriverResult<Option<String>> {
        self.storage.query_by_key(&KeyQuery {
            entity_type: &self.entity_type,
            key,
            value,
            bundles: self.target_bundles(),
        })
    }

    fn target_bundles(&self) -> &[String] {
        &self.target_bundles
    }
}

/// Keys a target can be matched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceKeys {
    pub id_key: Option<String>,
    pub label_keys: Vec<String>,
}

/// Resolve a target identifier to a target id.
pub fn resolve_reference(identifier: &Value, keys: &ReferenceKeys, lookup: &dyn ReferenceLookup) -> DriverResult<String> {
    let text = identifier_text(identifier)?;

    let id_key = keys.id_key.as_deref();
    let mut strategies: Vec<(Option<&str>, String)> = vec![(id_key, text.clone())];
    strategies.extend(keys.label_keys.iter().map(|k| (Some(k.as_str()), text.clone())));
    strategies.push((id_key, text.replace(' ', "_")));

    for (key, value) in strategies {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            continue;
        };
        if let Some(id) = lookup.query_by_key(key, &value)? {
            return Ok(id);
        }
    }

    Err(DriverError::no_match(format!(
        "No entity of type '{}' has id or label matching '{text}'.",
        lookup.entity_type()
    )))
}

fn identifier_text(identifier: &Value) -> DriverResult<String> {
    match identifier {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(_) | Value::Object(_) => Err(DriverError::ambiguous_input(format!(
            "Array value not expected: {identifier}"
        ))),
        other => Err(DriverError::ambiguous_input(format!(
            "Reference target cannot be identified by {other}"
        ))),
    }
}

fn main_identifier<'a>(value: &'a Value, main: &str) -> DriverResult<&'a Value> {
    value.get(main).ok_or_else(|| {
        DriverError::ambiguous_input(format!("Reference value has no '{main}' property: {value}"))
    })
}

fn keyed(main: &str, id: String) -> Value {
    let mut map = Map::new();
    map.insert(main.to_string(), Value::String(id));
    Value::Object(map)
}

/// Label keys of the lookup's target type, from the entity handler matched
/// for it.
///
/// The handler is bundle-specific only when the lookup is restricted to
/// exactly one bundle.
fn target_label_keys(ctx: &Rc<DriverContext>, lookup: &dyn ReferenceLookup) -> DriverResult<Vec<String>> {
    let bundle = match lookup.target_bundles() {
        [only] => only.clone(),
        _ => lookup.entity_type().to_string(),
    };
    let config = EntityHandlerConfig {
        entity_type: lookup.entity_type().to_string(),
        bundle,
    };
    let handler = ctx.entity_plugins().top_instance(&config, &config, ctx)?;
    Ok(handler.label_keys())
}

pub struct EntityReferenceHandler {
    definition: Definition,
    keys: ReferenceKeys,
    lookup: StorageLookup,
}

impl EntityReferenceHandler {
    pub fn new(definition: Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Self> {
        let settings = &field.info.settings;
        let target_type = settings.target_type.clone().ok_or_else(|| {
            DriverError::instantiation(format!("Reference field '{}' declares no target type", field.name))
        })?;
        let info = ctx.schema().entity_type(&target_type).ok_or_else(|| {
            DriverError::instantiation(format!(
                "Reference field '{}' targets unknown entity type '{target_type}'",
                field.name
            ))
        })?;

        let restriction = if info.keys.bundle.is_some() {
            settings.target_bundles.clone()
        } else {
            Vec::new()
        };
        let lookup = StorageLookup::new(Rc::clone(ctx.storage()), target_type, restriction);
        let label_keys = target_label_keys(ctx, &lookup)?;

        Ok(Self {
            definition,
            keys: ReferenceKeys {
                id_key: info.keys.id,
                label_keys,
            },
            lookup,
        })
    }

    pub fn keys(&self) -> &ReferenceKeys {
        &self.keys
    }
}

impl FieldHandler for EntityReferenceHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn main_property(&self) -> &str {
        "target_id"
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        let main = self.main_property();
        let identifier = main_identifier(&value, main)?;
        let id = resolve_reference(identifier, &self.keys, &self.lookup)?;
        Ok(keyed(main, id))
    }
}

/// Legacy term references: terms are found by name within the vocabulary.
pub struct TaxonomyTermReferenceHandler {
    definition: Definition,
    label_key: String,
    lookup: StorageLookup,
}

impl TaxonomyTermReferenceHandler {
    pub fn new(definition: Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Self> {
        let info = ctx.schema().entity_type(TERM_ENTITY_TYPE);
        let has_bundles = info.as_ref().is_some_and(|i| i.keys.bundle.is_some());
        let label_key = info
            .and_then(|i| i.keys.label)
            .unwrap_or_else(|| "name".to_string());

        let vocabularies = match &field.info.settings.vocabulary {
            Some(vocabulary) if has_bundles => vec![vocabulary.clone()],
            _ => Vec::new(),
        };

        Ok(Self {
            definition,
            label_key,
            lookup: StorageLookup::new(Rc::clone(ctx.storage()), TERM_ENTITY_TYPE, vocabularies),
        })
    }
}

impl FieldHandler for TaxonomyTermReferenceHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn main_property(&self) -> &str {
        "tid"
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        let main = self.main_property();
        let name = identifier_text(main_identifier(&value, main)?)?;
        let tid = self
            .lookup
            .query_by_key(&self.label_key, &name)?
            .ok_or_else(|| DriverError::no_match(format!("No term '{name}' exists.")))?;
        Ok(keyed(main, tid))
    }
}

pub(crate) fn entity_reference7(definition: &Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    let inner = EntityReferenceHandler::new(definition.clone(), field, ctx)?;
    Ok(Box::new(LanguageWrapped::new(inner, ctx.config().language.as_str())))
}

pub(crate) fn entity_reference8(definition: &Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    Ok(Box::new(EntityReferenceHandler::new(definition.clone(), field, ctx)?))
}

pub(crate) fn taxonomy_term_reference7(definition: &Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    let inner = TaxonomyTermReferenceHandler::new(definition.clone(), field, ctx)?;
    Ok(Box::new(LanguageWrapped::new(inner, ctx.config().language.as_str())))
}
