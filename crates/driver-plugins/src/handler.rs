//! Handler capability sets.
//!
//! Matched definitions are turned into handlers by their registry factory.
//! Field handlers turn raw test input into host-ready values; entity handlers
//! wrap one host entity. Both are plain traits: the entity wrapper calls the
//! methods listed here and nothing else.
//!
//! Rules:
//! - default methods implement the common behavior, handlers override only
//!   what differs
//! - handlers never perform plugin discovery themselves except through the
//!   `DriverContext` they were built with

use serde_json::{Map, Value};

use driver_core::definition::Definition;
use driver_core::errors::DriverResult;
use driver_core::names::NameCandidates;

use crate::field::{DriverField, FieldContext};
use crate::host::EntityRecord;

/// Main property of most field types.
pub const DEFAULT_MAIN_PROPERTY: &str = "value";

/// Processes the values of one field.
pub trait FieldHandler {
    fn definition(&self) -> &Definition;

    /// Property a bare scalar is assigned to.
    fn main_property(&self) -> &str {
        DEFAULT_MAIN_PROPERTY
    }

    /// Key one raw value by property name.
    ///
    /// Scalars and one-element lists become `{main: value}`. Objects are
    /// already keyed; longer lists are positional and left to the handler.
    fn assign_property_names(&self, value: Value) -> DriverResult<Value> {
        Ok(assign_main_property(self.main_property(), value))
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        Ok(value)
    }

    /// Process every value of the field.
    fn process_values(&mut self, values: Value) -> DriverResult<Value> {
        let mut out = Vec::new();
        for value in into_items(values) {
            let keyed = self.assign_property_names(value)?;
            out.push(self.process_value(keyed)?);
        }
        Ok(Value::Array(out))
    }

    /// Whether later handlers in the chain are skipped.
    fn is_final(&self, _field: &FieldContext) -> bool {
        self.definition().is_final
    }
}

/// Input for one field of an entity: raw values or a prepared field.
#[derive(Debug)]
pub enum FieldInput {
    Raw(Value),
    Prepared(DriverField),
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        FieldInput::Raw(value)
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Raw(Value::String(value.to_string()))
    }
}

impl From<DriverField> for FieldInput {
    fn from(field: DriverField) -> Self {
        FieldInput::Prepared(field)
    }
}

/// Wraps one host entity.
pub trait EntityHandler {
    fn definition(&self) -> &Definition;

    fn entity_type(&self) -> &str;

    /// Bundle the handler was built for; the entity type when bundleless.
    fn bundle(&self) -> &str;

    fn supports_bundles(&self) -> bool {
        self.bundle_key().is_some()
    }

    fn bundle_key(&self) -> Option<String>;

    /// Names test authors may use for the bundle field.
    fn bundle_key_labels(&self) -> Vec<String>;

    fn bundles(&self) -> NameCandidates;

    fn label_keys(&self) -> Vec<String>;

    fn id_key(&self) -> Option<String>;

    fn id(&self) -> DriverResult<String>;

    fn label(&self) -> DriverResult<String>;

    fn is_new(&self) -> bool;

    /// Attach an existing host entity.
    fn load(&mut self, entity_id: &str) -> DriverResult<&EntityRecord>;

    fn reload(&mut self) -> DriverResult<()>;

    fn save(&mut self) -> DriverResult<()>;

    fn delete(&mut self) -> DriverResult<()>;

    fn set_fields(&mut self, fields: Vec<(String, FieldInput)>) -> DriverResult<()>;

    /// Path of a link relation (`canonical`, `edit-form`, ...).
    fn url(&self, rel: &str) -> DriverResult<String>;

    /// Remove whatever the handler created.
    fn tear_down(&mut self) -> DriverResult<()>;

    /// The attached host entity, if any.
    fn entity(&self) -> Option<&EntityRecord>;
}

/// `{main: value}` for scalars and singletons; everything else unchanged.
pub fn assign_main_property(main: &str, value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Array(mut items) if items.len() == 1 => {
            let only = items.remove(0);
            keyed(main, only)
        }
        Value::Array(_) => value,
        scalar => keyed(main, scalar),
    }
}

fn keyed(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// Lists are value lists; anything else is a single value.
pub fn into_items(values: Value) -> Vec<Value> {
    match values {
        Value::Array(items) => items,
        other => vec![other],
    }
}

const SCALAR_PROPERTIES: [&str; 3] = ["value", "target_id", "tid"];

/// First scalar carried by a processed value, as text.
///
/// Descends into lists (first item), main-property keys and single-key
/// wrappers such as a language key.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        Value::Array(items) => items.first().and_then(scalar_text),
        Value::Object(map) => {
            if let Some(hit) = SCALAR_PROPERTIES.iter().find_map(|k| map.get(*k)) {
                return scalar_text(hit);
            }
            if map.len() == 1 {
                return map.values().next().and_then(scalar_text);
            }
            None
        }
    }
}
