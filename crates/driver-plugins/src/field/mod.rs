//! Driver field wrapper.
//!
//! A `DriverField` is one field of one entity as a test author wrote it:
//! an identifier (label or machine name) plus raw values. It resolves the
//! identifier against the host schema, then runs the raw values through the
//! matched field handlers (`chain`) on first access.
//!
//! Rules:
//! - a scalar raw value is a one-element list
//! - the bundle defaults to the entity type
//! - identification strips the configured machine-name prefix (`field_`)
//! - processed values are computed once and memoized
//! - config properties that are not sequences yield their single value, not
//!   a list

pub mod chain;

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use driver_core::criteria::{ENTITY_BUNDLES, ENTITY_TYPES, FIELD_NAMES, FIELD_TYPES};
use driver_core::errors::{DriverError, DriverResult};
use driver_core::names::{NameCandidates, NameMatcher};
use driver_core::target::{MatchTarget, TargetDescriptor};

use crate::context::DriverContext;
use crate::handler::into_items;
use crate::host::FieldInfo;

use self::chain::process_chain;

/// Config schema type whose values stay lists.
const SEQUENCE_TYPE: &str = "sequence";

/// The resolved identity of a field; handed to field handler factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    pub name: String,
    pub field_type: String,
    pub entity_type: String,
    pub bundle: String,
    pub info: FieldInfo,
    pub is_config_property: bool,
}

impl FieldContext {
    pub fn new(
        info: FieldInfo,
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        is_config_property: bool,
    ) -> Self {
        Self {
            name: info.machine_name.clone(),
            field_type: info.field_type.clone(),
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            info,
            is_config_property,
        }
    }
}

impl MatchTarget for FieldContext {
    fn target_descriptor(&self) -> TargetDescriptor {
        TargetDescriptor::new()
            .with(FIELD_NAMES, self.name.as_str())
            .with(FIELD_TYPES, self.field_type.as_str())
            .with(ENTITY_TYPES, self.entity_type.as_str())
            .with(ENTITY_BUNDLES, self.bundle.as_str())
    }
}

pub struct DriverField {
    ctx: Rc<DriverContext>,
    field: FieldContext,
    identifier: String,
    raw: Vec<Value>,
    processed: Option<Value>,
}

impl DriverField {
    /// Resolve `identifier` on `entity_type` / `bundle` and wrap `raw`.
    pub fn new(
        ctx: &Rc<DriverContext>,
        raw: Value,
        identifier: &str,
        entity_type: &str,
        bundle: Option<&str>,
    ) -> DriverResult<Self> {
        let bundle = bundle.unwrap_or(entity_type);
        let fields = ctx.schema().fields(entity_type, bundle);

        let candidates: NameCandidates = fields
            .iter()
            .map(|f| (f.display_label().to_string(), f.machine_name.clone()))
            .collect();
        let matcher = NameMatcher::new(candidates).with_prefix(ctx.config().field_prefix.as_str());

        let name = matcher.identify(identifier).ok_or_else(|| {
            DriverError::no_match(format!(
                "Field or property cannot be identified. '{identifier}' does not match anything on '{entity_type}'."
            ))
        })?;
        let info = fields
            .into_iter()
            .find(|f| f.machine_name == name)
            .ok_or_else(|| DriverError::host(format!("field '{name}' vanished from '{entity_type}'")))?;

        let is_config = ctx
            .schema()
            .entity_type(entity_type)
            .is_some_and(|t| t.is_config);

        Ok(Self {
            ctx: Rc::clone(ctx),
            field: FieldContext::new(info, entity_type, bundle, is_config),
            identifier: identifier.to_string(),
            raw: into_items(raw),
            processed: None,
        })
    }

    /// Machine name.
    pub fn name(&self) -> &str {
        &self.field.name
    }

    /// The identifier as originally given.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn label(&self) -> &str {
        self.field.info.display_label()
    }

    pub fn field_type(&self) -> &str {
        &self.field.field_type
    }

    pub fn entity_type(&self) -> &str {
        &self.field.entity_type
    }

    pub fn bundle(&self) -> &str {
        &self.field.bundle
    }

    pub fn info(&self) -> &FieldInfo {
        &self.field.info
    }

    pub fn context(&self) -> &FieldContext {
        &self.field
    }

    pub fn is_config_property(&self) -> bool {
        self.field.is_config_property
    }

    pub fn raw_values(&self) -> &[Value] {
        &self.raw
    }

    /// Values after the field handler chain.
    pub fn processed_values(&mut self) -> DriverResult<Value> {
        let processed = match &self.processed {
            Some(done) => done.clone(),
            None => {
                let done = self.process()?;
                self.processed = Some(done.clone());
                done
            }
        };

        if self.field.is_config_property && self.field.field_type != SEQUENCE_TYPE {
            let mut items = into_items(processed);
            if items.len() > 1 {
                return Err(DriverError::ambiguous_input(format!(
                    "Config properties not of the type sequence should not have array input ('{}').",
                    self.field.name
                )));
            }
            return Ok(items.pop().unwrap_or(Value::Null));
        }
        Ok(processed)
    }

    fn process(&self) -> DriverResult<Value> {
        let plugins = self.ctx.field_plugins();
        let definitions = plugins.matched_definitions(&self.field)?;
        process_chain(&definitions, Value::Array(self.raw.clone()), &self.field, |d| {
            plugins.create_instance(&d.id, &self.field, &self.ctx)
        })
    }
}

impl MatchTarget for DriverField {
    fn target_descriptor(&self) -> TargetDescriptor {
        self.field.target_descriptor()
    }
}

impl fmt::Debug for DriverField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverField")
            .field("field", &self.field)
            .field("identifier", &self.identifier)
            .field("raw", &self.raw)
            .field("processed", &self.processed)
            .finish_non_exhaustive()
    }
}
