//! Built-in field handlers.
//!
//! - `GenericHandler`: catch-all; keys bare values by the main property
//! - `PropertyHandler`: entity properties; values pass through untouched
//! - `DatetimeHandler`: `[start, end]` pairs for fields with an end column
//! - `LinkHandler`: positional `[title, url, options]` input
//! - `CreatedHandler`: creation dates to unix timestamps
//!
//! Version 7 factories wrap the result in `LanguageWrapped` except for
//! property-like handlers.

#![cfg(feature = "builtin")]

use std::rc::Rc;

use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};

use crate::builtin::language::LanguageWrapped;
use crate::context::DriverContext;
use crate::field::FieldContext;
use crate::handler::{into_items, FieldHandler};

pub struct GenericHandler {
    definition: Definition,
}

impl GenericHandler {
    pub fn new(definition: Definition) -> Self {
        Self { definition }
    }
}

impl FieldHandler for GenericHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }
}

/// Entity properties are stored as given.
pub struct PropertyHandler {
    definition: Definition,
}

impl FieldHandler for PropertyHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn process_values(&mut self, values: Value) -> DriverResult<Value> {
        Ok(values)
    }
}

const END_COLUMN: &str = "value2";

pub struct DatetimeHandler {
    definition: Definition,
    has_end: bool,
}

impl DatetimeHandler {
    pub fn new(definition: Definition, field: &FieldContext) -> Self {
        Self {
            definition,
            has_end: field.info.settings.columns.iter().any(|c| c == END_COLUMN),
        }
    }
}

impl FieldHandler for DatetimeHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        if !self.has_end {
            return Ok(value);
        }
        match value {
            Value::Array(items) => match <[Value; 2]>::try_from(items) {
                Ok([start, end]) => Ok(json!({ "value": start, "value2": end })),
                Err(items) => Err(DriverError::ambiguous_input(format!(
                    "Date range expects [start, end], got {} values",
                    items.len()
                ))),
            },
            other => Ok(other),
        }
    }
}

pub struct LinkHandler {
    definition: Definition,
}

impl FieldHandler for LinkHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn main_property(&self) -> &str {
        "url"
    }

    /// Bare values are urls; lists are `[title, url, options]`.
    fn assign_property_names(&self, value: Value) -> DriverResult<Value> {
        let keyed = match value {
            Value::Object(map) => map,
            Value::Array(mut items) if items.len() == 1 => {
                let mut map = Map::new();
                map.insert("url".to_string(), items.remove(0));
                map
            }
            Value::Array(items) => {
                let mut map = Map::new();
                for (key, item) in ["title", "url", "options"].into_iter().zip(items) {
                    map.insert(key.to_string(), item);
                }
                map
            }
            scalar => {
                let mut map = Map::new();
                map.insert("url".to_string(), scalar);
                map
            }
        };

        if keyed.get("url").map_or(true, Value::is_null) {
            return Err(DriverError::ambiguous_input(format!(
                "Url could not be identified from passed value: {}",
                Value::Object(keyed)
            )));
        }
        Ok(Value::Object(keyed))
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        let url = value.get("url").cloned().unwrap_or(Value::Null);
        let title = value
            .get("title")
            .filter(|t| !t.is_null())
            .cloned()
            .unwrap_or_else(|| url.clone());

        let mut out = json!({ "url": url, "title": title });
        if let Some(options) = value.get("options") {
            out["options"] = options.clone();
        }
        Ok(out)
    }
}

/// Converts the first value to a unix timestamp.
pub struct CreatedHandler {
    definition: Definition,
}

impl FieldHandler for CreatedHandler {
    fn definition(&self) -> &Definition {
        &self.definition
    }

    fn process_values(&mut self, values: Value) -> DriverResult<Value> {
        let first = into_items(values).into_iter().next().unwrap_or(Value::Null);
        match first {
            Value::Null | Value::Number(_) => Ok(first),
            Value::String(s) if s.is_empty() || is_numeric(&s) => Ok(Value::String(s)),
            Value::String(s) => parse_timestamp(&s).map(Value::from),
            other => Err(DriverError::ambiguous_input(format!(
                "Cannot interpret {other} as a creation date"
            ))),
        }
    }
}

fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    s.parse::<i64>().is_ok() || s.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Unix timestamp of an RFC 3339 date-time, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`. Zone-less input is UTC.
pub fn parse_timestamp(input: &str) -> DriverResult<i64> {
    let s = input.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt.unix_timestamp());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")) {
        return Ok(dt.assume_utc().unix_timestamp());
    }
    if let Ok(date) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_utc().unix_timestamp());
    }
    Err(DriverError::ambiguous_input(format!(
        "Cannot interpret '{input}' as a date"
    )))
}

pub(crate) fn generic7(definition: &Definition, _: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    let inner = GenericHandler::new(definition.clone());
    Ok(Box::new(LanguageWrapped::new(inner, ctx.config().language.as_str())))
}

pub(crate) fn generic8(definition: &Definition, _: &FieldContext, _: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    Ok(Box::new(GenericHandler::new(definition.clone())))
}

pub(crate) fn property(definition: &Definition, _: &FieldContext, _: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    Ok(Box::new(PropertyHandler {
        definition: definition.clone(),
    }))
}

pub(crate) fn datetime7(definition: &Definition, field: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    let inner = DatetimeHandler::new(definition.clone(), field);
    Ok(Box::new(LanguageWrapped::new(inner, ctx.config().language.as_str())))
}

pub(crate) fn link7(definition: &Definition, _: &FieldContext, ctx: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    let inner = LinkHandler {
        definition: definition.clone(),
    };
    Ok(Box::new(LanguageWrapped::new(inner, ctx.config().language.as_str())))
}

pub(crate) fn created7(definition: &Definition, _: &FieldContext, _: &Rc<DriverContext>) -> DriverResult<Box<dyn FieldHandler>> {
    Ok(Box::new(CreatedHandler {
        definition: definition.clone(),
    }))
}
