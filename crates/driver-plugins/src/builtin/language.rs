//! Language wrapping for version 7 field values.
//!
//! Version 7 hosts store field values per language: `{"und": [...]}`.
//! `LanguageWrapped` adapts any field handler to that shape:
//! - a wrapper left by an earlier handler in the chain is removed first
//! - the inner handler processes the bare value list
//! - the result is wrapped again in the configured language
//!
//! Handlers that write entity properties rather than fields (`_property7`,
//! `created7`) are not wrapped.

#![cfg(feature = "builtin")]

use serde_json::{Map, Value};

use driver_core::definition::Definition;
use driver_core::errors::DriverResult;

use crate::field::FieldContext;
use crate::handler::FieldHandler;

pub struct LanguageWrapped<H> {
    inner: H,
    language: String,
}

impl<H: FieldHandler> LanguageWrapped<H> {
    pub fn new(inner: H, language: impl Into<String>) -> Self {
        Self {
            inner,
            language: language.into(),
        }
    }
}

impl<H: FieldHandler> FieldHandler for LanguageWrapped<H> {
    fn definition(&self) -> &Definition {
        self.inner.definition()
    }

    fn main_property(&self) -> &str {
        self.inner.main_property()
    }

    fn assign_property_names(&self, value: Value) -> DriverResult<Value> {
        self.inner.assign_property_names(value)
    }

    fn process_value(&mut self, value: Value) -> DriverResult<Value> {
        self.inner.process_value(value)
    }

    fn process_values(&mut self, values: Value) -> DriverResult<Value> {
        let values = unwrap_language(values, &self.language);
        let processed = self.inner.process_values(values)?;
        Ok(wrap_language(processed, &self.language))
    }

    fn is_final(&self, field: &FieldContext) -> bool {
        self.inner.is_final(field)
    }
}

/// Remove a `{language: [...]}` wrapper; other shapes pass through.
pub fn unwrap_language(values: Value, language: &str) -> Value {
    match values {
        Value::Object(mut map) if map.get(language).is_some_and(Value::is_array) => {
            map.remove(language).unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn wrap_language(values: Value, language: &str) -> Value {
    let mut map = Map::new();
    map.insert(language.to_string(), values);
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Upper(Definition);

    impl FieldHandler for Upper {
        fn definition(&self) -> &Definition {
            &self.0
        }

        fn process_value(&mut self, value: Value) -> DriverResult<Value> {
            let text = value["value"].as_str().unwrap_or_default().to_uppercase();
            Ok(json!({"value": text}))
        }
    }

    #[test]
    fn wraps_processed_values() {
        let mut h = LanguageWrapped::new(Upper(Definition::new("upper")), "und");
        assert_eq!(h.process_values(json!(["a"])).unwrap(), json!({"und": [{"value": "A"}]}));
    }

    #[test]
    fn earlier_wrapper_is_not_doubled() {
        let mut h = LanguageWrapped::new(Upper(Definition::new("upper")), "und");
        let once = h.process_values(json!(["a", "b"])).unwrap();
        let twice = h.process_values(once).unwrap();
        assert_eq!(twice, json!({"und": [{"value": "A"}, {"value": "B"}]}));
    }

    #[test]
    fn non_list_language_key_is_kept() {
        let v = json!({"und": "x"});
        assert_eq!(unwrap_language(v.clone(), "und"), v);
    }
}
