//! Chained field value processing.
//!
//! Ranked field definitions are applied in order. Each handler receives the
//! previous handler's output; the first handler reporting itself final ends
//! the chain. Handlers are instantiated lazily, so definitions after the
//! final one are never built.

use serde_json::Value;
use tracing::trace;

use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};

use crate::field::FieldContext;
use crate::handler::FieldHandler;

/// Run `values` through the handlers of `definitions`, in order.
pub fn process_chain<F>(
    definitions: &[Definition],
    values: Value,
    field: &FieldContext,
    mut instantiate: F,
) -> DriverResult<Value>
where
    F: FnMut(&Definition) -> DriverResult<Box<dyn FieldHandler>>,
{
    if definitions.is_empty() {
        return Err(DriverError::no_match(
            "No suitable driver field plugin could be found",
        ));
    }

    let mut current = values;
    for definition in definitions {
        let mut handler = instantiate(definition)?;
        current = handler.process_values(current)?;
        trace!(field = %field.name, plugin = %definition.id, "field handler applied");

        if handler.is_final(field) {
            trace!(field = %field.name, plugin = %definition.id, "field chain finished");
            break;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use assert_matches::assert_matches;
    use serde_json::json;

    use crate::host::FieldInfo;

    /// Appends its id to every string value.
    struct Suffix(Definition);

    impl FieldHandler for Suffix {
        fn definition(&self) -> &Definition {
            &self.0
        }

        fn process_values(&mut self, values: Value) -> DriverResult<Value> {
            let Value::Array(items) = values else {
                return Err(DriverError::ambiguous_input("expected a list"));
            };
            Ok(Value::Array(
                items
                    .into_iter()
                    .map(|v| json!(format!("{}+{}", v.as_str().unwrap_or_default(), self.0.id)))
                    .collect(),
            ))
        }
    }

    fn field() -> FieldContext {
        FieldContext::new(FieldInfo::new("body", "Body", "text"), "node", "article", false)
    }

    fn run(definitions: &[Definition], built: &RefCell<Vec<String>>) -> DriverResult<Value> {
        process_chain(definitions, json!(["x"]), &field(), |d| {
            built.borrow_mut().push(d.id.clone());
            Ok(Box::new(Suffix(d.clone())) as Box<dyn FieldHandler>)
        })
    }

    #[test]
    fn empty_chain_is_no_match() {
        let built = RefCell::new(Vec::new());
        assert_matches!(run(&[], &built), Err(DriverError::NoMatch(msg)) if msg.contains("No suitable"));
    }

    #[test]
    fn handlers_apply_in_order() {
        let built = RefCell::new(Vec::new());
        let defs = [Definition::new("a"), Definition::new("b")];
        assert_eq!(run(&defs, &built).unwrap(), json!(["x+a+b"]));
    }

    #[test]
    fn chain_stops_at_first_final_handler() {
        let built = RefCell::new(Vec::new());
        let defs = [
            Definition::new("a"),
            Definition::new("b").final_(true),
            Definition::new("c"),
        ];
        assert_eq!(run(&defs, &built).unwrap(), json!(["x+a+b"]));
        assert_eq!(*built.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn instantiation_errors_propagate() {
        let out = process_chain(&[Definition::new("broken")], json!([]), &field(), |d| {
            Err(DriverError::instantiation(format!("{} missing", d.id)))
        });
        assert_matches!(out, Err(DriverError::Instantiation(_)));
    }
}
