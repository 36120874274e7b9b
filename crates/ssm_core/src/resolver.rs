//! Reference resolution between schemas.
//!
//! Resolution is a fixed, one-hop substitution over three places of each
//! data schema, in this order:
//!
//! - `settings[i]`
//! - `blocks[j]`
//! - `blocks[j].settings[k]` (after `blocks[j]` itself was substituted)
//!
//! An entry with a string `from` field is replaced by the value of the
//! schema it names: the result of a callable, or a copy of a data schema's
//! current value. Substituted values are not scanned again, so a data
//! schema that refers to one later in the list receives it unresolved.
//! References are not followed transitively and cycles are not detected.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::SchemaResult;
use crate::schema::{DataSchema, Reference, Registry, BLOCKS_FIELD, SETTINGS_FIELD};

/// Resolves `from` references in place.
pub struct SchemaResolver;

impl SchemaResolver {
    /// Resolve every data schema and return them in load order.
    pub fn resolve(mut registry: Registry) -> SchemaResult<Vec<DataSchema>> {
        Self::resolve_in_place(&mut registry)?;
        Ok(registry.into_data())
    }

    /// Resolve every data schema of a registry in place.
    pub fn resolve_in_place(registry: &mut Registry) -> SchemaResult<()> {
        let mut substituted = 0;

        for index in 0..registry.data().len() {
            debug!("Resolving schema '{}'", registry.data()[index].name);
            substituted += Self::resolve_settings(registry, index)?;
            substituted += Self::resolve_blocks(registry, index)?;
        }

        info!(
            "Resolved {} references across {} data schemas",
            substituted,
            registry.data().len()
        );
        Ok(())
    }

    /// Substitute references in the top-level `settings` of one schema.
    fn resolve_settings(registry: &mut Registry, index: usize) -> SchemaResult<usize> {
        let references: Vec<(usize, Reference)> =
            match registry.data()[index].value.get(SETTINGS_FIELD).and_then(Value::as_array) {
                Some(settings) => settings
                    .iter()
                    .enumerate()
                    .filter_map(|(position, setting)| Reference::parse(setting).map(|r| (position, r)))
                    .collect(),
                None => return Ok(0),
            };

        for (position, reference) in &references {
            let resolved = registry.lookup(&reference.name, &reference.args)?;
            if let Some(slot) = sequence_mut(&mut registry.data_mut()[index].value, SETTINGS_FIELD)
                .and_then(|settings| settings.get_mut(*position))
            {
                *slot = resolved;
            }
        }

        Ok(references.len())
    }

    /// Substitute references in `blocks` and in each block's `settings`.
    fn resolve_blocks(registry: &mut Registry, index: usize) -> SchemaResult<usize> {
        let count = match registry.data()[index].value.get(BLOCKS_FIELD).and_then(Value::as_array) {
            Some(blocks) => blocks.len(),
            None => return Ok(0),
        };

        let mut substituted = 0;
        for position in 0..count {
            let Some(mut block) = registry.data()[index].value[BLOCKS_FIELD].get(position).cloned() else {
                break;
            };

            if let Some(reference) = Reference::parse(&block) {
                block = registry.lookup(&reference.name, &reference.args)?;
                substituted += 1;
            }

            if let Some(settings) = sequence_mut(&mut block, SETTINGS_FIELD) {
                for setting in settings.iter_mut() {
                    if let Some(reference) = Reference::parse(setting) {
                        *setting = registry.lookup(&reference.name, &reference.args)?;
                        substituted += 1;
                    }
                }
            }

            if let Some(slot) = sequence_mut(&mut registry.data_mut()[index].value, BLOCKS_FIELD)
                .and_then(|blocks| blocks.get_mut(position))
            {
                *slot = block;
            }
        }

        Ok(substituted)
    }
}

fn sequence_mut<'a>(value: &'a mut Value, field: &str) -> Option<&'a mut Vec<Value>> {
    value.get_mut(field).and_then(Value::as_array_mut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::error::SchemaError;
    use crate::plugin::MockSchemaFunction;
    use crate::schema::{CallableSchema, SchemaEntry};

    fn registry(data: Vec<(&str, Value)>) -> Registry {
        let mut registry = Registry::new();
        for (name, value) in data {
            registry
                .insert(SchemaEntry::Data(DataSchema::new(name, value)))
                .unwrap();
        }
        registry
    }

    fn add_callable(registry: &mut Registry, name: &str, function: MockSchemaFunction) {
        registry
            .insert(SchemaEntry::Callable(CallableSchema::new(name, Arc::new(function))))
            .unwrap();
    }

    #[test]
    fn test_resolve_without_references_is_identity() {
        let header = json!({
            "name": "Header",
            "settings": [{"type": "text", "id": "title"}],
            "blocks": [{"type": "link", "settings": [{"type": "url", "id": "href"}]}]
        });
        let resolved = SchemaResolver::resolve(registry(vec![("header", header.clone())])).unwrap();
        assert_eq!(resolved[0].value, header);
    }

    #[test]
    fn test_resolve_setting_from_data_schema() {
        let resolved = SchemaResolver::resolve(registry(vec![
            ("header", json!({"settings": [{"type": "text"}, {"from": "colors"}]})),
            ("colors", json!({"value": "red"})),
        ]))
        .unwrap();

        assert_eq!(
            resolved[0].value,
            json!({"settings": [{"type": "text"}, {"value": "red"}]})
        );
        assert_eq!(resolved[1].value, json!({"value": "red"}));
    }

    #[test]
    fn test_resolve_block_and_nested_settings() {
        let resolved = SchemaResolver::resolve(registry(vec![
            (
                "header",
                json!({"blocks": [
                    {"from": "link-block"},
                    {"type": "text", "settings": [{"from": "colors"}, {"id": "plain"}]}
                ]}),
            ),
            ("link-block", json!({"type": "link", "settings": [{"from": "colors"}]})),
            ("colors", json!({"value": "red"})),
        ]))
        .unwrap();

        assert_eq!(
            resolved[0].value,
            json!({"blocks": [
                {"type": "link", "settings": [{"value": "red"}]},
                {"type": "text", "settings": [{"value": "red"}, {"id": "plain"}]}
            ]})
        );
    }

    #[test]
    fn test_resolve_is_one_hop() {
        let resolved = SchemaResolver::resolve(registry(vec![
            ("first", json!({"settings": [{"from": "second"}]})),
            ("second", json!({"settings": [{"from": "third"}]})),
            ("third", json!({"value": 3})),
        ]))
        .unwrap();

        // `second` was not resolved yet when `first` copied it.
        assert_eq!(
            resolved[0].value,
            json!({"settings": [{"settings": [{"from": "third"}]}]})
        );
        assert_eq!(resolved[1].value, json!({"settings": [{"value": 3}]}));
    }

    #[test]
    fn test_resolve_sees_earlier_resolution() {
        let resolved = SchemaResolver::resolve(registry(vec![
            ("third", json!({"value": 3})),
            ("second", json!({"settings": [{"from": "third"}]})),
            ("first", json!({"settings": [{"from": "second"}]})),
        ]))
        .unwrap();

        assert_eq!(
            resolved[2].value,
            json!({"settings": [{"settings": [{"value": 3}]}]})
        );
    }

    #[test]
    fn test_resolve_missing_reference() {
        let result = SchemaResolver::resolve(registry(vec![(
            "header",
            json!({"settings": [{"from": "missing"}]}),
        )]));

        match result {
            Err(SchemaError::ReferenceNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("expected missing reference, got {:?}", other),
        }
    }

    #[test]
    fn test_callable_receives_positional_args() {
        let mut function = MockSchemaFunction::new();
        function
            .expect_invoke()
            .withf(|args: &[Value]| args == [json!(4), json!("px")])
            .times(1)
            .returning(|_| Ok(json!("4px")));

        let mut registry = registry(vec![(
            "header",
            json!({"settings": [{"from": "size", "args": [4, "px"]}]}),
        )]);
        add_callable(&mut registry, "size", function);

        let resolved = SchemaResolver::resolve(registry).unwrap();
        assert_eq!(resolved[0].value, json!({"settings": ["4px"]}));
    }

    #[test]
    fn test_callable_receives_single_arg() {
        let mut function = MockSchemaFunction::new();
        function
            .expect_invoke()
            .withf(|args: &[Value]| args == [json!({"min": 1})])
            .times(1)
            .returning(|_| Ok(json!({"type": "range"})));

        let mut registry = registry(vec![(
            "header",
            json!({"blocks": [{"from": "range", "args": {"min": 1}}]}),
        )]);
        add_callable(&mut registry, "range", function);

        let resolved = SchemaResolver::resolve(registry).unwrap();
        assert_eq!(resolved[0].value, json!({"blocks": [{"type": "range"}]}));
    }

    #[test]
    fn test_callable_without_args() {
        let mut function = MockSchemaFunction::new();
        function
            .expect_invoke()
            .withf(|args: &[Value]| args.is_empty())
            .times(1)
            .returning(|_| Ok(json!("now")));

        let mut registry = registry(vec![(
            "header",
            json!({"blocks": [{"type": "clock", "settings": [{"from": "time"}]}]}),
        )]);
        add_callable(&mut registry, "time", function);

        let resolved = SchemaResolver::resolve(registry).unwrap();
        assert_eq!(
            resolved[0].value,
            json!({"blocks": [{"type": "clock", "settings": ["now"]}]})
        );
    }

    #[test]
    fn test_callable_receives_null_arg() {
        let mut function = MockSchemaFunction::new();
        function
            .expect_invoke()
            .withf(|args: &[Value]| args == [Value::Null])
            .times(1)
            .returning(|_| Ok(json!("none")));

        let mut registry = registry(vec![(
            "header",
            json!({"settings": [{"from": "time", "args": null}]}),
        )]);
        add_callable(&mut registry, "time", function);

        let resolved = SchemaResolver::resolve(registry).unwrap();
        assert_eq!(resolved[0].value, json!({"settings": ["none"]}));
    }

    #[test]
    fn test_callable_shadows_data_schema() {
        let mut function = MockSchemaFunction::new();
        function
            .expect_invoke()
            .times(1)
            .returning(|_| Ok(json!("from callable")));

        let mut registry = registry(vec![
            ("header", json!({"settings": [{"from": "colors"}]})),
            ("colors", json!({"value": "red"})),
        ]);
        add_callable(&mut registry, "colors", function);

        let resolved = SchemaResolver::resolve(registry).unwrap();
        assert_eq!(resolved[0].value, json!({"settings": ["from callable"]}));
    }
}
