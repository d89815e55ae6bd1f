//! Built-in driver plugins.
//!
//! Every built-in is registered for both host versions and tagged with the
//! version it serves; the matcher drops the other version's definitions.
//! Built-ins weigh -100 so project plugins at the default weight outrank
//! them.
//!
//! Handler names (`generic`, `entity_reference`, ...) are what project
//! plugin manifests refer to; see `crate::project`.

#![cfg(feature = "builtin")]

pub mod entity;
pub mod fields;
pub mod language;
pub mod reference;

use driver_core::criteria::{ENTITY_TYPES, FIELD_NAMES, FIELD_TYPES};
use driver_core::definition::Definition;
use driver_core::version::HostVersion;

use crate::registry::{EntityPlugins, FieldPlugins, HandlerFactory, PluginRegistry};

/// Weight of every built-in definition.
pub const BUILTIN_WEIGHT: i32 = -100;

/// Provider declared by built-ins.
pub const BUILTIN_PROVIDER: &str = "driver";

/// Field type of entity properties that are not fields.
pub const PROPERTY_TYPE: &str = "_property";

struct BuiltinField {
    id: &'static str,
    handler: &'static str,
    version: HostVersion,
    filters: &'static [(&'static str, &'static [&'static str])],
    is_final: bool,
    factory: HandlerFactory<FieldPlugins>,
}

const BUILTIN_FIELDS: &[BuiltinField] = &[
    BuiltinField {
        id: "generic7",
        handler: "generic",
        version: HostVersion::V7,
        filters: &[],
        is_final: false,
        factory: fields::generic7,
    },
    BuiltinField {
        id: "generic8",
        handler: "generic",
        version: HostVersion::V8,
        filters: &[],
        is_final: false,
        factory: fields::generic8,
    },
    BuiltinField {
        id: "_property7",
        handler: "property",
        version: HostVersion::V7,
        filters: &[(FIELD_TYPES, &[PROPERTY_TYPE])],
        is_final: true,
        factory: fields::property,
    },
    BuiltinField {
        id: "_property8",
        handler: "property",
        version: HostVersion::V8,
        filters: &[(FIELD_TYPES, &[PROPERTY_TYPE])],
        is_final: true,
        factory: fields::property,
    },
    BuiltinField {
        id: "datetime7",
        handler: "datetime",
        version: HostVersion::V7,
        filters: &[(FIELD_TYPES, &["datetime"])],
        is_final: false,
        factory: fields::datetime7,
    },
    BuiltinField {
        id: "link7",
        handler: "link",
        version: HostVersion::V7,
        filters: &[(FIELD_TYPES, &["link_field"])],
        is_final: false,
        factory: fields::link7,
    },
    BuiltinField {
        id: "created7",
        handler: "created",
        version: HostVersion::V7,
        filters: &[(FIELD_NAMES, &["created"]), (ENTITY_TYPES, &["node", "user"])],
        is_final: true,
        factory: fields::created7,
    },
    BuiltinField {
        id: "taxonomy_term_reference7",
        handler: "taxonomy_term_reference",
        version: HostVersion::V7,
        filters: &[(FIELD_TYPES, &["taxonomy_term_reference"])],
        is_final: false,
        factory: reference::taxonomy_term_reference7,
    },
    BuiltinField {
        id: "entity_reference7",
        handler: "entity_reference",
        version: HostVersion::V7,
        filters: &[(FIELD_TYPES, &["entityreference"])],
        is_final: false,
        factory: reference::entity_reference7,
    },
    BuiltinField {
        id: "entity_reference8",
        handler: "entity_reference",
        version: HostVersion::V8,
        filters: &[(FIELD_TYPES, &["entity_reference"])],
        is_final: false,
        factory: reference::entity_reference8,
    },
];

struct BuiltinEntity {
    id: &'static str,
    handler: &'static str,
    version: HostVersion,
    filters: &'static [(&'static str, &'static [&'static str])],
    factory: HandlerFactory<EntityPlugins>,
}

const BUILTIN_ENTITIES: &[BuiltinEntity] = &[
    BuiltinEntity {
        id: "generic_entity7",
        handler: "generic_entity",
        version: HostVersion::V7,
        filters: &[],
        factory: entity::generic_entity,
    },
    BuiltinEntity {
        id: "generic_entity8",
        handler: "generic_entity",
        version: HostVersion::V8,
        filters: &[],
        factory: entity::generic_entity,
    },
    BuiltinEntity {
        id: "node7",
        handler: "node",
        version: HostVersion::V7,
        filters: &[(ENTITY_TYPES, &["node"])],
        factory: entity::node7,
    },
];

fn builtin_definition(id: &str, version: HostVersion) -> Definition {
    Definition::new(id)
        .weight(BUILTIN_WEIGHT)
        .version(version.major())
        .provider(BUILTIN_PROVIDER)
}

fn with_filters(definition: Definition, filters: &[(&str, &[&str])]) -> Definition {
    filters
        .iter()
        .fold(definition, |def, (name, values)| def.filter(*name, values.iter().copied()))
}

/// Definitions of the built-in field handlers.
pub fn field_definitions() -> Vec<Definition> {
    BUILTIN_FIELDS.iter().map(field_definition).collect()
}

fn field_definition(b: &BuiltinField) -> Definition {
    with_filters(builtin_definition(b.id, b.version).final_(b.is_final), b.filters)
}

/// Definitions of the built-in entity handlers.
pub fn entity_definitions() -> Vec<Definition> {
    BUILTIN_ENTITIES.iter().map(entity_definition).collect()
}

fn entity_definition(b: &BuiltinEntity) -> Definition {
    with_filters(builtin_definition(b.id, b.version), b.filters)
}

/// Register every built-in.
pub fn register_builtins(
    fields: &mut PluginRegistry<FieldPlugins>,
    entities: &mut PluginRegistry<EntityPlugins>,
) -> anyhow::Result<()> {
    for b in BUILTIN_FIELDS {
        fields.register(field_definition(b), b.factory)?;
    }
    for b in BUILTIN_ENTITIES {
        entities.register(entity_definition(b), b.factory)?;
    }
    Ok(())
}

/// Factory of a named field handler for a host version.
pub fn field_factory(handler: &str, version: HostVersion) -> Option<HandlerFactory<FieldPlugins>> {
    BUILTIN_FIELDS
        .iter()
        .find(|b| b.handler == handler && b.version == version)
        .map(|b| b.factory)
}

/// Factory of a named entity handler for a host version.
pub fn entity_factory(handler: &str, version: HostVersion) -> Option<HandlerFactory<EntityPlugins>> {
    BUILTIN_ENTITIES
        .iter()
        .find(|b| b.handler == handler && b.version == version)
        .map(|b| b.factory)
}
