//! driver-plugins
//!
//! The host-facing half of the entity driver:
//! - Host seams (`SchemaIntrospection`, `EntityStorage`) and an in-memory host
//! - Per-plugin-type definition registries and bound matchers
//! - Field and entity handler capability sets
//! - `DriverField` and `DriverEntity`, the wrappers test steps work with
//! - Built-in handlers and JSON project plugins (feature `builtin`)
//!
//! A `DriverContext` ties these together and is passed explicitly; there is
//! no global registry.

pub mod context;
pub mod entity;
pub mod field;
pub mod handler;
pub mod host;
pub mod matcher;
pub mod memory;
pub mod registry;
pub mod spec;

#[cfg(feature = "builtin")]
pub mod builtin;
#[cfg(feature = "builtin")]
pub mod project;

pub use driver_core::{DriverError, DriverResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::context::{DriverContext, DriverContextBuilder};
    pub use crate::entity::{DriverEntity, EntityHandlerConfig};
    pub use crate::field::{DriverField, FieldContext};
    pub use crate::handler::{EntityHandler, FieldHandler, FieldInput};
    pub use crate::host::{
        EntityRecord, EntityStorage, EntityTypeInfo, FieldInfo, KeyQuery, SchemaIntrospection,
    };
    pub use crate::memory::InMemoryHost;
    pub use crate::registry::{EntityPlugins, FieldPlugins, PluginRegistry, PluginType};
    pub use driver_core::config::DriverConfig;
    pub use driver_core::definition::Definition;
    pub use driver_core::version::HostVersion;
    pub use driver_core::{DriverError, DriverResult};
}
