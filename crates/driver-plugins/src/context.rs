//! Driver context.
//!
//! Everything the wrappers and handlers need is reached through one
//! `DriverContext`, passed explicitly as `Rc<DriverContext>`:
//! - configuration and host version
//! - host schema introspection and entity storage
//! - the field and entity plugin matchers
//!
//! Contexts are built once per test run by `DriverContextBuilder`, which
//! registers the built-in handlers (feature `builtin`) and any project
//! plugins found under `project_plugin_root`. Registries are frozen after
//! `build`; make a new context to change them.

use std::fmt;
use std::rc::Rc;

use anyhow::Context as _;
use tracing::debug;

use driver_core::config::{validate_config, DriverConfig};
use driver_core::definition::Definition;
use driver_core::version::HostVersion;

use crate::host::{EntityStorage, SchemaIntrospection};
use crate::matcher::DriverPluginMatcher;
use crate::registry::{EntityPlugins, FieldPlugins, HandlerFactory, PluginRegistry};

pub struct DriverContext {
    config: DriverConfig,
    version: HostVersion,
    schema: Rc<dyn SchemaIntrospection>,
    storage: Rc<dyn EntityStorage>,
    fields: DriverPluginMatcher<FieldPlugins>,
    entities: DriverPluginMatcher<EntityPlugins>,
}

impl DriverContext {
    pub fn builder(
        config: DriverConfig,
        schema: Rc<dyn SchemaIntrospection>,
        storage: Rc<dyn EntityStorage>,
    ) -> DriverContextBuilder {
        DriverContextBuilder::new(config, schema, storage)
    }

    /// Builder for a host implementing both seams.
    pub fn for_host<H>(config: DriverConfig, host: Rc<H>) -> DriverContextBuilder
    where
        H: SchemaIntrospection + EntityStorage + 'static,
    {
        let schema: Rc<dyn SchemaIntrospection> = host.clone();
        let storage: Rc<dyn EntityStorage> = host;
        DriverContextBuilder::new(config, schema, storage)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn version(&self) -> HostVersion {
        self.version
    }

    pub fn schema(&self) -> &dyn SchemaIntrospection {
        self.schema.as_ref()
    }

    pub fn storage(&self) -> &Rc<dyn EntityStorage> {
        &self.storage
    }

    pub fn field_plugins(&self) -> &DriverPluginMatcher<FieldPlugins> {
        &self.fields
    }

    pub fn entity_plugins(&self) -> &DriverPluginMatcher<EntityPlugins> {
        &self.entities
    }
}

impl fmt::Debug for DriverContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverContext")
            .field("version", &self.version)
            .field("field_plugins", &self.fields.registry().len())
            .field("entity_plugins", &self.entities.registry().len())
            .finish_non_exhaustive()
    }
}

pub struct DriverContextBuilder {
    config: DriverConfig,
    schema: Rc<dyn SchemaIntrospection>,
    storage: Rc<dyn EntityStorage>,
    field_registry: PluginRegistry<FieldPlugins>,
    entity_registry: PluginRegistry<EntityPlugins>,
    builtins: bool,
}

impl DriverContextBuilder {
    fn new(config: DriverConfig, schema: Rc<dyn SchemaIntrospection>, storage: Rc<dyn EntityStorage>) -> Self {
        Self {
            field_registry: PluginRegistry::with_providers(&config),
            entity_registry: PluginRegistry::with_providers(&config),
            config,
            schema,
            storage,
            builtins: cfg!(feature = "builtin"),
        }
    }

    /// Skip the built-in handlers; only explicitly registered plugins apply.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    pub fn register_field(&mut self, definition: Definition, factory: HandlerFactory<FieldPlugins>) -> anyhow::Result<()> {
        self.field_registry.register(definition, factory)
    }

    pub fn register_entity(&mut self, definition: Definition, factory: HandlerFactory<EntityPlugins>) -> anyhow::Result<()> {
        self.entity_registry.register(definition, factory)
    }

    pub fn build(mut self) -> anyhow::Result<Rc<DriverContext>> {
        validate_config(&self.config).context("invalid driver configuration")?;
        let version = self.config.host_version()?;

        if self.builtins {
            self.register_builtins()?;
        }

        if let Some(root) = self.config.project_plugin_root.clone() {
            self.load_project_plugins(&root)?;
        }

        debug!(
            version = version.major(),
            legacy = version.is_legacy(),
            field_plugins = self.field_registry.len(),
            entity_plugins = self.entity_registry.len(),
            "driver context built"
        );

        let fields = DriverPluginMatcher::new(Rc::new(self.field_registry), version.major())?;
        let entities = DriverPluginMatcher::new(Rc::new(self.entity_registry), version.major())?;

        Ok(Rc::new(DriverContext {
            config: self.config,
            version,
            schema: self.schema,
            storage: self.storage,
            fields,
            entities,
        }))
    }

    #[cfg(feature = "builtin")]
    fn register_builtins(&mut self) -> anyhow::Result<()> {
        crate::builtin::register_builtins(&mut self.field_registry, &mut self.entity_registry)
    }

    #[cfg(not(feature = "builtin"))]
    fn register_builtins(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    #[cfg(feature = "builtin")]
    fn load_project_plugins(&mut self, root: &std::path::Path) -> anyhow::Result<()> {
        let version = self.config.host_version()?;
        crate::project::load_project_plugins(root, version, &mut self.field_registry, &mut self.entity_registry)
            .with_context(|| format!("loading project plugins from {}", root.display()))?;
        Ok(())
    }

    #[cfg(not(feature = "builtin"))]
    fn load_project_plugins(&mut self, root: &std::path::Path) -> anyhow::Result<()> {
        anyhow::bail!(
            "project plugins in {} need the `builtin` feature to bind handlers",
            root.display()
        )
    }
}
