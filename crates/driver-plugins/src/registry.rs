//! Definition registry for driver plugins.
//!
//! One registry per plugin type. A plugin type (`PluginType`) fixes:
//! - the handler trait object its factories build
//! - the configuration handed to factories
//! - the matcher profile used to filter and rank its definitions
//! - the namespace its definitions live under
//!
//! Requirements:
//! - stable ordering for lookups and iteration (`BTreeMap` by id)
//! - duplicate ids rejected at registration
//! - definitions of inactive providers are invisible to matching
//! - no global mutable state
//!
//! The registry does not decide which plugin applies to a target; that is
//! the matcher's job. It only stores definitions and builds instances.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use driver_core::config::DriverConfig;
use driver_core::criteria::{MatcherProfile, ENTITY_PLUGIN_TYPE, FIELD_PLUGIN_TYPE};
use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};
use driver_core::matcher::DefinitionSource;

use crate::context::DriverContext;
use crate::entity::EntityHandlerConfig;
use crate::field::FieldContext;
use crate::handler::{EntityHandler, FieldHandler};

/// A family of plugins sharing one handler trait and one matcher profile.
pub trait PluginType: 'static {
    type Handler: ?Sized + 'static;
    type Config: 'static;

    const NAME: &'static str;
    const NAMESPACE: &'static str;

    fn profile() -> MatcherProfile;
}

/// Field value handlers.
pub struct FieldPlugins;

impl PluginType for FieldPlugins {
    type Handler = dyn FieldHandler;
    type Config = FieldContext;

    const NAME: &'static str = FIELD_PLUGIN_TYPE;
    const NAMESPACE: &'static str = "driver_field_plugins";

    fn profile() -> MatcherProfile {
        MatcherProfile::field()
    }
}

/// Entity handlers.
pub struct EntityPlugins;

impl PluginType for EntityPlugins {
    type Handler = dyn EntityHandler;
    type Config = EntityHandlerConfig;

    const NAME: &'static str = ENTITY_PLUGIN_TYPE;
    const NAMESPACE: &'static str = "driver_entity_plugins";

    fn profile() -> MatcherProfile {
        MatcherProfile::entity()
    }
}

/// Builds a handler for a matched definition.
pub type HandlerFactory<P> = fn(
    &Definition,
    &<P as PluginType>::Config,
    &Rc<DriverContext>,
) -> DriverResult<Box<<P as PluginType>::Handler>>;

/// A definition plus the factory building its handler.
pub struct RegisteredPlugin<P: PluginType> {
    pub definition: Definition,
    pub factory: HandlerFactory<P>,
}

/// Definitions of one plugin type keyed by id.
pub struct PluginRegistry<P: PluginType> {
    plugins: BTreeMap<String, RegisteredPlugin<P>>,
    providers: DriverConfig,
}

impl<P: PluginType> Default for PluginRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PluginType> PluginRegistry<P> {
    /// Create an empty registry with the default provider rules.
    pub fn new() -> Self {
        Self::with_providers(&DriverConfig::default())
    }

    /// Create an empty registry using the config's provider sets.
    pub fn with_providers(config: &DriverConfig) -> Self {
        Self {
            plugins: BTreeMap::new(),
            providers: config.clone(),
        }
    }

    /// Number of registered plugins, active or not.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register a definition with its factory.
    ///
    /// Registration order does not affect matching: storage is ordered by id.
    pub fn register(&mut self, definition: Definition, factory: HandlerFactory<P>) -> anyhow::Result<()> {
        definition.validate()?;

        let id = definition.id.clone();
        if self.plugins.contains_key(&id) {
            anyhow::bail!("{} plugin id already registered: {id}", P::NAME);
        }

        self.plugins.insert(id, RegisteredPlugin { definition, factory });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredPlugin<P>> {
        self.plugins.get(id)
    }

    /// Plugin ids in deterministic order.
    pub fn list_ids(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredPlugin<P>)> {
        self.plugins.iter()
    }

    /// Whether a definition's provider is available on the host.
    pub fn is_available(&self, definition: &Definition) -> bool {
        match definition.provider.as_deref() {
            None => true,
            Some(p) => self.providers.is_provider_active(p),
        }
    }

    /// Build a handler for a registered definition.
    pub fn create_instance(
        &self,
        id: &str,
        config: &P::Config,
        ctx: &Rc<DriverContext>,
    ) -> DriverResult<Box<P::Handler>> {
        let plugin = self.plugins.get(id).ok_or_else(|| {
            DriverError::instantiation(format!("{} plugin '{id}' is not registered", P::NAME))
        })?;

        (plugin.factory)(&plugin.definition, config, ctx).map_err(|e| match e {
            e @ DriverError::Instantiation(_) => e,
            other => DriverError::instantiation(format!(
                "{} plugin '{id}' failed to instantiate: {other}",
                P::NAME
            )),
        })
    }
}

impl<P: PluginType> DefinitionSource for PluginRegistry<P> {
    fn definitions(&self) -> DriverResult<Vec<Definition>> {
        let mut out = Vec::with_capacity(self.plugins.len());
        for plugin in self.plugins.values() {
            if self.is_available(&plugin.definition) {
                out.push(plugin.definition.clone());
            } else {
                debug!(
                    namespace = P::NAMESPACE,
                    id = %plugin.definition.id,
                    provider = ?plugin.definition.provider,
                    "definition dropped: provider inactive"
                );
            }
        }
        Ok(out)
    }
}
