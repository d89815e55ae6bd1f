//! Matcher bound to a registry.
//!
//! `DriverPluginMatcher<P>` pairs a core `PluginMatcher` with the registry it
//! reads definitions from, so callers can go from a target to ranked
//! definitions to handler instances through one object.

use std::rc::Rc;

use driver_core::definition::Definition;
use driver_core::errors::{DriverError, DriverResult};
use driver_core::matcher::{DefinitionSource, PluginMatcher};
use driver_core::target::MatchTarget;

use crate::context::DriverContext;
use crate::registry::{PluginRegistry, PluginType};

pub struct DriverPluginMatcher<P: PluginType> {
    matcher: PluginMatcher,
    registry: Rc<PluginRegistry<P>>,
}

impl<P: PluginType> DriverPluginMatcher<P> {
    pub fn new(registry: Rc<PluginRegistry<P>>, version: u32) -> DriverResult<Self> {
        let source: Rc<dyn DefinitionSource> = registry.clone();
        Ok(Self {
            matcher: PluginMatcher::new(P::profile(), version, source)?,
            registry,
        })
    }

    pub fn registry(&self) -> &PluginRegistry<P> {
        &self.registry
    }

    pub fn matcher(&self) -> &PluginMatcher {
        &self.matcher
    }

    /// Definitions applying to `target`, most appropriate first.
    pub fn matched_definitions(&self, target: &dyn MatchTarget) -> DriverResult<Rc<[Definition]>> {
        self.matcher.matched_definitions(target)
    }

    pub fn create_instance(
        &self,
        id: &str,
        config: &P::Config,
        ctx: &Rc<DriverContext>,
    ) -> DriverResult<Box<P::Handler>> {
        self.registry.create_instance(id, config, ctx)
    }

    /// Instantiate the best-ranked definition for `target`.
    pub fn top_instance(
        &self,
        target: &dyn MatchTarget,
        config: &P::Config,
        ctx: &Rc<DriverContext>,
    ) -> DriverResult<Box<P::Handler>> {
        let definitions = self.matched_definitions(target)?;
        let top = definitions
            .first()
            .ok_or_else(|| DriverError::no_match(format!("No matching {} plugins found", P::NAME)))?;
        self.create_instance(&top.id, config, ctx)
    }
}
