//! Driver entity wrapper.
//!
//! A `DriverEntity` fronts one host entity through an entity handler. The
//! right handler depends on the bundle, which is often unknown until the
//! test author's fields have been seen, so the wrapper moves through two
//! states:
//! - `Provisional`: a handler matched on the entity type alone; answers
//!   bundle questions (key, labels, candidates) and can load by id
//! - `Final`: the handler matched on type and bundle; does all the work
//!
//! Rules:
//! - the transition happens exactly once: at construction when a bundle is
//!   given, otherwise on the first operation needing the final handler
//! - while the bundle is unknown `bundle()` reports the entity type, and
//!   finalizing commits that default
//! - the bundle cannot change after finalization

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use driver_core::criteria::{ENTITY_BUNDLES, ENTITY_TYPES};
use driver_core::errors::{DriverError, DriverResult};
use driver_core::names::{NameCandidates, NameMatcher};
use driver_core::target::{MatchTarget, TargetDescriptor};

use crate::context::DriverContext;
use crate::field::DriverField;
use crate::handler::{scalar_text, EntityHandler, FieldInput};
use crate::host::EntityRecord;

/// Configuration handed to entity handler factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHandlerConfig {
    pub entity_type: String,
    pub bundle: String,
}

impl MatchTarget for EntityHandlerConfig {
    fn target_descriptor(&self) -> TargetDescriptor {
        TargetDescriptor::new()
            .with(ENTITY_TYPES, self.entity_type.as_str())
            .with(ENTITY_BUNDLES, self.bundle.as_str())
    }
}

enum HandlerState {
    Provisional(Box<dyn EntityHandler>),
    Final(Box<dyn EntityHandler>),
}

pub struct DriverEntity {
    ctx: Rc<DriverContext>,
    entity_type: String,
    bundle: Option<String>,
    state: HandlerState,
}

impl DriverEntity {
    /// Wrap a new entity of the type named by `type_identifier`.
    ///
    /// With a bundle, the final handler is discovered immediately.
    pub fn new(ctx: &Rc<DriverContext>, type_identifier: &str, bundle: Option<&str>) -> DriverResult<Self> {
        let entity_type = identify_entity_type(ctx, type_identifier)?;
        let provisional = discover(ctx, &entity_type, &entity_type)?;

        let mut entity = Self {
            ctx: Rc::clone(ctx),
            entity_type,
            bundle: None,
            state: HandlerState::Provisional(provisional),
        };
        if let Some(bundle) = bundle {
            entity.set_bundle(bundle)?;
            entity.final_handler()?;
        }
        Ok(entity)
    }

    /// Wrap a new entity and set its fields.
    pub fn create(
        ctx: &Rc<DriverContext>,
        fields: Vec<(String, FieldInput)>,
        type_identifier: &str,
        bundle: Option<&str>,
    ) -> DriverResult<Self> {
        let mut entity = Self::new(ctx, type_identifier, bundle)?;
        entity.set_fields(fields)?;
        Ok(entity)
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The bundle, or the entity type while no bundle is known.
    pub fn bundle(&self) -> &str {
        self.bundle.as_deref().unwrap_or(&self.entity_type)
    }

    pub fn is_final(&self) -> bool {
        matches!(self.state, HandlerState::Final(_))
    }

    /// Identify and store the bundle.
    ///
    /// Entity types without bundles ignore the call.
    pub fn set_bundle(&mut self, identifier: &str) -> DriverResult<()> {
        if self.is_final() {
            return Err(DriverError::invalid_state(
                "Cannot change entity bundle after final plugin discovery has taken place",
            ));
        }
        let handler = self.handler();
        if !handler.supports_bundles() {
            return Ok(());
        }

        let bundle = NameMatcher::new(handler.bundles())
            .identify(identifier)
            .ok_or_else(|| {
                DriverError::no_match(format!(
                    "'{identifier}' could not be identified as a bundle of the '{}' entity type.",
                    self.entity_type
                ))
            })?;
        self.bundle = Some(bundle);
        Ok(())
    }

    pub fn id(&mut self) -> DriverResult<String> {
        self.final_handler()?.id()
    }

    pub fn label(&mut self) -> DriverResult<String> {
        self.final_handler()?.label()
    }

    /// True until the final handler reports a stored entity.
    pub fn is_new(&self) -> bool {
        match &self.state {
            HandlerState::Final(handler) => handler.is_new(),
            HandlerState::Provisional(_) => true,
        }
    }

    /// Attach an existing host entity by id.
    ///
    /// While provisional, the entity is loaded once to learn its bundle, then
    /// again through the bundle-specific handler.
    pub fn load(&mut self, entity_id: &str) -> DriverResult<()> {
        if let HandlerState::Provisional(provisional) = &mut self.state {
            let loaded_bundle = provisional.load(entity_id)?.bundle.clone();
            if self.is_bundle_missing() {
                if let Some(bundle) = loaded_bundle {
                    self.set_bundle(&bundle)?;
                }
            }
        }
        self.final_handler()?.load(entity_id)?;
        Ok(())
    }

    pub fn reload(&mut self) -> DriverResult<()> {
        self.final_handler()?.reload()
    }

    pub fn save(&mut self) -> DriverResult<()> {
        self.final_handler()?.save()
    }

    pub fn delete(&mut self) -> DriverResult<()> {
        self.final_handler()?.delete()
    }

    /// Set one field.
    pub fn set(&mut self, identifier: &str, input: impl Into<FieldInput>) -> DriverResult<()> {
        self.set_fields(vec![(identifier.to_string(), input.into())])
    }

    /// Hand fields to the final handler, extracting the bundle first if it
    /// is still unknown.
    pub fn set_fields(&mut self, fields: Vec<(String, FieldInput)>) -> DriverResult<()> {
        let fields = if self.is_bundle_missing() {
            self.extract_bundle_field(fields)?
        } else {
            fields
        };
        self.final_handler()?.set_fields(fields)
    }

    pub fn url(&mut self, rel: &str) -> DriverResult<String> {
        self.final_handler()?.url(rel)
    }

    pub fn tear_down(&mut self) -> DriverResult<()> {
        self.final_handler()?.tear_down()
    }

    /// The attached host entity, once the final handler has one.
    pub fn entity(&self) -> Option<&EntityRecord> {
        match &self.state {
            HandlerState::Final(handler) => handler.entity(),
            HandlerState::Provisional(_) => None,
        }
    }

    /// The final handler, discovering it on first use.
    pub fn final_handler(&mut self) -> DriverResult<&mut dyn EntityHandler> {
        if !self.is_final() {
            if self.is_bundle_missing() {
                self.bundle = Some(self.entity_type.clone());
            }
            let handler = discover(&self.ctx, &self.entity_type, self.bundle())?;
            debug!(
                entity_type = %self.entity_type,
                bundle = %self.bundle(),
                plugin = %handler.definition().id,
                "entity handler finalized"
            );
            self.state = HandlerState::Final(handler);
        }

        match &mut self.state {
            HandlerState::Final(handler) => Ok(handler.as_mut()),
            HandlerState::Provisional(_) => Err(DriverError::invalid_state(
                "Failed to discover or instantiate bundle-specific plugin.",
            )),
        }
    }

    /// Whichever handler is current.
    fn handler(&self) -> &dyn EntityHandler {
        match &self.state {
            HandlerState::Provisional(handler) | HandlerState::Final(handler) => handler.as_ref(),
        }
    }

    fn is_bundle_missing(&self) -> bool {
        self.bundle.is_none() && self.handler().supports_bundles()
    }

    /// Pull the bundle field out of `fields` and set the bundle from it.
    ///
    /// Entities may have a bundle key without requiring a bundle, so finding
    /// no bundle field is not an error.
    fn extract_bundle_field(&mut self, mut fields: Vec<(String, FieldInput)>) -> DriverResult<Vec<(String, FieldInput)>> {
        let Some(bundle_key) = self.handler().bundle_key() else {
            return Ok(fields);
        };

        let candidates: NameCandidates = self
            .handler()
            .bundle_key_labels()
            .into_iter()
            .map(|label| (label, bundle_key.clone()))
            .collect();
        let matcher = NameMatcher::new(candidates);

        // The alias overrides any other input naming the bundle field.
        let alias = self.ctx.config().bundle_alias.clone();
        if fields.iter().any(|(key, _)| *key == alias) {
            fields.retain(|(key, _)| *key == alias || matcher.identify(key).as_ref() != Some(&bundle_key));
        }
        let fields = fields
            .into_iter()
            .map(|(key, input)| if key == alias { (bundle_key.clone(), input) } else { (key, input) });

        let mut found = matcher.identify_set(fields);

        if let Some(input) = found.matched.remove(&bundle_key) {
            let mut field = match input {
                FieldInput::Prepared(field) => field,
                FieldInput::Raw(values) => DriverField::new(
                    &self.ctx,
                    values,
                    &bundle_key,
                    &self.entity_type,
                    Some(self.bundle()),
                )?,
            };
            let processed = field.processed_values()?;
            let bundle = scalar_text(&processed).ok_or_else(|| {
                DriverError::ambiguous_input(format!(
                    "Bundle field '{bundle_key}' did not yield a bundle: {processed}"
                ))
            })?;
            self.set_bundle(&bundle)?;
        }

        Ok(found.unmatched)
    }
}

impl MatchTarget for DriverEntity {
    fn target_descriptor(&self) -> TargetDescriptor {
        TargetDescriptor::new()
            .with(ENTITY_TYPES, self.entity_type.as_str())
            .with(ENTITY_BUNDLES, self.bundle())
    }
}

impl fmt::Debug for DriverEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverEntity")
            .field("entity_type", &self.entity_type)
            .field("bundle", &self.bundle)
            .field("final", &self.is_final())
            .field("plugin", &self.handler().definition().id)
            .finish_non_exhaustive()
    }
}

fn identify_entity_type(ctx: &DriverContext, identifier: &str) -> DriverResult<String> {
    let candidates: NameCandidates = ctx
        .schema()
        .entity_types()
        .into_iter()
        .map(|t| (t.label, t.machine_name))
        .collect();
    NameMatcher::new(candidates)
        .identify(identifier)
        .ok_or_else(|| DriverError::no_match(format!("'{identifier}' could not be identified as an entity type.")))
}

/// Instantiate the top-ranked entity handler for a type and bundle.
fn discover(ctx: &Rc<DriverContext>, entity_type: &str, bundle: &str) -> DriverResult<Box<dyn EntityHandler>> {
    let config = EntityHandlerConfig {
        entity_type: entity_type.to_string(),
        bundle: bundle.to_string(),
    };
    ctx.entity_plugins().top_instance(&config, &config, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_config_targets_type_and_bundle() {
        let config = EntityHandlerConfig {
            entity_type: "node".to_string(),
            bundle: "article".to_string(),
        };
        let d = config.target_descriptor();
        assert_eq!(d.get(ENTITY_TYPES), Some("node"));
        assert_eq!(d.get(ENTITY_BUNDLES), Some("article"));
        assert_eq!(d.iter().count(), 2);
    }
}
