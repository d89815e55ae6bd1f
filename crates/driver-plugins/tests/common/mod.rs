//! Shared fixtures: in-memory hosts shaped like a small site on each host
//! version.

#![allow(dead_code)]

use std::rc::Rc;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use driver_plugins::prelude::*;

/// Route driver logs to the test writer. `RUST_LOG=debug` shows matching.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node_type() -> EntityTypeInfo {
    EntityTypeInfo::new("node", "Content")
        .id_key("nid")
        .label_key("title")
        .bundle_key("type")
        .bundle("article", "Article")
        .bundle("page", "Basic page")
}

fn user_type() -> EntityTypeInfo {
    EntityTypeInfo::new("user", "User").id_key("uid").label_key("name")
}

/// Version 8 site: articles with tags and an author, plus a config entity.
pub fn modern_host() -> InMemoryHost {
    InMemoryHost::new()
        .with_entity_type(node_type())
        .with_entity_type(
            EntityTypeInfo::new("taxonomy_term", "Taxonomy term")
                .id_key("tid")
                .label_key("name")
                .bundle_key("vid")
                .bundle("tags", "Tags"),
        )
        .with_entity_type(user_type())
        .with_entity_type(
            EntityTypeInfo::new("node_type", "Content type")
                .id_key("type")
                .label_key("name")
                .config(),
        )
        .with_field("node", None, FieldInfo::new("title", "Title", "string"))
        .with_field("node", None, FieldInfo::new("type", "Content type", "string"))
        .with_field("node", None, FieldInfo::new("body", "Body", "text_with_summary"))
        .with_field(
            "node",
            Some("article"),
            FieldInfo::new("field_tags", "Tags", "entity_reference").target("taxonomy_term", &["tags"]),
        )
        .with_field(
            "node",
            Some("article"),
            FieldInfo::new("field_author", "Author", "entity_reference").target("user", &[]),
        )
        .with_field("taxonomy_term", None, FieldInfo::new("name", "Name", "string"))
        .with_field("user", None, FieldInfo::new("name", "Name", "string"))
        .with_field("node_type", None, FieldInfo::new("name", "Name", "label"))
        .with_field("node_type", None, FieldInfo::new("help", "Explanation", "text"))
        .with_field("node_type", None, FieldInfo::new("hidden_fields", "", "sequence"))
}

/// Version 7 site: language-keyed fields and vocabulary term references.
pub fn legacy_host() -> InMemoryHost {
    InMemoryHost::new()
        .with_entity_type(node_type())
        .with_entity_type(
            EntityTypeInfo::new("taxonomy_term", "Taxonomy term")
                .id_key("tid")
                .label_key("name")
                .bundle_key("vocabulary_machine_name")
                .bundle("tags", "Tags"),
        )
        .with_entity_type(user_type())
        .with_field("node", None, FieldInfo::new("title", "Title", "_property"))
        .with_field("node", None, FieldInfo::new("type", "Content type", "_property"))
        .with_field("node", None, FieldInfo::new("created", "Authored on", "_property"))
        .with_field("node", None, FieldInfo::new("body", "Body", "text_with_summary"))
        .with_field(
            "node",
            Some("article"),
            FieldInfo::new("field_tags", "Tags", "taxonomy_term_reference").vocabulary("tags"),
        )
        .with_field("node", Some("article"), FieldInfo::new("field_link", "Link", "link_field"))
        .with_field(
            "node",
            Some("article"),
            FieldInfo::new("field_when", "When", "datetime").columns(&["value", "value2"]),
        )
        .with_field("user", None, FieldInfo::new("created", "Member since", "_property"))
}

pub fn context_for(host: InMemoryHost, config: DriverConfig) -> (Rc<InMemoryHost>, Rc<DriverContext>) {
    init_tracing();
    let host = Rc::new(host);
    let ctx = DriverContext::for_host(config, Rc::clone(&host))
        .build()
        .expect("driver context builds");
    (host, ctx)
}

pub fn modern() -> (Rc<InMemoryHost>, Rc<DriverContext>) {
    context_for(modern_host(), DriverConfig::for_version(HostVersion::V8))
}

pub fn legacy() -> (Rc<InMemoryHost>, Rc<DriverContext>) {
    context_for(legacy_host(), DriverConfig::for_version(HostVersion::V7))
}

/// Store an entity directly in the host. Returns its id.
pub fn seed(host: &InMemoryHost, entity_type: &str, bundle: Option<&str>, fields: &[(&str, Value)]) -> String {
    let mut record = EntityRecord::new(entity_type, bundle.map(str::to_string));
    for (name, value) in fields {
        record.fields.insert(name.to_string(), value.clone());
    }
    host.insert(record).expect("seeded entity is stored")
}

pub fn seed_term(host: &InMemoryHost, vocabulary: &str, name: &str) -> String {
    seed(host, "taxonomy_term", Some(vocabulary), &[("name", json!(name))])
}

pub fn fields(pairs: Vec<(&str, Value)>) -> Vec<(String, FieldInput)> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), FieldInput::from(value)))
        .collect()
}
