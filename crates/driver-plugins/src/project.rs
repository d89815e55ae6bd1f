//! Project plugin discovery.
//!
//! Projects add or override driver behavior without writing Rust: every
//! `*.json` file in the project plugin root declares one record or a list of
//! records (`crate::spec`). Each record is bound to a built-in handler by
//! its `handler` name and registered next to the built-ins, where weight and
//! filters decide whether it wins.
//!
//! Rules:
//! - files are read in file-name order, so registration is reproducible
//! - other files and subdirectories are ignored
//! - any unreadable file, bad record or unknown handler fails the whole load
//! - a record pinned to a version binds that version's handler; unpinned
//!   records bind the configured version's

#![cfg(feature = "builtin")]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use driver_core::criteria::{ENTITY_PLUGIN_TYPE, FIELD_PLUGIN_TYPE};
use driver_core::version::HostVersion;

use crate::builtin::{entity_factory, field_factory};
use crate::registry::{EntityPlugins, FieldPlugins, PluginRegistry};
use crate::spec::{parse_records, DefinitionRecord};

/// `*.json` files directly under `root`, sorted by file name.
pub fn manifest_paths(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).with_context(|| format!("reading {}", root.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("reading {}", root.display()))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Register every project plugin under `root`. Returns how many were added.
pub fn load_project_plugins(
    root: &Path,
    version: HostVersion,
    fields: &mut PluginRegistry<FieldPlugins>,
    entities: &mut PluginRegistry<EntityPlugins>,
) -> anyhow::Result<usize> {
    let mut count = 0;
    for path in manifest_paths(root)? {
        let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let records = parse_records(&text).with_context(|| format!("parsing {}", path.display()))?;

        for record in records {
            register_record(record, version, fields, entities)
                .with_context(|| format!("registering plugin from {}", path.display()))?;
            count += 1;
        }
    }

    debug!(root = %root.display(), count, "project plugins loaded");
    Ok(count)
}

fn register_record(
    record: DefinitionRecord,
    version: HostVersion,
    fields: &mut PluginRegistry<FieldPlugins>,
    entities: &mut PluginRegistry<EntityPlugins>,
) -> anyhow::Result<()> {
    let bind_version = match record.version {
        Some(v) => HostVersion::new(v)?,
        None => version,
    };
    let handler = record.handler_name()?.to_string();
    let plugin_type = record.plugin_type.clone();
    let definition = record.into_definition()?;

    match plugin_type.as_str() {
        FIELD_PLUGIN_TYPE => {
            let factory = field_factory(&handler, bind_version).with_context(|| {
                format!("no {FIELD_PLUGIN_TYPE} handler '{handler}' for host version {bind_version}")
            })?;
            fields.register(definition, factory)
        }
        ENTITY_PLUGIN_TYPE => {
            let factory = entity_factory(&handler, bind_version).with_context(|| {
                format!("no {ENTITY_PLUGIN_TYPE} handler '{handler}' for host version {bind_version}")
            })?;
            entities.register(definition, factory)
        }
        other => anyhow::bail!("unknown plugin type '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn only_json_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", "[]");
        write(dir.path(), "a.json", "[]");
        write(dir.path(), "notes.txt", "ignored");
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let names: Vec<String> = manifest_paths(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn records_bind_to_builtin_handlers() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "plugins.json",
            r#"[
                {"id": "project_body", "handler": "generic", "weight": 5, "fieldNames": "body"},
                {"id": "project_article", "type": "DriverEntity", "handler": "generic_entity", "entityBundles": ["article"]}
            ]"#,
        );

        let mut fields = PluginRegistry::<FieldPlugins>::new();
        let mut entities = PluginRegistry::<EntityPlugins>::new();
        let n = load_project_plugins(dir.path(), HostVersion::V8, &mut fields, &mut entities).unwrap();

        assert_eq!(n, 2);
        assert_eq!(fields.list_ids(), vec!["project_body"]);
        assert_eq!(entities.list_ids(), vec!["project_article"]);
    }

    #[test]
    fn unknown_handler_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", r#"{"id": "x", "handler": "link", "version": 8}"#);

        let mut fields = PluginRegistry::<FieldPlugins>::new();
        let mut entities = PluginRegistry::<EntityPlugins>::new();
        let err = load_project_plugins(dir.path(), HostVersion::V8, &mut fields, &mut entities).unwrap_err();

        let chain = format!("{err:#}");
        assert!(chain.contains("broken.json"), "{chain}");
        assert!(chain.contains("no DriverField handler 'link'"), "{chain}");
    }

    #[test]
    fn malformed_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.json", "{not json");

        let mut fields = PluginRegistry::<FieldPlugins>::new();
        let mut entities = PluginRegistry::<EntityPlugins>::new();
        let err = load_project_plugins(dir.path(), HostVersion::V7, &mut fields, &mut entities).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(manifest_paths(&missing).is_err());
    }
}
