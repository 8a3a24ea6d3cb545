//! Schema registry backed by a directory of JSON files
//!
//! - One file per schema: `<dir>/<name>.schema.json`
//! - A registered name is immutable
//! - Unreadable or invalid files fail the whole load

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::{log_event_with_fields, Event};

use super::errors::{SchemaError, SchemaResult};
use super::types::{NamedSchema, Schema};

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Reads schema files from disk and keeps them in an in-memory registry.
pub struct SchemaLoader {
    schema_dir: PathBuf,
    schemas: BTreeMap<String, NamedSchema>,
}

impl SchemaLoader {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `*.schema.json` file in the schema directory.
    ///
    /// A missing directory is an empty registry.
    pub fn load_all(&mut self) -> SchemaResult<()> {
        if !self.schema_dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_schema(
                self.schema_dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed_schema(
                    self.schema_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            let is_schema = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(SCHEMA_SUFFIX));
            if is_schema {
                paths.push(path);
            }
        }
        // deterministic load order
        paths.sort();

        for path in &paths {
            self.load_schema_file(path)?;
        }

        let count = self.schemas.len().to_string();
        let dir = self.schema_dir.display().to_string();
        log_event_with_fields(Event::SchemasLoaded, &[("count", count.as_str()), ("dir", dir.as_str())]);
        Ok(())
    }

    fn load_schema_file(&mut self, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        let mut named: NamedSchema = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;
        named.schema.normalize();
        named
            .schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed_schema(path.display().to_string(), e))?;

        if self.schemas.contains_key(&named.name) {
            return Err(SchemaError::schema_immutable(&named.name));
        }
        self.schemas.insert(named.name.clone(), named);
        Ok(())
    }

    /// Registers a schema programmatically.
    pub fn register(&mut self, name: impl Into<String>, mut schema: Schema) -> SchemaResult<()> {
        let name = name.into();
        schema.normalize();
        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed_schema("<in-memory>", e))?;

        if self.schemas.contains_key(&name) {
            return Err(SchemaError::schema_immutable(name));
        }
        self.schemas.insert(name.clone(), NamedSchema::new(name, schema));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name).map(|named| &named.schema)
    }

    /// Like [`get`](Self::get), failing with `QUARRY_UNKNOWN_SCHEMA`.
    pub fn require(&self, name: &str) -> SchemaResult<&Schema> {
        self.get(name).ok_or_else(|| SchemaError::unknown_schema(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Writes a registered schema to `<dir>/<name>.schema.json`. Existing
    /// files are never overwritten.
    pub fn save_schema(&self, name: &str) -> SchemaResult<PathBuf> {
        let named = self.schemas.get(name).ok_or_else(|| SchemaError::unknown_schema(name))?;
        let path = self.schema_dir.join(format!("{}{}", name, SCHEMA_SUFFIX));

        if path.exists() {
            return Err(SchemaError::schema_immutable(name));
        }

        fs::create_dir_all(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_schema(
                self.schema_dir.display().to_string(),
                format!("Failed to create schema directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(named).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Failed to serialize schema: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::malformed_schema(path.display().to_string(), format!("Failed to write file: {}", e))
        })?;

        Ok(path)
    }
}
