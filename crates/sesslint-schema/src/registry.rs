//! Eager-loading registry of versioned rulesets.
//!
//! Each session generation is one JSON Schema (Draft 2020-12) document on
//! disk, organized as `$defs` keyed by message type with
//! `properties.type.const` pinning the discriminator. The registry splits
//! every document into a per-message-type validator table at load time, so
//! validation is a table lookup by discriminator value rather than a full
//! `oneOf` evaluation. Compiled validators are `Send + Sync`; the registry
//! is never mutated after load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use sesslint_core::version;

/// Error while loading or looking up a ruleset. Load errors are fatal:
/// the tool cannot validate anything without a trustworthy contract.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown ruleset version '{0}'")]
    UnknownVersion(String),

    #[error("ruleset '{label}' could not be read from {path}: {reason}")]
    Unreadable {
        label: String,
        path: PathBuf,
        reason: String,
    },

    #[error("ruleset '{label}' is not valid JSON: {reason}")]
    Malformed { label: String, reason: String },

    #[error("ruleset '{label}' failed to compile: {reason}")]
    Uncompilable { label: String, reason: String },

    #[error("ruleset '{label}' defines no message types")]
    NoMessageTypes { label: String },
}

/// How records are matched against a ruleset's validators.
#[derive(Debug)]
pub(crate) enum Shape {
    /// Discriminator-dispatched message variants, keyed by `type` value.
    Tagged(HashMap<String, Validator>),
    /// A single contract applied to every record (history files).
    Uniform(Validator),
}

/// One immutable, version-labelled structural contract.
#[derive(Debug)]
pub struct Ruleset {
    label: String,
    pub(crate) shape: Shape,
}

impl Ruleset {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Message types the ruleset recognizes, sorted. Empty for uniform
    /// rulesets.
    pub fn message_types(&self) -> Vec<&str> {
        match &self.shape {
            Shape::Uniform(_) => Vec::new(),
            Shape::Tagged(table) => {
                let mut types: Vec<&str> = table.keys().map(|s| s.as_str()).collect();
                types.sort();
                types
            }
        }
    }

    /// Build a discriminator-dispatched ruleset from a schema document.
    ///
    /// Every `$defs` entry carrying `properties.type.const` becomes one
    /// message variant; entries without it are shared helper definitions
    /// and stay addressable through `$ref`.
    pub fn from_document(label: &str, doc: &Value) -> Result<Self, RegistryError> {
        let defs = doc
            .get("$defs")
            .and_then(|v| v.as_object())
            .ok_or_else(|| RegistryError::NoMessageTypes {
                label: label.to_string(),
            })?;

        let mut table = HashMap::new();
        for (name, def) in defs {
            let Some(tag) = def
                .pointer("/properties/type/const")
                .and_then(|v| v.as_str())
            else {
                continue;
            };
            // Re-root the document on this variant; carry all $defs so
            // intra-document refs keep resolving.
            let mut variant = serde_json::Map::new();
            if let Some(meta) = doc.get("$schema") {
                variant.insert("$schema".to_string(), meta.clone());
            }
            variant.insert("$defs".to_string(), Value::Object(defs.clone()));
            variant.insert(
                "$ref".to_string(),
                Value::String(format!("#/$defs/{name}")),
            );
            table.insert(tag.to_string(), compile(label, &Value::Object(variant))?);
        }

        if table.is_empty() {
            return Err(RegistryError::NoMessageTypes {
                label: label.to_string(),
            });
        }

        Ok(Ruleset {
            label: label.to_string(),
            shape: Shape::Tagged(table),
        })
    }

    /// Build a uniform ruleset: one contract for every record.
    pub fn uniform(label: &str, doc: &Value) -> Result<Self, RegistryError> {
        Ok(Ruleset {
            label: label.to_string(),
            shape: Shape::Uniform(compile(label, doc)?),
        })
    }
}

fn compile(label: &str, schema: &Value) -> Result<Validator, RegistryError> {
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    opts.build(schema).map_err(|e| RegistryError::Uncompilable {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

/// All loaded rulesets, indexed by version label.
#[derive(Debug)]
pub struct Registry {
    rulesets: HashMap<String, Ruleset>,
    schema_dir: PathBuf,
}

impl Registry {
    /// Load every session generation plus the history ruleset from
    /// `schema_dir`. Layout: `v<label>/session.schema.json` per generation
    /// and a top-level `history.schema.json`.
    pub fn load(schema_dir: &Path, session_labels: &[&str]) -> Result<Self, RegistryError> {
        let mut rulesets = HashMap::new();

        for label in session_labels {
            let path = schema_dir.join(format!("v{label}")).join("session.schema.json");
            let doc = read_document(label, &path)?;
            rulesets.insert(label.to_string(), Ruleset::from_document(label, &doc)?);
        }

        let history_path = schema_dir.join("history.schema.json");
        let doc = read_document(version::HISTORY, &history_path)?;
        rulesets.insert(
            version::HISTORY.to_string(),
            Ruleset::uniform(version::HISTORY, &doc)?,
        );

        Ok(Registry {
            rulesets,
            schema_dir: schema_dir.to_path_buf(),
        })
    }

    pub fn get(&self, label: &str) -> Result<&Ruleset, RegistryError> {
        self.rulesets
            .get(label)
            .ok_or_else(|| RegistryError::UnknownVersion(label.to_string()))
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loaded version labels, sorted.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.rulesets.keys().map(|s| s.as_str()).collect();
        labels.sort();
        labels
    }
}

fn read_document(label: &str, path: &Path) -> Result<Value, RegistryError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| RegistryError::Unreadable {
            label: label.to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    serde_json::from_str(&content).map_err(|e| RegistryError::Malformed {
        label: label.to_string(),
        reason: e.to_string(),
    })
}
