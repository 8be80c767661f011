//! # Configuration Tree and Merging
//!
//! This module holds the hierarchical configuration the generator works
//! from, as loaded from `config.defines.dump`, and the logic for merging
//! it into a flat view for one (architecture, featureset, flavour)
//! combination.
//!
//! ## Key Components
//!
//! - **`ConfigKey`**: A scope name (`base`, `build`, `image`, `description`,
//!   `abi`, `version`) plus optional architecture, featureset and flavour
//!   qualifiers.
//!
//! - **`Options`**: A flat mapping of option name to `ConfigValue`. Stored
//!   sections and merged views share this type; both carry a scope label
//!   used in error messages.
//!
//! - **`ConfigTree`**: The read-only mapping from `ConfigKey` to `Options`.
//!
//! ## Dump Format
//!
//! The dump is a TOML document. Each table name encodes a key as
//! `scope/arch/featureset/flavour`; an empty segment stands for an absent
//! qualifier and trailing segments may be omitted:
//!
//! ```toml
//! [base]
//! arches = ["amd64"]
//! featuresets = ["none", "rt"]
//!
//! ["base//rt"]
//! enabled = false
//!
//! ["base/amd64/none/default"]
//! compiler = "gcc-8"
//! ```
//!
//! ## Merging
//!
//! `ConfigTree::merge` overlays, from least to most specific:
//! `scope`, `scope//featureset`, `scope/arch`, `scope/arch/featureset`,
//! `scope/arch//flavour` and `scope/arch/featureset/flavour`. Layers that
//! do not apply to the requested qualifiers, or that are absent from the
//! dump, are skipped. Keys from later layers replace earlier ones.

use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    String(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// Scalar values rendered as text; lists have no scalar form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            ConfigValue::List(_) => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // rules.real compares against the capitalised spelling
            ConfigValue::Bool(true) => f.write_str("True"),
            ConfigValue::Bool(false) => f.write_str("False"),
            ConfigValue::Integer(n) => write!(f, "{}", n),
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(value: Vec<&str>) -> Self {
        ConfigValue::List(value.into_iter().map(String::from).collect())
    }
}

/// Optional qualifiers narrowing a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Qualifiers<'a> {
    pub arch: Option<&'a str>,
    pub featureset: Option<&'a str>,
    pub flavour: Option<&'a str>,
}

impl<'a> Qualifiers<'a> {
    /// No qualifiers: the global entry of a scope.
    pub const NONE: Qualifiers<'static> = Qualifiers {
        arch: None,
        featureset: None,
        flavour: None,
    };

    pub fn arch(arch: &'a str) -> Self {
        Self {
            arch: Some(arch),
            ..Default::default()
        }
    }

    /// A featureset without an architecture, as used for per-featureset
    /// defaults shared by every architecture.
    pub fn featureset(featureset: &'a str) -> Self {
        Self {
            featureset: Some(featureset),
            ..Default::default()
        }
    }

    pub fn arch_featureset(arch: &'a str, featureset: &'a str) -> Self {
        Self {
            arch: Some(arch),
            featureset: Some(featureset),
            flavour: None,
        }
    }

    pub fn triplet(arch: &'a str, featureset: &'a str, flavour: &'a str) -> Self {
        Self {
            arch: Some(arch),
            featureset: Some(featureset),
            flavour: Some(flavour),
        }
    }
}

/// Identifies one entry of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey {
    pub scope: String,
    pub arch: Option<String>,
    pub featureset: Option<String>,
    pub flavour: Option<String>,
}

impl ConfigKey {
    pub fn new(scope: &str, qualifiers: Qualifiers<'_>) -> Self {
        Self {
            scope: scope.to_string(),
            arch: qualifiers.arch.map(String::from),
            featureset: qualifiers.featureset.map(String::from),
            flavour: qualifiers.flavour.map(String::from),
        }
    }

    /// Parse a dump table name such as `base/amd64//default`.
    pub fn parse(name: &str) -> Result<Self> {
        let segments: Vec<&str> = name.split('/').collect();
        if segments.len() > 4 {
            return Err(Error::ConfigParse {
                message: format!("Too many qualifiers in section '{}'", name),
                hint: Some("Use scope/arch/featureset/flavour".to_string()),
            });
        }
        let scope = segments[0].trim();
        if scope.is_empty() {
            return Err(Error::ConfigParse {
                message: format!("Section '{}' has no scope name", name),
                hint: None,
            });
        }

        let qualifier = |index: usize| {
            segments
                .get(index)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Ok(Self {
            scope: scope.to_string(),
            arch: qualifier(1),
            featureset: qualifier(2),
            flavour: qualifier(3),
        })
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = vec![
            self.scope.as_str(),
            self.arch.as_deref().unwrap_or(""),
            self.featureset.as_deref().unwrap_or(""),
            self.flavour.as_deref().unwrap_or(""),
        ];
        while segments.len() > 1 && segments.last() == Some(&"") {
            segments.pop();
        }
        f.write_str(&segments.join("/"))
    }
}

/// A flat set of options, either stored in the tree or produced by a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    scope: String,
    values: BTreeMap<String, ConfigValue>,
}

impl Options {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly useful for tests.
    pub fn with(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Label naming where these options came from.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.values.iter()
    }

    /// Look up a key that must be present.
    pub fn require(&self, key: &str) -> Result<&ConfigValue> {
        self.values.get(key).ok_or_else(|| Error::MissingField {
            scope: self.scope.clone(),
            key: key.to_string(),
        })
    }

    /// Scalar value rendered as text, or `None` if absent.
    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_text()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a scalar value")),
        }
    }

    pub fn require_str(&self, key: &str) -> Result<String> {
        self.require(key)?
            .as_text()
            .ok_or_else(|| self.invalid(key, "a scalar value"))
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ConfigValue::Bool(b)) => Ok(*b),
            Some(_) => Err(self.invalid(key, "a boolean")),
        }
    }

    /// List value, or `None` if absent. A bare string counts as a one-item
    /// list.
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(ConfigValue::List(items)) => Ok(Some(items.clone())),
            Some(ConfigValue::String(s)) => Ok(Some(vec![s.clone()])),
            Some(_) => Err(self.invalid(key, "a list of strings")),
        }
    }

    pub fn require_list(&self, key: &str) -> Result<Vec<String>> {
        self.require(key)?;
        self.get_list(key).map(Option::unwrap_or_default)
    }

    /// Overlay `other` onto `self`; keys in `other` win.
    fn overlay(&mut self, other: &Options) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    fn invalid(&self, key: &str, expected: &str) -> Error {
        Error::InvalidValue {
            scope: self.scope.clone(),
            key: key.to_string(),
            expected: expected.to_string(),
        }
    }
}

/// The full configuration, keyed by scope and qualifiers.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    entries: BTreeMap<ConfigKey, Options>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML configuration dump.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, ConfigValue>> = toml::from_str(content)?;
        let mut tree = Self::new();

        for (name, values) in raw {
            let key = ConfigKey::parse(&name)?;
            if tree.entries.contains_key(&key) {
                return Err(Error::ConfigParse {
                    message: format!("Section '{}' duplicates '{}'", name, key),
                    hint: None,
                });
            }
            let mut options = Options::new(key.to_string());
            options.values = values;
            tree.entries.insert(key, options);
        }

        Ok(tree)
    }

    /// Load and parse a configuration dump from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::parse(&content)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, scope: &str, qualifiers: Qualifiers<'_>, options: Options) {
        let key = ConfigKey::new(scope, qualifiers);
        let mut options = options;
        options.scope = key.to_string();
        self.entries.insert(key, options);
    }

    /// Direct lookup of one entry. Fails if the tuple has no entry at all.
    pub fn get(&self, scope: &str, qualifiers: Qualifiers<'_>) -> Result<&Options> {
        let key = ConfigKey::new(scope, qualifiers);
        self.entries.get(&key).ok_or_else(|| Error::MissingSection {
            scope: key.to_string(),
        })
    }

    /// Like [`ConfigTree::get`], but absence is not an error.
    pub fn lookup(&self, scope: &str, qualifiers: Qualifiers<'_>) -> Option<&Options> {
        self.entries.get(&ConfigKey::new(scope, qualifiers))
    }

    /// Merge every layer that applies to `qualifiers`, most general first.
    pub fn merge(&self, scope: &str, qualifiers: Qualifiers<'_>) -> Options {
        let label = ConfigKey::new(scope, qualifiers).to_string();
        let mut merged = Options::new(label);
        let Qualifiers {
            arch,
            featureset,
            flavour,
        } = qualifiers;

        let mut layers = vec![Qualifiers::NONE];
        if let Some(featureset) = featureset {
            layers.push(Qualifiers::featureset(featureset));
        }
        if let Some(arch) = arch {
            layers.push(Qualifiers::arch(arch));
            if let Some(featureset) = featureset {
                layers.push(Qualifiers::arch_featureset(arch, featureset));
                if let Some(flavour) = flavour {
                    layers.push(Qualifiers {
                        arch: Some(arch),
                        featureset: None,
                        flavour: Some(flavour),
                    });
                    layers.push(Qualifiers::triplet(arch, featureset, flavour));
                }
            }
        }

        for layer in layers {
            if let Some(options) = self.lookup(scope, layer) {
                merged.overlay(options);
            }
        }

        debug!("merged {} ({} options)", merged.scope, merged.len());
        merged
    }

    /// Merge and fetch one key, falling back to `default` when absent.
    pub fn get_merge(
        &self,
        scope: &str,
        qualifiers: Qualifiers<'_>,
        key: &str,
        default: ConfigValue,
    ) -> ConfigValue {
        self.merge(scope, qualifiers)
            .get(key)
            .cloned()
            .unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
