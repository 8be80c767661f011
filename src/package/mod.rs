//! # Package Stanzas
//!
//! Debian control stanzas as the generator manipulates them. Field values
//! are typed by field name when parsed:
//!
//! - relation fields (`Depends`, `Provides`, `Build-Depends`, ...) become
//!   ordered [`PackageRelation`] lists,
//! - `Architecture` becomes a [`PackageArchitecture`] set,
//! - `Description` becomes a [`PackageDescription`],
//! - everything else stays plain text.
//!
//! Stanzas keep their fields in insertion order, and [`PackagesList`] keeps
//! stanzas in the order they were first added, so the rendered
//! `debian/control` is reproducible.

pub mod control;
pub mod description;
pub mod merge;

pub use description::PackageDescription;
pub use merge::merge_packages;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;

/// Fields holding comma-separated package relations.
pub const RELATION_FIELDS: &[&str] = &[
    "Depends",
    "Pre-Depends",
    "Recommends",
    "Suggests",
    "Enhances",
    "Breaks",
    "Conflicts",
    "Replaces",
    "Provides",
    "Build-Depends",
    "Build-Depends-Indep",
];

/// An ordered list of relation groups (`a | b (>= 1)` is one group).
/// Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRelation(Vec<String>);

impl PackageRelation {
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn push(&mut self, relation: impl Into<String>) {
        self.0.push(relation.into());
    }

    pub fn extend(&mut self, other: &PackageRelation) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PackageRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

/// The set of architectures a binary package is built for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageArchitecture(BTreeSet<String>);

impl PackageArchitecture {
    pub fn parse(value: &str) -> Self {
        Self(value.split_whitespace().map(String::from).collect())
    }

    pub fn single(arch: &str) -> Self {
        Self(BTreeSet::from([arch.to_string()]))
    }

    /// Returns `false` if the architecture was already present.
    pub fn insert(&mut self, arch: &str) -> bool {
        self.0.insert(arch.to_string())
    }

    pub fn contains(&self, arch: &str) -> bool {
        self.0.contains(arch)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PackageArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.iter().cloned().collect::<Vec<_>>().join(" "))
    }
}

/// A typed control field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Relations(PackageRelation),
    Architecture(PackageArchitecture),
    Description(PackageDescription),
}

impl FieldValue {
    /// Interpret `value` according to the kind of field `name` is.
    pub fn parse(name: &str, value: &str) -> Self {
        if RELATION_FIELDS.contains(&name) {
            FieldValue::Relations(PackageRelation::parse(value))
        } else if name == "Architecture" {
            FieldValue::Architecture(PackageArchitecture::parse(value))
        } else if name == "Description" {
            FieldValue::Description(PackageDescription::parse(value))
        } else {
            FieldValue::Text(value.to_string())
        }
    }

    /// Rebuild the value with `f` applied to every piece of text in it.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(match self {
            FieldValue::Text(s) => FieldValue::Text(f(s)?),
            FieldValue::Relations(rel) => FieldValue::Relations(PackageRelation(
                rel.0.iter().map(|s| f(s)).collect::<Result<_>>()?,
            )),
            FieldValue::Architecture(arch) => FieldValue::Architecture(PackageArchitecture(
                arch.0.iter().map(|s| f(s)).collect::<Result<_>>()?,
            )),
            FieldValue::Description(desc) => FieldValue::Description(desc.try_map(f)?),
        })
    }

    /// Append `other` onto this value. Relations and descriptions extend,
    /// architectures union, text is concatenated with a space.
    pub fn extend(&mut self, other: &FieldValue) {
        match (self, other) {
            (FieldValue::Relations(a), FieldValue::Relations(b)) => a.extend(b),
            (FieldValue::Description(a), FieldValue::Description(b)) => a.extend(b),
            (FieldValue::Architecture(a), FieldValue::Architecture(b)) => {
                a.0.extend(b.0.iter().cloned())
            }
            (this, other) => {
                let joined = format!("{} {}", this, other);
                *this = FieldValue::Text(joined.trim().to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Relations(rel) => rel.is_empty(),
            FieldValue::Architecture(arch) => arch.is_empty(),
            FieldValue::Description(desc) => desc.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Relations(rel) => fmt::Display::fmt(rel, f),
            FieldValue::Architecture(arch) => fmt::Display::fmt(arch, f),
            FieldValue::Description(desc) => fmt::Display::fmt(desc, f),
        }
    }
}

impl From<PackageRelation> for FieldValue {
    fn from(value: PackageRelation) -> Self {
        FieldValue::Relations(value)
    }
}

impl From<PackageArchitecture> for FieldValue {
    fn from(value: PackageArchitecture) -> Self {
        FieldValue::Architecture(value)
    }
}

impl From<PackageDescription> for FieldValue {
    fn from(value: PackageDescription) -> Self {
        FieldValue::Description(value)
    }
}

/// One control stanza.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    fields: IndexMap<String, FieldValue>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field from its raw text, typed by field name.
    pub fn set(&mut self, name: &str, value: &str) {
        self.fields
            .insert(name.to_string(), FieldValue::parse(name, value));
    }

    /// Builder-style [`Package::set`].
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The `Package` field, if this is a binary stanza.
    pub fn name(&self) -> Option<String> {
        self.fields.get("Package").map(|value| value.to_string())
    }

    pub fn architecture(&self) -> Option<&PackageArchitecture> {
        match self.fields.get("Architecture") {
            Some(FieldValue::Architecture(arch)) => Some(arch),
            _ => None,
        }
    }

    pub fn relations(&self, name: &str) -> Option<&PackageRelation> {
        match self.fields.get(name) {
            Some(FieldValue::Relations(rel)) => Some(rel),
            _ => None,
        }
    }

    /// Append relations to `name`, creating the field when absent.
    pub fn extend_relations(&mut self, name: &str, relations: &PackageRelation) {
        match self.fields.get_mut(name) {
            Some(FieldValue::Relations(existing)) => existing.extend(relations),
            _ => {
                self.fields
                    .insert(name.to_string(), FieldValue::Relations(relations.clone()));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Rebuild the stanza with `f` applied to every piece of field text.
    pub fn try_map<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut fields = IndexMap::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            fields.insert(name.clone(), value.try_map(&mut f)?);
        }
        Ok(Self { fields })
    }
}

/// All stanzas of `debian/control`, source first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagesList {
    source: Option<Package>,
    binaries: IndexMap<String, Package>,
}

impl PackagesList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, source: Package) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&Package> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Result<&mut Package> {
        self.source.as_mut().ok_or_else(|| Error::Package {
            message: "No source stanza has been generated".to_string(),
        })
    }

    /// Add a binary stanza keyed by its `Package` field. A stanza with the
    /// same name replaces the old one in place.
    pub fn append(&mut self, package: Package) -> Result<()> {
        let name = package.name().ok_or_else(|| Error::Package {
            message: "Binary stanza has no Package field".to_string(),
        })?;
        self.binaries.insert(name, package);
        Ok(())
    }

    pub fn extend(&mut self, packages: Vec<Package>) -> Result<()> {
        for package in packages {
            self.append(package)?;
        }
        Ok(())
    }

    /// Binary stanza by package name.
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.binaries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.binaries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.binaries.contains_key(name)
    }

    /// Stanzas in output order.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.source.iter().chain(self.binaries.values())
    }

    /// Names of the binary stanzas in output order.
    pub fn binary_names(&self) -> Vec<&str> {
        self.binaries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        usize::from(self.source.is_some()) + self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.binaries.is_empty()
    }
}
