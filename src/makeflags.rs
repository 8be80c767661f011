//! # Build Flags
//!
//! `MakeFlags` is the set of `KEY=value` variables handed to the
//! `debian/rules.real` sub-make. It stays a structured, sorted mapping and
//! is only turned into a command-line string by its `Display` impl.
//!
//! Flags are mostly copied out of merged configuration by [`project`],
//! driven by declarative [`FlagSpec`] tables.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::template::Vars;
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Variables passed to the sub-make, rendered sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeFlags {
    flags: BTreeMap<String, String>,
}

impl MakeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.flags.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl fmt::Display for MakeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.flags {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}='{}'", name, value)?;
        }
        Ok(())
    }
}

/// One row of a projection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Key looked up in the source mapping.
    pub source: &'static str,
    /// Flag name written to the target.
    pub dest: &'static str,
    /// Absent optional keys are skipped; absent required keys are an error.
    pub optional: bool,
}

impl FlagSpec {
    pub const fn required(source: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            dest,
            optional: false,
        }
    }

    pub const fn optional(source: &'static str, dest: &'static str) -> Self {
        Self {
            source,
            dest,
            optional: true,
        }
    }
}

/// Anything flags can be projected from.
pub trait FlagSource {
    /// Value for `key` rendered as a flag value, if present.
    fn flag_value(&self, key: &str) -> Result<Option<String>>;

    /// Label used when a required key is missing.
    fn source_name(&self) -> String;
}

impl FlagSource for Options {
    fn flag_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key).map(|value| value.to_string()))
    }

    fn source_name(&self) -> String {
        self.scope().to_string()
    }
}

impl FlagSource for Vars {
    fn flag_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key).cloned())
    }

    fn source_name(&self) -> String {
        "template variables".to_string()
    }
}

/// Copy each listed key present in `source` into `target`.
pub fn project<S: FlagSource + ?Sized>(
    specs: &[FlagSpec],
    target: &mut MakeFlags,
    source: &S,
) -> Result<()> {
    for spec in specs {
        match source.flag_value(spec.source)? {
            Some(value) => {
                debug!("{} = {} (from {})", spec.dest, value, spec.source);
                target.insert(spec.dest, value);
            }
            None if spec.optional => {}
            None => {
                return Err(Error::MissingField {
                    scope: source.source_name(),
                    key: spec.source.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    const SPECS: &[FlagSpec] = &[
        FlagSpec::required("compiler", "COMPILER"),
        FlagSpec::optional("cflags", "CFLAGS_KERNEL"),
    ];

    #[test]
    fn test_display_sorted_and_quoted() {
        let mut flags = MakeFlags::new();
        flags.insert("VERSION", "4.19");
        flags.insert("ARCH", "amd64");
        assert_eq!(flags.to_string(), "ARCH='amd64' VERSION='4.19'");
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(MakeFlags::new().to_string(), "");
    }

    #[test]
    fn test_insert_overrides() {
        let mut flags = MakeFlags::new();
        flags.insert("ABINAME", "5");
        flags.insert("ABINAME", "-6");
        assert_eq!(flags.get("ABINAME"), Some("-6"));
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn test_project_copies_present_fields() {
        let source = Options::new("base/amd64")
            .with("compiler", "gcc-8")
            .with("cflags", "-O2");
        let mut flags = MakeFlags::new();
        project(SPECS, &mut flags, &source).unwrap();
        assert_eq!(flags.get("COMPILER"), Some("gcc-8"));
        assert_eq!(flags.get("CFLAGS_KERNEL"), Some("-O2"));
    }

    #[test]
    fn test_project_skips_missing_optional() {
        let source = Options::new("base/amd64").with("compiler", "gcc-8");
        let mut flags = MakeFlags::new();
        project(SPECS, &mut flags, &source).unwrap();
        assert!(!flags.contains("CFLAGS_KERNEL"));
    }

    #[test]
    fn test_project_fails_on_missing_required() {
        let source = Options::new("base/amd64").with("cflags", "-O2");
        let mut flags = MakeFlags::new();
        let err = project(SPECS, &mut flags, &source).unwrap_err();
        match err {
            Error::MissingField { scope, key } => {
                assert_eq!(scope, "base/amd64");
                assert_eq!(key, "compiler");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_project_from_vars() {
        let mut vars = Vars::new();
        vars.insert("localversion".to_string(), "-default".to_string());
        let specs = [
            FlagSpec::required("localversion", "LOCALVERSION"),
            FlagSpec::optional("localversion-image", "LOCALVERSION_IMAGE"),
        ];
        let mut flags = MakeFlags::new();
        project(&specs, &mut flags, &vars).unwrap();
        assert_eq!(flags.get("LOCALVERSION"), Some("-default"));
        assert!(!flags.contains("LOCALVERSION_IMAGE"));
    }

    #[test]
    fn test_project_bool_renders_capitalised() {
        let source = Options::new("build").with("debug-info", true);
        let mut flags = MakeFlags::new();
        project(
            &[FlagSpec::required("debug-info", "DEBUG")],
            &mut flags,
            &source,
        )
        .unwrap();
        assert_eq!(flags.get("DEBUG"), Some("True"));
    }
}
