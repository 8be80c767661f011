//! # Templates and Substitution
//!
//! Templates are text files named `<name>.in`, searched for in a list of
//! directories. Names starting with `control.` hold deb822 package stanzas
//! and are parsed into [`Package`]s; any other name is plain text, such as
//! maintainer scripts.
//!
//! Placeholders take the form `${name}` and are resolved against a
//! [`Vars`] mapping. Referencing a variable that is not defined is an
//! error rather than an empty expansion.

use crate::error::{Error, Result};
use crate::package::{control, Package};
use log::debug;
use regex::{Captures, Regex};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Template substitution variables.
pub type Vars = BTreeMap<String, String>;

const PLACEHOLDER: &str = r"\$\{([-_A-Za-z0-9]+)\}";

/// Value of a variable that an earlier stage must have set.
pub fn require_var<'v>(vars: &'v Vars, name: &str) -> Result<&'v str> {
    vars.get(name).map(String::as_str).ok_or_else(|| Error::Template {
        message: "Undefined variable".to_string(),
        variable: Some(name.to_string()),
    })
}

/// Template lookup over a list of directories.
///
/// Templates registered with [`Templates::with_template`] take precedence
/// over files on disk. Each file is read at most once.
#[derive(Debug, Clone)]
pub struct Templates {
    dirs: Vec<PathBuf>,
    inline: HashMap<String, String>,
    cache: RefCell<HashMap<String, Option<String>>>,
    placeholder: Regex,
}

impl Templates {
    pub fn new(dirs: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            dirs,
            inline: HashMap::new(),
            cache: RefCell::default(),
            placeholder: Regex::new(PLACEHOLDER)?,
        })
    }

    /// Register a template from a string.
    pub fn with_template(mut self, name: &str, content: &str) -> Self {
        self.inline.insert(name.to_string(), content.to_string());
        self
    }

    fn read(&self, name: &str) -> Result<Option<String>> {
        if let Some(content) = self.inline.get(name) {
            return Ok(Some(content.clone()));
        }
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(cached.clone());
        }

        let mut content = None;
        for dir in &self.dirs {
            let path = template_path(dir, name);
            if path.is_file() {
                debug!("loading template {}", path.display());
                content = Some(std::fs::read_to_string(&path).map_err(|e| Error::file(&path, e))?);
                break;
            }
        }
        self.cache
            .borrow_mut()
            .insert(name.to_string(), content.clone());
        Ok(content)
    }

    /// Raw text of a template.
    pub fn get_text(&self, name: &str) -> Result<String> {
        self.read(name)?.ok_or_else(|| Error::TemplateNotFound {
            name: name.to_string(),
        })
    }

    /// Stanzas of a `control.*` template.
    pub fn get_control(&self, name: &str) -> Result<Vec<Package>> {
        self.get_control_optional(name)?
            .ok_or_else(|| Error::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Like [`Templates::get_control`], but a missing template yields `None`.
    pub fn get_control_optional(&self, name: &str) -> Result<Option<Vec<Package>>> {
        match self.read(name)? {
            Some(content) => control::parse(name, &content).map(Some),
            None => Ok(None),
        }
    }

    /// Replace every `${name}` in `text` with its value from `vars`.
    pub fn substitute(&self, text: &str, vars: &Vars) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for caps in self.placeholder.captures_iter(text) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
            out.push_str(&text[last..whole.start]);
            out.push_str(lookup(&caps, vars)?);
            last = whole.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Substitute into every field of a stanza.
    pub fn process_package(&self, package: &Package, vars: &Vars) -> Result<Package> {
        package.try_map(|text| self.substitute(text, vars))
    }

    pub fn process_packages(&self, packages: &[Package], vars: &Vars) -> Result<Vec<Package>> {
        packages
            .iter()
            .map(|p| self.process_package(p, vars))
            .collect()
    }
}

fn lookup<'v>(caps: &Captures<'_>, vars: &'v Vars) -> Result<&'v str> {
    require_var(vars, &caps[1])
}

fn template_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.in", name))
}
