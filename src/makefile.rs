//! Makefile fragment model for `debian/rules.gen`.
//!
//! Rules are keyed by target name. Adding a rule that already exists merges
//! its dependencies and appends its command block, so the recursive
//! descent can register the same aggregate target (`binary-arch`,
//! `setup_amd64`, ...) once per child.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One target with a dependency set and zero or more command blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    deps: BTreeSet<String>,
    cmds: Vec<Vec<String>>,
}

impl Rule {
    pub fn deps(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(String::as_str)
    }

    pub fn cmds(&self) -> &[Vec<String>] {
        &self.cmds
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Makefile {
    rules: BTreeMap<String, Rule>,
}

impl Makefile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. Each dependency also becomes a (possibly empty)
    /// rule so every target referenced is defined.
    pub fn add(&mut self, name: &str, deps: &[String], cmds: Option<Vec<String>>) {
        let rule = self.rules.entry(name.to_string()).or_default();
        rule.deps.extend(deps.iter().cloned());
        if let Some(cmds) = cmds {
            rule.cmds.push(cmds);
        }
        for dep in deps {
            self.rules.entry(dep.clone()).or_default();
        }
    }

    /// Shorthand for a rule made only of commands.
    pub fn add_cmds(&mut self, name: &str, cmds: Vec<String>) {
        self.add(name, &[], Some(cmds));
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for Makefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, rule) in &self.rules {
            let deps = if rule.deps.is_empty() {
                String::new()
            } else {
                format!(
                    " {}",
                    rule.deps.iter().cloned().collect::<Vec<_>>().join(" ")
                )
            };

            if rule.cmds.is_empty() {
                writeln!(f, "{}:{}", name, deps)?;
                continue;
            }

            // Double-colon rules let each command block run independently.
            if !deps.is_empty() {
                writeln!(f, "{}::{}", name, deps)?;
            }
            for block in &rule.cmds {
                writeln!(f, "{}::", name)?;
                for cmd in block {
                    writeln!(f, "\t{}", cmd)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_registers_dependencies() {
        let mut makefile = Makefile::new();
        makefile.add("binary-arch", &deps(&["binary-arch_amd64"]), None);
        assert!(makefile.contains("binary-arch"));
        assert!(makefile.contains("binary-arch_amd64"));
        assert_eq!(makefile.len(), 2);
    }

    #[test]
    fn test_add_merges_existing_rule() {
        let mut makefile = Makefile::new();
        makefile.add("setup", &deps(&["setup_b"]), None);
        makefile.add("setup", &deps(&["setup_a", "setup_b"]), None);
        let rule = makefile.get("setup").unwrap();
        assert_eq!(rule.deps().collect::<Vec<_>>(), vec!["setup_a", "setup_b"]);
    }

    #[test]
    fn test_add_appends_command_blocks() {
        let mut makefile = Makefile::new();
        makefile.add_cmds("build", vec!["one".to_string()]);
        makefile.add_cmds("build", vec!["two".to_string()]);
        assert_eq!(makefile.get("build").unwrap().cmds().len(), 2);
    }

    #[test]
    fn test_render() {
        let mut makefile = Makefile::new();
        makefile.add("setup", &deps(&["setup_amd64"]), None);
        makefile.add_cmds("setup_amd64", vec!["$(MAKE) -f debian/rules.real setup".to_string()]);
        makefile.add("binary", &deps(&["binary_x"]), Some(vec!["echo done".to_string()]));

        insta::assert_snapshot!(makefile.to_string(), @r###"
        binary:: binary_x
        binary::
        	echo done
        binary_x:
        setup: setup_amd64
        setup_amd64::
        	$(MAKE) -f debian/rules.real setup
        "###);
    }
}
