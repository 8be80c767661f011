//! The recursive descent over architectures, featuresets and flavours.
//!
//! [`Driver`] performs the walk and the bookkeeping every generator shares
//! (localversion handling, the `ARCH`/`FEATURESET`/`FLAVOUR` flags and the
//! aggregate Makefile targets). The per-stage hooks of [`Stages`] add
//! whatever is specific to the package being generated.

use super::{Output, Scope, Triplet};
use crate::config::{ConfigTree, Qualifiers};
use crate::error::Result;
use crate::makefile::Makefile;
use crate::makeflags::MakeFlags;
use crate::package::PackagesList;
use crate::template::{Templates, Vars};
use crate::version::Changelog;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Targets that get a hierarchy below each architecture.
const ARCH_TARGETS: &[&str] = &["binary-arch", "build-arch", "setup"];
/// Targets that get a hierarchy below each indep featureset.
const INDEP_TARGETS: &[&str] = &["binary-indep", "build-indep", "setup"];

/// A sub-make invocation of `debian/rules.real`.
pub fn rules_real(target: &str, makeflags: &MakeFlags) -> String {
    format!("$(MAKE) -f debian/rules.real {} {}", target, makeflags)
}

/// The top-level `build-indep` and `binary-indep` rules.
pub fn indep_rules(makefile: &mut Makefile, makeflags: &MakeFlags) {
    makefile.add_cmds("build-indep", vec![rules_real("build-indep", makeflags)]);
    makefile.add_cmds("binary-indep", vec![rules_real("binary-indep", makeflags)]);
}

/// Link `target -> target_suffix -> target_suffix_real` for each target.
fn chain(makefile: &mut Makefile, targets: &[&str], prefix: &str, suffix: &str) {
    for target in targets {
        let parent = if prefix.is_empty() {
            target.to_string()
        } else {
            format!("{}_{}", target, prefix)
        };
        let child = format!("{}_{}", parent, suffix);
        let real = format!("{}_real", child);
        makefile.add(&parent, &[child.clone()], None);
        makefile.add(&child, &[real], None);
    }
}

/// Whether `featureset` is enabled, looking at `base` merged for `arch`
/// (or for every architecture when `arch` is `None`).
pub fn featureset_enabled(config: &ConfigTree, arch: Option<&str>, featureset: &str) -> Result<bool> {
    let qualifiers = Qualifiers {
        arch,
        featureset: Some(featureset),
        flavour: None,
    };
    config.merge("base", qualifiers).get_bool("enabled", true)
}

/// `localversion` suffix of a featureset.
pub fn featureset_localversion(featureset: &str) -> String {
    if featureset == "none" {
        String::new()
    } else {
        format!("-{}", featureset)
    }
}

/// Hooks called during the descent. Everything but the accessors has a
/// default that does nothing beyond the shared bookkeeping.
pub trait Stages {
    fn config(&self) -> &ConfigTree;
    fn templates(&self) -> &Templates;
    fn changelog(&self) -> &Changelog;

    /// Variables every stage starts from.
    fn vars(&self) -> Vars;

    fn main_setup(&self, _scope: &mut Scope) -> Result<()> {
        Ok(())
    }

    fn main_makefile(&self, makefile: &mut Makefile, scope: &Scope) -> Result<()> {
        indep_rules(makefile, &scope.makeflags);
        Ok(())
    }

    fn main_packages(&self, _packages: &mut PackagesList, _scope: &Scope) -> Result<()> {
        Ok(())
    }

    fn arch_setup(&self, _scope: &mut Scope, _arch: &str) -> Result<()> {
        Ok(())
    }

    fn featureset_setup(&self, _scope: &mut Scope, _arch: &str, _featureset: &str) -> Result<()> {
        Ok(())
    }

    fn flavour_setup(&self, _scope: &mut Scope, _triplet: Triplet<'_>) -> Result<()> {
        Ok(())
    }

    fn flavour_packages(
        &self,
        _output: &mut Output,
        _scope: &mut Scope,
        _triplet: Triplet<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Runs a [`Stages`] implementation over the whole configuration.
#[derive(Debug)]
pub struct Driver<S> {
    stages: S,
}

impl<S: Stages> Driver<S> {
    pub fn new(stages: S) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    /// Generate everything. Nothing is written to disk.
    pub fn run(&self) -> Result<Output> {
        let mut output = Output::new();
        self.do_source(&mut output.packages)?;
        self.do_main(&mut output)?;
        self.do_extra(&mut output)?;
        info!(
            "generated {} binary packages, {} rules",
            output.packages.binary_names().len(),
            output.makefile.len()
        );
        Ok(output)
    }

    fn do_source(&self, packages: &mut PackagesList) -> Result<()> {
        let templates = self.stages.templates().get_control("control.source")?;
        let mut source = templates.into_iter().next().unwrap_or_default();
        source.set("Source", &self.stages.changelog().latest().source);
        let source = self
            .stages
            .templates()
            .process_package(&source, &self.stages.vars())?;
        packages.set_source(source);
        Ok(())
    }

    fn do_main(&self, output: &mut Output) -> Result<()> {
        let config = self.stages.config();
        let mut scope = Scope::new(self.stages.vars());

        self.stages.main_setup(&mut scope)?;
        self.stages.main_makefile(&mut output.makefile, &scope)?;
        self.stages.main_packages(&mut output.packages, &scope)?;

        let base = config.get("base", Qualifiers::NONE)?;
        for featureset in base.require_list("featuresets")? {
            if featureset_enabled(config, None, &featureset)? {
                chain(&mut output.makefile, INDEP_TARGETS, "", &featureset);
            }
        }
        for arch in base.require_list("arches")? {
            self.do_arch(output, &scope, &arch)?;
        }
        Ok(())
    }

    fn do_arch(&self, output: &mut Output, parent: &Scope, arch: &str) -> Result<()> {
        let mut scope = parent.clone();
        scope.vars.insert("arch".to_string(), arch.to_string());
        scope.makeflags.insert("ARCH", arch);
        self.stages.arch_setup(&mut scope, arch)?;
        chain(&mut output.makefile, ARCH_TARGETS, "", arch);

        let featuresets = self
            .stages
            .config()
            .get("base", Qualifiers::arch(arch))?
            .get_list("featuresets")?
            .unwrap_or_default();
        for featureset in featuresets {
            self.do_featureset(output, &scope, arch, &featureset)?;
        }
        Ok(())
    }

    fn do_featureset(
        &self,
        output: &mut Output,
        parent: &Scope,
        arch: &str,
        featureset: &str,
    ) -> Result<()> {
        let config = self.stages.config();
        if !featureset_enabled(config, Some(arch), featureset)? {
            warn!("featureset {} is disabled on {}, skipping", featureset, arch);
            return Ok(());
        }

        let mut scope = parent.clone();
        let localversion = featureset_localversion(featureset);
        scope
            .vars
            .insert("localversion_headers".to_string(), localversion.clone());
        scope.vars.insert("localversion".to_string(), localversion);
        scope.makeflags.insert("FEATURESET", featureset);
        self.stages.featureset_setup(&mut scope, arch, featureset)?;
        chain(&mut output.makefile, ARCH_TARGETS, arch, featureset);

        let flavours = config
            .get("base", Qualifiers::arch_featureset(arch, featureset))?
            .require_list("flavours")?;
        for flavour in flavours {
            self.do_flavour(output, &scope, Triplet::new(arch, featureset, &flavour))?;
        }
        Ok(())
    }

    fn do_flavour(&self, output: &mut Output, parent: &Scope, triplet: Triplet<'_>) -> Result<()> {
        info!("generating {}", triplet);
        let mut scope = parent.clone();
        let localversion = scope.vars.entry("localversion".to_string()).or_default();
        localversion.push('-');
        localversion.push_str(triplet.flavour);
        scope.makeflags.insert("FLAVOUR", triplet.flavour);

        self.stages.flavour_setup(&mut scope, triplet)?;
        chain(
            &mut output.makefile,
            ARCH_TARGETS,
            &format!("{}_{}", triplet.arch, triplet.featureset),
            triplet.flavour,
        );
        self.stages
            .flavour_packages(output, &mut scope, triplet)
    }

    fn do_extra(&self, output: &mut Output) -> Result<()> {
        let Some(templates) = self.stages.templates().get_control_optional("control.extra")? else {
            return Ok(());
        };
        let packages = self
            .stages
            .templates()
            .process_packages(&templates, &self.stages.vars())?;

        let mut by_arch: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for package in &packages {
            let (Some(name), Some(arches)) = (package.name(), package.architecture()) else {
                continue;
            };
            for arch in arches.iter() {
                by_arch.entry(arch.to_string()).or_default().push(name.clone());
            }
        }
        output.packages.extend(packages)?;

        for (arch, names) in by_arch {
            debug!("{} extra packages for {}", names.len(), arch);
            let cmds = names
                .iter()
                .map(|name| {
                    format!(
                        "$(MAKE) -f debian/rules.real install-dummy ARCH='{}' DH_OPTIONS='-p{}'",
                        arch, name
                    )
                })
                .collect();
            let target = format!("binary-arch_{}", arch);
            let extra = format!("{}_extra", target);
            output.makefile.add(&target, &[extra.clone()], None);
            output.makefile.add_cmds(&extra, cmds);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use std::cell::RefCell;

    /// Records the flavour hook's view of the scope.
    struct Recorder {
        config: ConfigTree,
        templates: Templates,
        changelog: Changelog,
        seen: RefCell<Vec<(String, Scope)>>,
    }

    impl Recorder {
        fn new(config: ConfigTree) -> Self {
            Self {
                config,
                templates: Templates::new(Vec::new()).unwrap().with_template(
                    "control.source",
                    "Source: placeholder\nMaintainer: ${maintainer}\n",
                ),
                changelog: Changelog::parse("platform-modules (4.19.67-2) unstable; urgency=low\n")
                    .unwrap(),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Stages for Recorder {
        fn config(&self) -> &ConfigTree {
            &self.config
        }

        fn templates(&self) -> &Templates {
            &self.templates
        }

        fn changelog(&self) -> &Changelog {
            &self.changelog
        }

        fn vars(&self) -> Vars {
            Vars::from([("maintainer".to_string(), "Kernel Team".to_string())])
        }

        fn flavour_packages(
            &self,
            _output: &mut Output,
            scope: &mut Scope,
            triplet: Triplet<'_>,
        ) -> Result<()> {
            self.seen
                .borrow_mut()
                .push((triplet.to_string(), scope.clone()));
            Ok(())
        }
    }

    fn config() -> ConfigTree {
        let mut config = ConfigTree::new();
        config.insert(
            "base",
            Qualifiers::NONE,
            Options::new("base")
                .with("arches", vec!["amd64"])
                .with("featuresets", vec!["none", "rt"]),
        );
        config.insert(
            "base",
            Qualifiers::arch("amd64"),
            Options::new("").with("featuresets", vec!["none", "rt"]),
        );
        config.insert(
            "base",
            Qualifiers::arch_featureset("amd64", "none"),
            Options::new("").with("flavours", vec!["amd64"]),
        );
        config.insert(
            "base",
            Qualifiers::arch_featureset("amd64", "rt"),
            Options::new("").with("flavours", vec!["amd64"]),
        );
        config
    }

    #[test]
    fn test_source_stanza_named_from_changelog() {
        let output = Driver::new(Recorder::new(config())).run().unwrap();
        let source = output.packages.source().unwrap();
        assert_eq!(source.get("Source").unwrap().to_string(), "platform-modules");
        assert_eq!(source.get("Maintainer").unwrap().to_string(), "Kernel Team");
    }

    #[test]
    fn test_localversion_per_featureset() {
        let driver = Driver::new(Recorder::new(config()));
        driver.run().unwrap();
        let seen = driver.stages().seen.borrow();
        let names: Vec<&str> = seen.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["amd64_none_amd64", "amd64_rt_amd64"]);

        let none = &seen[0].1;
        assert_eq!(none.vars["localversion"], "-amd64");
        assert_eq!(none.vars["localversion_headers"], "");
        assert_eq!(none.vars["arch"], "amd64");
        assert_eq!(none.makeflags.get("FLAVOUR"), Some("amd64"));

        let rt = &seen[1].1;
        assert_eq!(rt.vars["localversion"], "-rt-amd64");
        assert_eq!(rt.vars["localversion_headers"], "-rt");
        assert_eq!(rt.makeflags.get("FEATURESET"), Some("rt"));
    }

    #[test]
    fn test_disabled_featureset_is_skipped() {
        let mut config = config();
        config.insert(
            "base",
            Qualifiers::featureset("rt"),
            Options::new("").with("enabled", false),
        );
        let driver = Driver::new(Recorder::new(config));
        let output = driver.run().unwrap();
        assert_eq!(driver.stages().seen.borrow().len(), 1);
        assert!(!output.makefile.contains("setup_rt"));
        assert!(!output.makefile.contains("setup_amd64_rt"));
        assert!(output.makefile.contains("setup_none"));
    }

    #[test]
    fn test_rule_hierarchy() {
        let output = Driver::new(Recorder::new(config())).run().unwrap();
        let makefile = &output.makefile;
        let deps = |name: &str| -> Vec<String> {
            makefile.get(name).unwrap().deps().map(String::from).collect()
        };
        assert_eq!(deps("binary-arch"), vec!["binary-arch_amd64"]);
        assert_eq!(
            deps("binary-arch_amd64"),
            vec!["binary-arch_amd64_none", "binary-arch_amd64_real", "binary-arch_amd64_rt"]
        );
        assert_eq!(
            deps("setup_amd64_none"),
            vec!["setup_amd64_none_amd64", "setup_amd64_none_real"]
        );
        assert_eq!(
            deps("build-arch_amd64_rt_amd64"),
            vec!["build-arch_amd64_rt_amd64_real"]
        );
        assert_eq!(deps("binary-indep"), vec!["binary-indep_none", "binary-indep_rt"]);
        assert_eq!(makefile.get("binary-indep").unwrap().cmds().len(), 1);
        assert_eq!(makefile.get("build-indep").unwrap().cmds().len(), 1);
    }

    #[test]
    fn test_extra_packages() {
        let mut recorder = Recorder::new(config());
        recorder.templates = recorder.templates.with_template(
            "control.extra",
            "Package: platform-modules-dummy\nArchitecture: amd64 arm64\n",
        );
        let output = Driver::new(recorder).run().unwrap();

        assert!(output.packages.contains("platform-modules-dummy"));
        let rule = output.makefile.get("binary-arch_arm64_extra").unwrap();
        assert_eq!(
            rule.cmds()[0],
            vec!["$(MAKE) -f debian/rules.real install-dummy ARCH='arm64' DH_OPTIONS='-pplatform-modules-dummy'"]
        );
        assert!(output
            .makefile
            .get("binary-arch_amd64")
            .unwrap()
            .deps()
            .any(|d| d == "binary-arch_amd64_extra"));
    }

    #[test]
    fn test_missing_source_template() {
        let mut recorder = Recorder::new(config());
        recorder.templates = Templates::new(Vec::new()).unwrap();
        assert!(Driver::new(recorder).run().is_err());
    }

    #[test]
    fn test_missing_flavours_is_an_error() {
        let mut config = config();
        config.insert("base", Qualifiers::arch_featureset("amd64", "rt"), Options::new(""));
        let err = Driver::new(Recorder::new(config)).run().unwrap_err();
        assert!(err.to_string().contains("flavours"));
    }

    #[test]
    fn test_featureset_localversion() {
        assert_eq!(featureset_localversion("none"), "");
        assert_eq!(featureset_localversion("rt"), "-rt");
    }
}
