//! Stages for the platform-modules source package.
//!
//! Each flavour gets an image stanza (plus a debug stanza when
//! `build.debug-info` is set), three `_real` rules dispatching to
//! `debian/rules.real`, and its maintainer scripts.

use super::driver::{featureset_enabled, indep_rules, rules_real, Stages};
use super::{Output, Scope, Triplet};
use crate::config::{ConfigTree, Options, Qualifiers};
use crate::error::{Error, Result};
use crate::makefile::Makefile;
use crate::makeflags::{project, FlagSpec};
use crate::package::{
    merge_packages, FieldValue, Package, PackageDescription, PackageRelation, PackagesList,
};
use crate::template::{require_var, Templates, Vars};
use crate::version::{Changelog, VersionLinux};
use indexmap::IndexMap;
use std::collections::BTreeSet;

pub const ARCH_FLAGS: &[FlagSpec] = &[FlagSpec::required("kernel-arch", "KERNEL_ARCH")];

pub const FLAVOUR_BASE_FLAGS: &[FlagSpec] = &[
    FlagSpec::required("compiler", "COMPILER"),
    FlagSpec::required("kernel-arch", "KERNEL_ARCH"),
    FlagSpec::optional("cflags", "CFLAGS_KERNEL"),
    FlagSpec::optional("override-host-type", "OVERRIDE_HOST_TYPE"),
];

pub const FLAVOUR_BUILD_FLAGS: &[FlagSpec] = &[FlagSpec::optional("image-file", "IMAGE_FILE")];

pub const FLAVOUR_IMAGE_FLAGS: &[FlagSpec] = &[
    FlagSpec::required("type", "TYPE"),
    FlagSpec::optional("install-stem", "IMAGE_INSTALL_STEM"),
];

/// Projected from the template variables rather than configuration.
pub const FLAVOUR_OTHER_FLAGS: &[FlagSpec] = &[
    FlagSpec::required("localversion", "LOCALVERSION"),
    FlagSpec::optional("localversion-image", "LOCALVERSION_IMAGE"),
];

/// Maintainer scripts written per flavour. Final modes are left to
/// `dh_installdeb`.
pub const MAINTAINER_SCRIPTS: &[&str] = &["postinst", "postrm", "triggers"];

/// `localversion-image` for a flavour.
///
/// Normally the flavour's own `localversion`; `image.override-localversion`
/// replaces the flavour part, keeping the featureset part.
pub fn localversion_image(vars: &Vars, image: &Options) -> Result<String> {
    match image.get_str("override-localversion")? {
        Some(custom) => Ok(format!("{}-{}", require_var(vars, "localversion_headers")?, custom)),
        None => Ok(require_var(vars, "localversion")?.to_string()),
    }
}

/// Description assembled from `description.parts`.
///
/// Parts are deduplicated and sorted. Each contributes its required
/// `part-long-<part>` paragraph and optional `part-short-<part>` fragment.
pub fn parts_description(description: &Options) -> Result<PackageDescription> {
    let mut desc = PackageDescription::new();
    let parts: BTreeSet<String> = description
        .get_list("parts")?
        .unwrap_or_default()
        .into_iter()
        .collect();

    for part in &parts {
        desc.append(&description.require_str(&format!("part-long-{}", part))?);
        if let Some(short) = description.get_str(&format!("part-short-{}", part))? {
            desc.append_short(&short);
        }
    }
    Ok(desc)
}

/// Substitute `template`, then overlay `fields` onto it. A field already
/// in the stanza is extended; a missing one is added unless empty.
pub fn process_real_image(
    templates: &Templates,
    template: &Package,
    fields: &IndexMap<String, FieldValue>,
    vars: &Vars,
) -> Result<Package> {
    let mut entry = templates.process_package(template, vars)?;
    for (name, value) in fields {
        match entry.get_mut(name) {
            Some(existing) => existing.extend(value),
            None if !value.is_empty() => entry.insert(name, value.clone()),
            None => {}
        }
    }
    Ok(entry)
}

/// Generator for the platform-modules packages.
#[derive(Debug)]
pub struct PlatformModules {
    config: ConfigTree,
    templates: Templates,
    changelog: Changelog,
    version: VersionLinux,
    abiname: String,
}

impl PlatformModules {
    pub fn new(config: ConfigTree, templates: Templates, changelog: Changelog) -> Result<Self> {
        let entry = config.get("version", Qualifiers::NONE)?;
        let version = VersionLinux::parse(&entry.require_str("source")?)?;
        let abiname = entry.require_str("abiname")?;

        Ok(Self {
            config,
            templates,
            changelog,
            version,
            abiname,
        })
    }

    pub fn version(&self) -> &VersionLinux {
        &self.version
    }

    /// ABI name for `arch`: the `abi` entry's `abiname` with a leading `-`,
    /// or the package-wide one when the architecture has none.
    pub fn resolve_abiname(&self, arch: &str) -> Result<String> {
        let per_arch = match self.config.lookup("abi", Qualifiers::arch(arch)) {
            Some(abi) => abi.get_str("abiname")?,
            None => None,
        };
        Ok(match per_arch {
            Some(abiname) => format!("-{}", abiname),
            None => self.abiname.clone(),
        })
    }

    /// Featuresets not disabled globally.
    pub fn enabled_featuresets(&self) -> Result<Vec<String>> {
        let mut enabled = Vec::new();
        for featureset in self.config.get("base", Qualifiers::NONE)?.require_list("featuresets")? {
            if featureset_enabled(&self.config, None, &featureset)? {
                enabled.push(featureset);
            }
        }
        Ok(enabled)
    }

    /// Every `arch_featureset_flavour` the descent will visit.
    pub fn enabled_triplets(&self) -> Result<Vec<String>> {
        let mut triplets = Vec::new();
        for arch in self.config.get("base", Qualifiers::NONE)?.require_list("arches")? {
            let featuresets = self
                .config
                .get("base", Qualifiers::arch(&arch))?
                .get_list("featuresets")?
                .unwrap_or_default();
            for featureset in featuresets {
                if !featureset_enabled(&self.config, None, &featureset)? {
                    continue;
                }
                let flavours = self
                    .config
                    .get("base", Qualifiers::arch_featureset(&arch, &featureset))?
                    .require_list("flavours")?;
                for flavour in flavours {
                    triplets.push(Triplet::new(&arch, &featureset, &flavour).to_string());
                }
            }
        }
        Ok(triplets)
    }

    fn write_maintainer_scripts(&self, output: &mut Output, vars: &Vars) -> Result<()> {
        let stem = format!(
            "debian/platform-modules-{}{}",
            require_var(vars, "abiname")?,
            require_var(vars, "localversion")?
        );
        for suffix in MAINTAINER_SCRIPTS {
            let template = self.templates.get_text(&format!("image.{}", suffix))?;
            let content = self.templates.substitute(&template, vars)?;
            output
                .files
                .add_file_string(format!("{}.{}", stem, suffix), &content);
        }
        Ok(())
    }
}

impl Stages for PlatformModules {
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
        Vars::from([
            ("upstreamversion".to_string(), self.version.linux_upstream.clone()),
            ("version".to_string(), self.version.linux_version.clone()),
            ("source_upstream".to_string(), self.version.upstream().to_string()),
            ("abiname".to_string(), self.abiname.clone()),
        ])
    }

    fn main_setup(&self, scope: &mut Scope) -> Result<()> {
        let flags = &mut scope.makeflags;
        flags.insert("VERSION", self.version.linux_version.as_str());
        flags.insert("UPSTREAMVERSION", self.version.linux_upstream.as_str());
        flags.insert("ABINAME", self.abiname.as_str());
        flags.insert("SOURCEVERSION", self.version.complete());
        flags.insert(
            "GENCONTROL_ARGS",
            format!("-v{}", self.changelog.latest().version.complete),
        );
        Ok(())
    }

    fn main_makefile(&self, makefile: &mut Makefile, scope: &Scope) -> Result<()> {
        let mut makeflags = scope.makeflags.clone();
        makeflags.insert("ALL_FEATURESETS", self.enabled_featuresets()?.join(" "));
        makeflags.insert("ALL_TRIPLETS", self.enabled_triplets()?.join(" "));
        indep_rules(makefile, &makeflags);
        Ok(())
    }

    fn main_packages(&self, packages: &mut PackagesList, _scope: &Scope) -> Result<()> {
        let mut extra = PackageRelation::default();
        extra.push(format!("linux-support-{}", self.abiname));
        // keeps the kernel built ahead of linux-latest after an ABI bump
        extra.push(format!("linux-headers-{}-all", self.abiname));
        packages.source_mut()?.extend_relations("Build-Depends", &extra);
        Ok(())
    }

    fn arch_setup(&self, scope: &mut Scope, arch: &str) -> Result<()> {
        let base = self.config.merge("base", Qualifiers::arch(arch));
        project(ARCH_FLAGS, &mut scope.makeflags, &base)
    }

    fn flavour_setup(&self, scope: &mut Scope, triplet: Triplet<'_>) -> Result<()> {
        let qualifiers = triplet.qualifiers();
        let base = self.config.merge("base", qualifiers);
        let build = self.config.merge("build", qualifiers);
        let image = self.config.merge("image", qualifiers);

        let localversion = require_var(&scope.vars, "localversion")?.to_string();
        let flavour = localversion.chars().skip(1).collect::<String>();
        scope.vars.insert("flavour".to_string(), flavour);
        let image_localversion = localversion_image(&scope.vars, &image)?;
        scope
            .vars
            .insert("localversion-image".to_string(), image_localversion);

        project(FLAVOUR_BASE_FLAGS, &mut scope.makeflags, &base)?;
        project(FLAVOUR_BUILD_FLAGS, &mut scope.makeflags, &build)?;
        project(FLAVOUR_IMAGE_FLAGS, &mut scope.makeflags, &image)?;
        project(FLAVOUR_OTHER_FLAGS, &mut scope.makeflags, &scope.vars)
    }

    fn flavour_packages(
        &self,
        output: &mut Output,
        scope: &mut Scope,
        triplet: Triplet<'_>,
    ) -> Result<()> {
        let qualifiers = triplet.qualifiers();

        if self.version.linux_modifier.is_none() {
            let abiname = self.resolve_abiname(triplet.arch)?;
            scope.makeflags.insert("ABINAME", abiname.as_str());
            scope.vars.insert("abiname".to_string(), abiname);
        }

        let description = self.config.merge("description", qualifiers);
        let class = description.require_str("hardware")?;
        let longclass = description
            .get_str("hardware-long")?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| class.clone());
        scope.vars.insert("class".to_string(), class);
        scope.vars.insert("longclass".to_string(), longclass);

        let mut templates = self.templates.get_control("control.image")?;
        if self
            .config
            .merge("build", qualifiers)
            .get_bool("debug-info", false)?
        {
            templates.extend(self.templates.get_control("control.image-dbg")?);
            scope.makeflags.insert("DEBUG", "True");
        }

        let mut image_fields = IndexMap::new();
        image_fields.insert(
            "Description".to_string(),
            FieldValue::Description(parts_description(&description)?),
        );

        let (image, rest) = templates.split_first().ok_or_else(|| Error::Package {
            message: "Template control.image has no package stanza".to_string(),
        })?;
        let mut rendered = Vec::with_capacity(templates.len());
        rendered.push(process_real_image(
            &self.templates,
            image,
            &image_fields,
            &scope.vars,
        )?);
        rendered.extend(self.templates.process_packages(rest, &scope.vars)?);
        merge_packages(&mut output.packages, rendered, triplet.arch)?;

        let makeflags = &scope.makeflags;
        output.makefile.add_cmds(
            &format!("binary-arch_{}_real", triplet),
            vec![rules_real("binary-arch-flavour", makeflags)],
        );
        output.makefile.add_cmds(
            &format!("build-arch_{}_real", triplet),
            vec![rules_real("build-arch", makeflags)],
        );
        output.makefile.add_cmds(
            &format!("setup_{}_real", triplet),
            vec![rules_real("setup-flavour", makeflags)],
        );

        self.write_maintainer_scripts(output, &scope.vars)
    }
}
