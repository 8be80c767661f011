//! # Control Generation
//!
//! The generator walks the configuration from the top down:
//!
//! 1. **Source**: the source stanza from `control.source`.
//! 2. **Main**: package-wide variables and flags, the indep rules and one
//!    rule chain per enabled featureset.
//! 3. **Arch**: for each architecture in `base.arches`.
//! 4. **Featureset**: for each enabled featureset of that architecture.
//! 5. **Flavour**: for each flavour of that featureset. Binary stanzas are
//!    rendered here and merged into the accumulated list.
//! 6. **Extra**: stanzas from the optional `control.extra` template.
//!
//! Every stage receives a copy of its parent's [`Scope`], so values set
//! for one flavour never leak into its siblings. [`driver::Driver`] owns
//! the walk; [`driver::Stages`] is the set of hooks a concrete generator
//! fills in, and [`platform::PlatformModules`] is the one for
//! platform-modules packages.

pub mod driver;
pub mod platform;

pub use driver::{Driver, Stages};
pub use platform::PlatformModules;

use crate::config::Qualifiers;
use crate::filesystem::MemoryFS;
use crate::makefile::Makefile;
use crate::makeflags::MakeFlags;
use crate::package::{control, PackagesList};
use crate::template::Vars;
use std::fmt;

/// Path of the generated control file, relative to the output directory.
pub const CONTROL_PATH: &str = "debian/control";
/// Path of the generated make fragment.
pub const RULES_PATH: &str = "debian/rules.gen";

/// State handed from a stage to the stages below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub vars: Vars,
    pub makeflags: MakeFlags,
}

impl Scope {
    pub fn new(vars: Vars) -> Self {
        Self {
            vars,
            makeflags: MakeFlags::new(),
        }
    }
}

/// One (architecture, featureset, flavour) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triplet<'a> {
    pub arch: &'a str,
    pub featureset: &'a str,
    pub flavour: &'a str,
}

impl<'a> Triplet<'a> {
    pub fn new(arch: &'a str, featureset: &'a str, flavour: &'a str) -> Self {
        Self {
            arch,
            featureset,
            flavour,
        }
    }

    pub fn qualifiers(&self) -> Qualifiers<'a> {
        Qualifiers::triplet(self.arch, self.featureset, self.flavour)
    }
}

impl fmt::Display for Triplet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.arch, self.featureset, self.flavour)
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub packages: PackagesList,
    pub makefile: Makefile,
    /// Maintainer scripts and other per-flavour files.
    pub files: MemoryFS,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered `debian/control`.
    pub fn control(&self) -> String {
        control::render(self.packages.iter())
    }

    /// Rendered `debian/rules.gen`.
    pub fn rules(&self) -> String {
        self.makefile.to_string()
    }

    /// All files to write, including the control file and make fragment.
    pub fn into_files(self) -> MemoryFS {
        let mut files = self.files;
        files.add_file_string(CONTROL_PATH, &control::render(self.packages.iter()));
        files.add_file_string(RULES_PATH, &self.makefile.to_string());
        files
    }
}
