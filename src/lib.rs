//! # Debian Platform-Modules Control Generator
//!
//! This library generates the packaging metadata of a Linux kernel
//! platform-modules source package: the binary stanzas of
//! `debian/control`, the `debian/rules.gen` make fragment and the
//! per-flavour maintainer scripts. It is driven by the `gencontrol`
//! command-line tool but can be embedded in other build tooling.
//!
//! ## Quick Example
//!
//! ```
//! use gencontrol::config::{ConfigTree, Qualifiers};
//!
//! let config = ConfigTree::parse(r#"
//! [base]
//! compiler = "gcc-8"
//!
//! ["base/amd64//rt"]
//! compiler = "gcc-9"
//! "#).unwrap();
//!
//! let merged = config.merge("base", Qualifiers::triplet("amd64", "none", "rt"));
//! assert_eq!(merged.require_str("compiler").unwrap(), "gcc-9");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The configuration tree loaded from
//!   `config.defines.dump` and the scope merge that flattens it for one
//!   (architecture, featureset, flavour) combination.
//! - **Build flags (`makeflags`)**: Flags handed to `debian/rules.real`,
//!   projected from configuration by declarative tables.
//! - **Packages (`package`)**: Typed control stanzas and the merge that
//!   folds per-architecture copies into one stanza.
//! - **Templates (`template`)**: `<name>.in` files with `${name}`
//!   placeholders.
//! - **Generation (`gencontrol`)**: The recursive descent and the
//!   platform-modules specific stages.
//! - **Output (`filesystem`, `write`)**: Generated files are staged in
//!   memory and written out at the end of a run.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: Parse the configuration dump and the changelog.
//! 2.  **Generate**: Run [`gencontrol::Driver`] over the configuration,
//!     producing the package list, the make fragment and the scripts.
//! 3.  **Write**: Render `debian/control` and `debian/rules.gen` and write
//!     every staged file below the output directory.

pub mod config;
pub mod error;
pub mod filesystem;
pub mod gencontrol;
pub mod makefile;
pub mod makeflags;
pub mod package;
pub mod template;
pub mod version;
pub mod write;

#[cfg(test)]
mod config_proptest;
