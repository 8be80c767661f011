//! Shared test utilities for integration and E2E tests.
//!
//! [`DebianTree`] lays out a minimal platform-modules source tree in a
//! temporary directory: a configuration dump under `debian/build`, a
//! changelog and a template directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! let tree = DebianTree::new();
//! tree.command().arg("debian/build").assert().success();
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::fixtures;
    pub use super::DebianTree;
}

/// Input files for a one-architecture, two-flavour package.
#[allow(dead_code)]
pub mod fixtures {
    pub const CONFIG: &str = r#"
[version]
source = "4.19.67-2"
abiname = "5"

[base]
arches = ["amd64"]
featuresets = ["none"]
compiler = "gcc-8"

["base/amd64"]
featuresets = ["none"]
kernel-arch = "x86"

["base/amd64/none"]
flavours = ["default", "rt"]

["base/amd64//rt"]
compiler = "gcc-9"

[image]
type = "plain"

["image/amd64//rt"]
override-localversion = "rt-amd64"

[description]
hardware = "64-bit PCs"
parts = ["net", "gpio", "net"]
part-long-net = "Network drivers."
part-short-net = "network"
part-long-gpio = "GPIO expanders."
part-short-gpio = "GPIO"

["description/amd64//rt"]
hardware-long = "64-bit PCs running the realtime kernel"
"#;

    pub const CHANGELOG: &str = "\
platform-modules (4.19.67-2+pm1) unstable; urgency=medium

  * Rebuild against 4.19.67-2.

 -- Platform Team <platform@example.org>  Mon, 02 Sep 2019 10:00:00 +0000
";

    pub const CONTROL_SOURCE: &str = "\
Source: platform-modules
Section: kernel
Priority: optional
Maintainer: Platform Team <platform@example.org>
Build-Depends: debhelper (>= 10), bc
Standards-Version: 4.1.3
";

    pub const CONTROL_IMAGE: &str = "\
Package: platform-modules-${abiname}${localversion}
Architecture: any
Depends: kmod, linux-image-${upstreamversion}-${abiname}${localversion-image}
Description: Platform modules for ${class}
 Out-of-tree drivers for ${longclass}.

Package: platform-modules-common
Architecture: all
Depends: platform-modules-firmware
Description: Common files for platform modules
";

    pub const CONTROL_IMAGE_DBG: &str = "\
Package: platform-modules-${abiname}${localversion}-dbg
Architecture: any
Description: Debugging symbols for platform-modules-${abiname}${localversion}
";

    pub const POSTINST: &str = "\
#!/bin/sh -e
if [ \"$1\" = configure ]; then
    depmod ${upstreamversion}-${abiname}${localversion-image}
fi
";

    pub const POSTRM: &str = "#!/bin/sh -e\nexit 0\n";

    pub const TRIGGERS: &str =
        "interest-noawait /lib/modules/${upstreamversion}-${abiname}${localversion-image}\n";
}

/// A temporary platform-modules source tree.
pub struct DebianTree {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl DebianTree {
    /// Create a tree populated with the default fixtures.
    pub fn new() -> Self {
        let tree = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        tree.with_config(fixtures::CONFIG)
            .with_file("debian/changelog", fixtures::CHANGELOG)
            .with_template("control.source", fixtures::CONTROL_SOURCE)
            .with_template("control.image", fixtures::CONTROL_IMAGE)
            .with_template("control.image-dbg", fixtures::CONTROL_IMAGE_DBG)
            .with_template("image.postinst", fixtures::POSTINST)
            .with_template("image.postrm", fixtures::POSTRM)
            .with_template("image.triggers", fixtures::TRIGGERS)
    }

    /// Replace the configuration dump.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file("debian/build/config.defines.dump", content)
    }

    /// Append tables to the configuration dump.
    pub fn with_extra_config(self, content: &str) -> Self {
        let mut config = std::fs::read_to_string(self.dump_path()).expect("Failed to read dump");
        config.push('\n');
        config.push_str(content);
        self.with_config(&config)
    }

    /// Add or replace `debian/templates/<name>.in`.
    pub fn with_template(self, name: &str, content: &str) -> Self {
        self.with_file(&format!("debian/templates/{}.in", name), content)
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn prefix(&self) -> PathBuf {
        self.path().join("debian/build")
    }

    pub fn dump_path(&self) -> PathBuf {
        self.prefix().join("config.defines.dump")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.path().join("debian/templates")
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.path().join("debian/changelog")
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path, e))
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A `gencontrol` command running in the tree's root.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("gencontrol");
        cmd.current_dir(self.path());
        cmd
    }
}

impl Default for DebianTree {
    fn default() -> Self {
        Self::new()
    }
}
