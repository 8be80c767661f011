//! # Versions and Changelog Entries
//!
//! The generator needs three pieces of version information:
//!
//! - the source version from the `version` configuration scope, as a
//!   Debian version (`[epoch:]upstream[-revision]`),
//! - the Linux-specific split of that version ([`VersionLinux`]): the
//!   kernel series, an optional `~modifier` for release candidates, and
//!   the upstream string used in package names,
//! - the top entry of `debian/changelog`, for the source name and the
//!   package version handed to `dpkg-gencontrol`.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;

const DEBIAN_VERSION: &str =
    r"^(?:(?P<epoch>\d+):)?(?P<upstream>[0-9][A-Za-z0-9.+:~-]*?)(?:-(?P<revision>[^-]+))?$";

const LINUX_VERSION: &str = r"(?x)
    ^
    (?P<version>\d+\.\d+)
    (?P<update>(?:\.\d+)?(?:-[a-z]+\d+)?)
    (?:~(?P<modifier>.+?))?
    (?:\.dfsg\.(?P<dfsg>\d+))?
    -
    \d+(?:\.\d+)?
    (?:
        (?P<revision_experimental>~exp\d+)
        |
        (?P<revision_security>[~+]deb\d+u\d+)?
        (?P<revision_backports>~bpo\d+\+\d+)?
        |
        (?P<revision_other>[^-+]+)
    )
    (?:\+b\d+)?
    $
";

const CHANGELOG_HEADER: &str =
    r"^(?P<source>\w[-+0-9a-z.]*) \((?P<version>[^()\s]+)\)(?P<distribution>(?:\s+[-+0-9a-zA-Z.]+)+);";

/// A Debian package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub complete: String,
    pub epoch: Option<u32>,
    pub upstream: String,
    pub revision: Option<String>,
}

impl Version {
    pub fn parse(version: &str) -> Result<Self> {
        Self::parse_with(&Regex::new(DEBIAN_VERSION)?, version)
    }

    fn parse_with(re: &Regex, version: &str) -> Result<Self> {
        let caps = re.captures(version).ok_or_else(|| Error::Version {
            version: version.to_string(),
            message: "not a Debian version".to_string(),
        })?;

        let epoch = caps
            .name("epoch")
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|e| Error::Version {
                version: version.to_string(),
                message: format!("bad epoch: {}", e),
            })?;

        Ok(Self {
            complete: version.to_string(),
            epoch,
            upstream: caps["upstream"].to_string(),
            revision: caps.name("revision").map(|m| m.as_str().to_string()),
        })
    }
}

/// A Debian version of a Linux kernel source package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLinux {
    pub version: Version,
    /// Kernel series, e.g. `4.19`.
    pub linux_version: String,
    /// Text after `~` in the upstream part, e.g. `rc5`. `None` for
    /// mainline releases.
    pub linux_modifier: Option<String>,
    /// Series plus modifier, e.g. `4.19-rc5`.
    pub linux_upstream: String,
    /// [`VersionLinux::linux_upstream`] plus the stable update, e.g. `4.19.67`.
    pub linux_upstream_full: String,
    pub linux_dfsg: Option<String>,
}

impl VersionLinux {
    pub fn parse(version: &str) -> Result<Self> {
        let debian = Version::parse(version)?;
        let re = Regex::new(LINUX_VERSION)?;
        let caps = re.captures(version).ok_or_else(|| Error::Version {
            version: version.to_string(),
            message: "not a Linux kernel version".to_string(),
        })?;

        let linux_version = caps["version"].to_string();
        let update = caps.name("update").map(|m| m.as_str()).unwrap_or("");
        let linux_modifier = caps.name("modifier").map(|m| m.as_str().to_string());

        let linux_upstream = match &linux_modifier {
            Some(modifier) => {
                if !update.is_empty() {
                    return Err(Error::Version {
                        version: version.to_string(),
                        message: "a stable update cannot carry a modifier".to_string(),
                    });
                }
                format!("{}-{}", linux_version, modifier)
            }
            None => linux_version.clone(),
        };

        Ok(Self {
            version: debian,
            linux_upstream_full: format!("{}{}", linux_upstream, update),
            linux_version,
            linux_modifier,
            linux_upstream,
            linux_dfsg: caps.name("dfsg").map(|m| m.as_str().to_string()),
        })
    }

    pub fn complete(&self) -> &str {
        &self.version.complete
    }

    pub fn upstream(&self) -> &str {
        &self.version.upstream
    }
}

/// One entry header of `debian/changelog`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub source: String,
    pub version: Version,
    pub distribution: String,
}

/// The entry headers of a changelog, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
    entries: Vec<ChangelogEntry>,
}

impl Changelog {
    pub fn parse(content: &str) -> Result<Self> {
        let header = Regex::new(CHANGELOG_HEADER)?;
        let debian_version = Regex::new(DEBIAN_VERSION)?;
        let mut entries = Vec::new();

        for line in content.lines() {
            if let Some(caps) = header.captures(line) {
                entries.push(ChangelogEntry {
                    source: caps["source"].to_string(),
                    version: Version::parse_with(&debian_version, &caps["version"])?,
                    distribution: caps["distribution"].trim().to_string(),
                });
            }
        }

        if entries.is_empty() {
            return Err(Error::Changelog {
                message: "no entries found".to_string(),
            });
        }
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::parse(&content).map_err(|e| match e {
            Error::Changelog { message } => Error::Changelog {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// The newest entry.
    pub fn latest(&self) -> &ChangelogEntry {
        // parse() guarantees at least one entry
        &self.entries[0]
    }

    pub fn entries(&self) -> &[ChangelogEntry] {
        &self.entries
    }
}
