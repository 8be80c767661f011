//! Consolidating per-architecture stanzas.
//!
//! Every flavour renders its own copy of the binary stanzas. Stanzas that
//! share a `Package` name are folded into one whose `Architecture` lists
//! every architecture that produced it.

use super::{FieldValue, Package, PackageArchitecture, PackagesList};
use crate::error::Result;
use log::debug;

/// Relation fields concatenated when a stanza is seen again.
pub const MERGED_FIELDS: &[&str] = &["Depends", "Provides", "Suggests", "Recommends", "Conflicts"];

/// Fold `new` into `packages` for `arch`.
///
/// Known names gain `arch` in their `Architecture` set (a set, so repeats
/// are absorbed) and have the relation fields appended (a sequence, so
/// repeats are kept). Unknown names are appended with `Architecture` set
/// to just `arch`.
pub fn merge_packages(packages: &mut PackagesList, new: Vec<Package>, arch: &str) -> Result<()> {
    for mut package in new {
        let name = package.name().unwrap_or_default();

        match packages.get_mut(&name) {
            Some(existing) => {
                debug!("merging {} for {}", name, arch);
                match existing.get_mut("Architecture") {
                    Some(FieldValue::Architecture(set)) => {
                        set.insert(arch);
                    }
                    _ => existing.insert("Architecture", PackageArchitecture::single(arch)),
                }

                for field in MERGED_FIELDS {
                    if let Some(relations) = package.relations(field) {
                        existing.extend_relations(field, relations);
                    }
                }
            }
            None => {
                package.insert("Architecture", PackageArchitecture::single(arch));
                packages.append(package)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str, depends: &str) -> Package {
        Package::new()
            .with("Package", name)
            .with("Architecture", "any")
            .with("Depends", depends)
    }

    #[test]
    fn test_new_package_gets_single_arch() {
        let mut packages = PackagesList::new();
        merge_packages(&mut packages, vec![image("a", "kmod")], "amd64").unwrap();
        let merged = packages.get("a").unwrap();
        assert_eq!(merged.architecture().unwrap().to_string(), "amd64");
    }

    #[test]
    fn test_existing_package_unions_arch_and_appends_relations() {
        let mut packages = PackagesList::new();
        merge_packages(&mut packages, vec![image("a", "kmod")], "amd64").unwrap();
        merge_packages(&mut packages, vec![image("a", "udev")], "arm64").unwrap();
        let merged = packages.get("a").unwrap();
        assert_eq!(merged.architecture().unwrap().to_string(), "amd64 arm64");
        assert_eq!(merged.relations("Depends").unwrap().to_string(), "kmod, udev");
        assert_eq!(packages.len(), 1);
    }

    #[test]
    fn test_same_arch_is_set_but_relations_duplicate() {
        let mut packages = PackagesList::new();
        merge_packages(&mut packages, vec![image("a", "kmod")], "amd64").unwrap();
        merge_packages(&mut packages, vec![image("a", "kmod")], "amd64").unwrap();
        let merged = packages.get("a").unwrap();
        assert_eq!(merged.architecture().unwrap().len(), 1);
        assert_eq!(merged.relations("Depends").unwrap().to_string(), "kmod, kmod");
    }

    #[test]
    fn test_missing_field_is_created() {
        let mut packages = PackagesList::new();
        merge_packages(
            &mut packages,
            vec![Package::new().with("Package", "a")],
            "amd64",
        )
        .unwrap();
        merge_packages(
            &mut packages,
            vec![Package::new()
                .with("Package", "a")
                .with("Provides", "platform-modules")],
            "arm64",
        )
        .unwrap();
        let merged = packages.get("a").unwrap();
        assert_eq!(
            merged.relations("Provides").unwrap().to_string(),
            "platform-modules"
        );
    }

    #[test]
    fn test_unmerged_fields_keep_first_value() {
        let mut packages = PackagesList::new();
        let first = image("a", "kmod").with("Replaces", "old");
        let second = image("a", "kmod").with("Replaces", "other");
        merge_packages(&mut packages, vec![first], "amd64").unwrap();
        merge_packages(&mut packages, vec![second], "arm64").unwrap();
        assert_eq!(
            packages.get("a").unwrap().relations("Replaces").unwrap().to_string(),
            "old"
        );
    }

    #[test]
    fn test_first_seen_order_preserved() {
        let mut packages = PackagesList::new();
        merge_packages(&mut packages, vec![image("b", ""), image("a", "")], "amd64").unwrap();
        merge_packages(&mut packages, vec![image("a", ""), image("c", "")], "arm64").unwrap();
        assert_eq!(packages.binary_names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_nameless_stanza_is_rejected() {
        let mut packages = PackagesList::new();
        let result = merge_packages(&mut packages, vec![Package::new()], "amd64");
        assert!(result.is_err());
    }
}
