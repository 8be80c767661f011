//! Property-based tests for configuration merging
//!
//! These tests use proptest to generate random option values and verify the
//! precedence rules of `ConfigTree::merge` hold for any input.

#[cfg(test)]
mod proptest_tests {
    use crate::config::{ConfigTree, ConfigValue, Options, Qualifiers};
    use proptest::prelude::*;

    fn option_key() -> impl Strategy<Value = String> {
        "[a-z][a-z-]{0,12}"
    }

    fn option_value() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9._-]{0,16}"
    }

    proptest! {
        /// A key set at the flavour level always shadows the base level.
        #[test]
        fn flavour_overrides_base(
            key in option_key(),
            base_value in option_value(),
            flavour_value in option_value(),
        ) {
            let mut tree = ConfigTree::new();
            tree.insert("base", Qualifiers::NONE, Options::default().with(&key, base_value.as_str()));
            tree.insert(
                "base",
                Qualifiers::triplet("amd64", "none", "default"),
                Options::default().with(&key, flavour_value.as_str()),
            );

            let merged = tree.merge("base", Qualifiers::triplet("amd64", "none", "default"));
            prop_assert_eq!(merged.require_str(&key).unwrap(), flavour_value);
        }

        /// A key only set at the base level survives every merge.
        #[test]
        fn base_value_inherited(
            key in option_key(),
            value in option_value(),
        ) {
            let mut tree = ConfigTree::new();
            tree.insert("base", Qualifiers::NONE, Options::default().with(&key, value.as_str()));
            tree.insert(
                "base",
                Qualifiers::arch("amd64"),
                Options::default().with("unrelated-key-that-is-long", "x"),
            );

            for qualifiers in [
                Qualifiers::NONE,
                Qualifiers::arch("amd64"),
                Qualifiers::featureset("rt"),
                Qualifiers::arch_featureset("amd64", "rt"),
                Qualifiers::triplet("amd64", "rt", "default"),
            ] {
                let merged = tree.merge("base", qualifiers);
                prop_assert_eq!(merged.require_str(&key).unwrap(), value.clone());
            }
        }

        /// Absent keys fall back to the default or fail on direct access.
        #[test]
        fn absent_key_default_or_error(
            key in option_key(),
            default in option_value(),
        ) {
            let tree = ConfigTree::new();
            let qualifiers = Qualifiers::triplet("amd64", "none", "default");

            let value = tree.get_merge("base", qualifiers, &key, ConfigValue::String(default.clone()));
            prop_assert_eq!(value, ConfigValue::String(default));
            prop_assert!(tree.merge("base", qualifiers).require(&key).is_err());
        }
    }
}
