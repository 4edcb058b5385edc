//! Property-based tests for repository path functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{is_under, normalize, owning_dir, relative_to};
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,8}"
    }

    fn rel_path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("/"))
    }

    proptest! {
        /// Property: normalize is idempotent
        #[test]
        fn normalize_is_idempotent(input in "[a-z./\\\\]{0,20}") {
            let once = normalize(&input);
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: normalized paths never start or end with a separator
        #[test]
        fn normalize_trims_separators(input in "[a-z./]{0,20}") {
            let result = normalize(&input);
            prop_assert!(!result.starts_with('/'));
            prop_assert!(!result.ends_with('/'));
            prop_assert!(!result.contains("//"));
        }
    }

    proptest! {
        /// Property: a directory contains every path built by appending to it
        #[test]
        fn joined_paths_are_under_their_prefix(dir in rel_path(), rest in rel_path()) {
            let file = format!("{}/{}", dir, rest);
            prop_assert!(is_under(&file, &dir));
            prop_assert_eq!(relative_to(&file, &dir), Some(rest.as_str()));
        }

        /// Property: a sibling that merely shares a string prefix is not contained
        #[test]
        fn string_prefix_is_not_containment(dir in rel_path(), suffix in "[a-z]{1,4}", rest in rel_path()) {
            let file = format!("{}{}/{}", dir, suffix, rest);
            prop_assert!(!is_under(&file, &dir));
        }
    }

    proptest! {
        /// Property: the owning directory always contains the file and is the deepest match
        #[test]
        fn owning_dir_is_deepest_container(dirs in prop::collection::vec(rel_path(), 0..6), file in rel_path()) {
            let owner = owning_dir(&file, dirs.iter().map(String::as_str));
            match owner {
                Some(owner) => {
                    prop_assert!(is_under(&file, owner));
                    for dir in &dirs {
                        if is_under(&file, dir) {
                            prop_assert!(dir.len() <= owner.len());
                        }
                    }
                }
                None => {
                    prop_assert!(dirs.iter().all(|dir| !is_under(&file, dir)));
                }
            }
        }
    }
}
