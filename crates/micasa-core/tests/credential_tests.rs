use micasa_core::{normalize_name, CredentialHasher, HashParams, User};
use proptest::prelude::*;

#[test]
fn test_set_password_then_check() {
    let hasher = CredentialHasher::with_params(HashParams::TESTING);
    let mut user = User::new("Doctor", "John Smith");

    user.set_password_with(&hasher, "secret").unwrap();

    assert!(user.check_password("secret").is_ok());
    assert!(user.check_password("wrong").is_err());
    assert_ne!(user.password_hash, "secret");
    assert!(!user.password_hash.contains("secret"));
}

#[test]
fn test_check_password_without_hash_fails() {
    let user = User::new("tardis", "Time And Relative Dimensions In Space");
    assert!(user.check_password("").is_err());
}

#[test]
fn test_current_params_are_v1() {
    assert_eq!(HashParams::CURRENT, HashParams::V1);
    assert_eq!(CredentialHasher::new().params(), HashParams::V1);
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(name in "[a-zA-ZÀ-ÞÀ-ÿ0-9 ._-]{0,24}") {
        let once = normalize_name(&name);
        prop_assert_eq!(normalize_name(&once), once.clone());
    }

    #[test]
    fn prop_case_variants_normalize_equal(name in "[a-zA-Z0-9_]{1,16}") {
        prop_assert_eq!(
            normalize_name(&name.to_uppercase()),
            normalize_name(&name.to_lowercase())
        );
    }
}
