//! Password hashing for local accounts.
//!
//! Stored hashes are Argon2 PHC strings; the salt and parameters travel
//! inside the string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub(crate) fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// `Ok(false)` on a wrong secret; `Err` when `stored` is not a PHC string.
pub(crate) fn verify_secret(secret: &str, stored: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::{hash_secret, verify_secret};

    #[test]
    fn same_secret_hashes_differently_each_time() {
        let first = hash_secret("admin").expect("hash");
        let second = hash_secret("admin").expect("hash");
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
    }

    #[test]
    fn verifies_only_the_original_secret() {
        let hash = hash_secret("s3cret").expect("hash");
        assert_eq!(verify_secret("s3cret", &hash), Ok(true));
        assert_eq!(verify_secret("S3cret", &hash), Ok(false));
    }

    #[test]
    fn rejects_stored_values_that_are_not_phc_strings() {
        assert!(verify_secret("s3cret", "deadbeef").is_err());
    }
}
