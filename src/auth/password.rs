use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_hash_verifies_the_original_password() {
        let hash = hash_password("mvua-za-aprili-2024").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("mvua-za-aprili-2024", &hash).unwrap());
    }

    #[test]
    fn close_but_wrong_password_fails_verification() {
        let hash = hash_password("duka-kuu-001").unwrap();
        assert!(!verify_password("duka-kuu-002", &hash).unwrap());
    }

    #[test]
    fn equal_passwords_hash_differently() {
        // Per-hash salt; equal inputs must not produce equal PHC strings.
        let a = hash_password("jua-kali-99").unwrap();
        let b = hash_password("jua-kali-99").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "plainly-not-a-phc-string").is_err());
    }
}
