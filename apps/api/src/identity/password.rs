use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

const SALT_LEN: usize = 16;

/// Hashes a plaintext credential into an Argon2id PHC string.
pub fn hash_secret(plaintext: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Hash checked when there is no stored secret, so a miss costs one Argon2
/// verification like a wrong password does.
static DUMMY_SECRET: OnceLock<String> = OnceLock::new();

fn dummy_secret() -> &'static str {
    DUMMY_SECRET.get_or_init(|| hash_secret("no-credential-on-file").unwrap_or_default())
}

#[cfg(test)]
thread_local! {
    pub(crate) static ARGON2_VERIFICATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Verifies a plaintext against a stored PHC string. `None` (unknown account
/// or OAuth-only principal) still runs a full verification and never matches.
pub fn verify_stored(stored: Option<&str>, plaintext: &str) -> bool {
    let phc = match stored {
        Some(phc) => phc,
        None => dummy_secret(),
    };
    let matched = match PasswordHash::new(phc) {
        Ok(parsed) => {
            #[cfg(test)]
            ARGON2_VERIFICATIONS.with(|n| n.set(n.get() + 1));
            Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        }
        Err(_) => false,
    };
    matched && stored.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_secret("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_stored(Some(&hash), "correct horse battery"));
        assert!(!verify_stored(Some(&hash), "wrong horse battery"));
    }

    #[test]
    fn test_stored_value_is_never_plaintext_compared() {
        assert!(!verify_stored(Some("hunter22"), "hunter22"));
    }

    #[test]
    fn test_missing_secret_never_verifies() {
        assert!(!verify_stored(None, ""));
        assert!(!verify_stored(None, "no-credential-on-file"));
    }

    #[test]
    fn test_missing_secret_still_runs_argon2() {
        let before = ARGON2_VERIFICATIONS.with(|n| n.get());
        assert!(!verify_stored(None, "whatever"));
        assert_eq!(ARGON2_VERIFICATIONS.with(|n| n.get()), before + 1);
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_secret("same").unwrap(), hash_secret("same").unwrap());
    }
}
