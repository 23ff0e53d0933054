//! Password hashing, verification, and policy checks.
//!
//! Hashes are Argon2id PHC strings with a fresh random salt per call, so two
//! hashes of the same password always differ. Verification is delegated to
//! the argon2 crate, which compares digests in constant time.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

use crate::api::error::ErrorKind;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 256;

/// Hash a password into an Argon2id PHC string.
///
/// # Errors
/// Returns an error if hashing fails (effectively only on salt generation
/// or parameter problems).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a password against a stored PHC hash.
///
/// Unknown or legacy hash algorithms verify as `false` (the account simply
/// cannot log in with that hash); a hash that does not even parse as a PHC
/// string is reported as [`ErrorKind::CorruptCredential`] since it means the
/// stored record is damaged.
///
/// # Errors
/// Returns [`ErrorKind::CorruptCredential`] for unparseable stored hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ErrorKind> {
    let parsed = PasswordHash::new(hash).map_err(|_| ErrorKind::CorruptCredential)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        // Unsupported algorithm, version, or parameters: treat as mismatch.
        Err(_) => Ok(false),
    }
}

/// Check the signup/reset password policy.
///
/// Length must be within `[8, 256]` characters and the password must contain
/// at least one uppercase letter, one lowercase letter, one digit, and one
/// symbol (any non-alphanumeric character). Pure function, no I/O.
#[must_use]
pub fn password_policy_ok(password: &str) -> bool {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LEN || length > PASSWORD_MAX_LEN {
        return false;
    }
    let upper = password.chars().any(char::is_uppercase);
    let lower = password.chars().any(char::is_lowercase);
    let digit = password.chars().any(char::is_numeric);
    let symbol = password.chars().any(|c| !c.is_alphanumeric());
    upper && lower && digit && symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejects_each_missing_class() {
        assert!(!password_policy_ok("short"));
        assert!(!password_policy_ok("NoDigits!"));
        assert!(!password_policy_ok("noupper1!"));
        assert!(!password_policy_ok("NOLOWER1!"));
        assert!(!password_policy_ok("NoSymbol1"));
        assert!(password_policy_ok("GoodPass1!"));
    }

    #[test]
    fn policy_enforces_length_bounds() {
        // 7 characters with all classes still fails.
        assert!(!password_policy_ok("Aa1!xyz"));
        assert!(password_policy_ok("Aa1!xyzw"));

        let mut long = String::from("Aa1!");
        long.push_str(&"x".repeat(252));
        assert_eq!(long.chars().count(), 256);
        assert!(password_policy_ok(&long));
        long.push('x');
        assert!(!password_policy_ok(&long));
    }

    #[test]
    fn policy_counts_unicode_symbols() {
        // Non-alphanumeric unicode counts as the symbol class.
        assert!(password_policy_ok("GoodPass1\u{2713}"));
    }

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("Complex1!").expect("hash");
        assert!(verify_password("Complex1!", &hash).expect("verify"));
        assert!(!verify_password("Complex2!", &hash).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("Complex1!").expect("hash");
        let second = hash_password("Complex1!").expect("hash");
        assert_ne!(first, second);
        assert!(verify_password("Complex1!", &first).expect("verify"));
        assert!(verify_password("Complex1!", &second).expect("verify"));
    }

    #[test]
    fn malformed_hash_is_corrupt() {
        assert!(matches!(
            verify_password("Complex1!", "not-a-phc-string"),
            Err(ErrorKind::CorruptCredential)
        ));
    }

    #[test]
    fn unknown_algorithm_verifies_false() {
        // A well-formed PHC string for an algorithm we do not support.
        let legacy = "$scrypt$ln=16,r=8,p=1$aM15713r3Xsvxbi31lqr1Q$nFNh2CVHVjNldFVKDHDlm4CmdRSCdEBsjjJxD+iCs5E";
        assert!(!verify_password("Complex1!", legacy).expect("verify"));
    }
}
