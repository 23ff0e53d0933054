//! Time-based one-time-password engine for MFA enrollment and login.
//!
//! Codes are standard RFC 6238: HMAC-SHA1, 6 digits, 30-second steps. A code
//! is accepted for the current step and one adjacent step in either
//! direction to tolerate client clock skew. Replay of a code inside that
//! tolerance window is not prevented here.

use anyhow::{Context, Result, anyhow};
use data_encoding::BASE32;
use rand::{RngCore, rngs::OsRng};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

/// 160-bit shared secret, the standard length for authenticator apps
/// (32 base32 characters, no padding).
const SECRET_BYTES: usize = 20;
const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
const SKEW_STEPS: u8 = 1;

/// Stateless TOTP operations bound to a provisioning issuer name.
#[derive(Clone, Debug)]
pub struct TotpEngine {
    issuer: String,
}

impl TotpEngine {
    #[must_use]
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Generate a fresh random shared secret, base32-encoded.
    ///
    /// # Errors
    /// Returns an error if the system randomness source fails.
    pub fn generate_secret(&self) -> Result<String> {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate TOTP secret")?;
        Ok(BASE32.encode(&bytes))
    }

    /// Build the `otpauth://totp/...` enrollment URI for authenticator apps.
    ///
    /// Pure formatting; the secret is embedded verbatim (base32 is already
    /// URI-safe), issuer and label are percent-encoded.
    #[must_use]
    pub fn provisioning_uri(&self, secret: &str, account_label: &str) -> String {
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
            urlencoding::encode(&self.issuer),
            urlencoding::encode(account_label),
            secret,
            urlencoding::encode(&self.issuer),
            DIGITS,
            STEP_SECONDS,
        )
    }

    /// Check a submitted code against the secret for the current time step,
    /// tolerating one step of clock skew in either direction.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn verify_code(&self, secret: &str, code: &str) -> Result<bool> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        self.verify_code_at(secret, code, now)
    }

    /// Same as [`verify_code`](Self::verify_code) with an explicit unix
    /// timestamp, so callers and tests can pin the clock.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn verify_code_at(&self, secret: &str, code: &str, unix_time: u64) -> Result<bool> {
        let totp = self.build(secret)?;
        Ok(totp.check(code.trim(), unix_time))
    }

    fn build(&self, secret: &str) -> Result<TOTP> {
        let secret_bytes = Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|err| anyhow!("invalid TOTP secret: {err:?}"))?;
        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW_STEPS,
            STEP_SECONDS,
            secret_bytes,
        )
        .map_err(|err| anyhow!("failed to build TOTP: {err}"))
    }
}
