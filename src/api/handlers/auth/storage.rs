//! Database helpers for users, sessions, and single-use tokens.
//!
//! Expiry is always evaluated in SQL at read/consume time; nothing here
//! depends on the background sweeper having run. Token and session
//! consumption are single conditional statements so concurrent requests
//! cannot both redeem the same row.

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, warn};
use uuid::Uuid;

use super::principal::Role;
use super::utils::{generate_token, hash_token, is_transient, is_unique_violation};

/// Backoff before the single internal retry on transient errors.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Outcome when attempting to create a new user row.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created(Uuid),
    /// The email is already registered.
    Conflict,
}

/// Purpose tag for single-use tokens. Consumption requires both the token
/// value and the purpose to match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TokenPurpose {
    Verify,
    Reset,
    Mfa,
}

impl TokenPurpose {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Verify => "verify",
            Self::Reset => "reset",
            Self::Mfa => "mfa",
        }
    }
}

/// Full user row as the handlers need it.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) email_verified: bool,
    pub(crate) role: Role,
    pub(crate) totp_secret: Option<String>,
    pub(crate) created_at: String,
}

/// Result of resolving a session cookie hash.
#[derive(Debug)]
pub(crate) struct SessionLookup {
    /// The stored expiry has passed. Expired rows are not deleted here; the
    /// sweeper handles that.
    pub(crate) expired: bool,
    /// Owning user, absent when the session is orphaned.
    pub(crate) user: Option<UserRecord>,
}

const USER_COLUMNS: &str = r#"
    users.id, users.email, users.password_hash, users.email_verified,
    users.role, users.totp_secret,
    to_char(users.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
"#;

fn row_to_user(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    let role = Role::from_str(&role).ok_or_else(|| anyhow!("unknown role in database: {role}"))?;
    Ok(UserRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        email_verified: row.get("email_verified"),
        role,
        totp_secret: row.get("totp_secret"),
        created_at: row.get("created_at"),
    })
}

/// Insert a new unverified student account. Email uniqueness is enforced by
/// the database; a duplicate maps to [`SignupOutcome::Conflict`].
pub(crate) async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users (email, password_hash)
        VALUES ($1, $2)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;
    row.as_ref().map(row_to_user).transpose()
}

pub(crate) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;
    row.as_ref().map(row_to_user).transpose()
}

/// Store a new TOTP secret, replacing any previous one. Re-enrollment
/// invalidates the prior secret immediately.
pub(crate) async fn set_totp_secret(pool: &PgPool, user_id: Uuid, secret: &str) -> Result<()> {
    let query = "UPDATE users SET totp_secret = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(secret)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set TOTP secret")?;
    Ok(())
}

/// Issue a single-use token: generate a random value, store its digest with
/// the purpose and expiry, and return the raw token for delivery.
///
/// Multiple outstanding tokens per (user, purpose) may coexist; consuming
/// any valid one deletes only that row.
pub(crate) async fn issue_token(
    pool: &PgPool,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_seconds: i64,
) -> Result<String> {
    let query = r"
        INSERT INTO auth_tokens (user_id, token_hash, purpose, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(purpose.as_str())
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert token"),
        }
    }

    Err(anyhow!("failed to generate unique token"))
}

/// Look up the owner of a still-valid token without consuming it.
pub(crate) async fn peek_token_user(
    pool: &PgPool,
    token_hash: &[u8],
    purpose: TokenPurpose,
) -> Result<Option<Uuid>> {
    let query = r"
        SELECT user_id
        FROM auth_tokens
        WHERE token_hash = $1
          AND purpose = $2
          AND expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup token")?;
    Ok(row.map(|row| row.get("user_id")))
}

/// Consume a token atomically: one conditional delete that only succeeds for
/// an unexpired row matching both value and purpose. Two concurrent calls
/// can never both succeed for the same row.
pub(crate) async fn consume_token(
    pool: &PgPool,
    token_hash: &[u8],
    purpose: TokenPurpose,
) -> Result<Option<Uuid>> {
    let query = CONSUME_TOKEN_QUERY;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );

    for attempt in 0..2 {
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(row) => return Ok(row.map(|row| row.get("user_id"))),
            Err(err) if attempt == 0 && is_transient(&err) => {
                warn!("Retrying token consume after transient error: {err}");
                sleep(RETRY_BACKOFF).await;
            }
            Err(err) => return Err(err).context("failed to consume token"),
        }
    }

    Err(anyhow!("token consume retries exhausted"))
}

const CONSUME_TOKEN_QUERY: &str = r"
        DELETE FROM auth_tokens
        WHERE token_hash = $1
          AND purpose = $2
          AND expires_at > NOW()
        RETURNING user_id
    ";

async fn consume_token_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    token_hash: &[u8],
    purpose: TokenPurpose,
) -> Result<Option<Uuid>> {
    let query = CONSUME_TOKEN_QUERY;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(purpose.as_str())
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume token")?;
    Ok(row.map(|row| row.get("user_id")))
}

/// Consume a verification token and mark the owning user verified, in one
/// transaction so a crash cannot burn the token without flipping the flag.
pub(crate) async fn redeem_verification_token(pool: &PgPool, token_hash: &[u8]) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    let Some(user_id) = consume_token_tx(&mut tx, token_hash, TokenPurpose::Verify).await? else {
        let _ = tx.rollback().await;
        return Ok(false);
    };

    let query = "UPDATE users SET email_verified = TRUE WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;

    tx.commit().await.context("commit verify transaction")?;
    Ok(true)
}

/// Consume a reset token and replace the owner's password hash, in one
/// transaction.
pub(crate) async fn redeem_reset_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let Some(user_id) = consume_token_tx(&mut tx, token_hash, TokenPurpose::Reset).await? else {
        let _ = tx.rollback().await;
        return Ok(false);
    };

    let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    tx.commit().await.context("commit reset transaction")?;
    Ok(true)
}

/// Create a session row and return the raw cookie value. One new row per
/// call; concurrent sessions per user are allowed.
pub(crate) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    let query = r"
        INSERT INTO sessions (token_hash, user_id, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_token()?;
        let token_hash = hash_token(&token);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve a session cookie hash. Expired rows are reported, not deleted;
/// an orphaned session (user deleted) comes back with `user: None`.
pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionLookup>> {
    let query = format!(
        r"
        SELECT sessions.expires_at <= NOW() AS expired, {USER_COLUMNS}
        FROM sessions
        LEFT JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = $1
        LIMIT 1
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );

    for attempt in 0..2 {
        let result = sqlx::query(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(None) => return Ok(None),
            Ok(Some(row)) => {
                let expired: bool = row.get("expired");
                let user = match row.get::<Option<Uuid>, _>("id") {
                    Some(_) => Some(row_to_user(&row)?),
                    None => None,
                };
                return Ok(Some(SessionLookup { expired, user }));
            }
            Err(err) if attempt == 0 && is_transient(&err) => {
                warn!("Retrying session lookup after transient error: {err}");
                sleep(RETRY_BACKOFF).await;
            }
            Err(err) => return Err(err).context("failed to lookup session"),
        }
    }

    Err(anyhow!("session lookup retries exhausted"))
}

/// Delete a session row. Idempotent: revoking an unknown id is not an error.
pub(crate) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    let query = "DELETE FROM sessions WHERE token_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Housekeeping for the background sweeper: drop expired sessions and
/// tokens. Correctness never depends on this running.
pub(crate) async fn purge_expired(pool: &PgPool) -> Result<(u64, u64)> {
    let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let sessions = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired sessions")?
        .rows_affected();

    let query = "DELETE FROM auth_tokens WHERE expires_at <= NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let tokens = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to purge expired tokens")?
        .rows_affected();

    Ok((sessions, tokens))
}

#[cfg(test)]
mod tests {
    use super::{SignupOutcome, TokenPurpose};
    use uuid::Uuid;

    #[test]
    fn signup_outcome_debug_names() {
        let created = format!("{:?}", SignupOutcome::Created(Uuid::nil()));
        assert!(created.starts_with("Created"));
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[test]
    fn token_purpose_tags() {
        assert_eq!(TokenPurpose::Verify.as_str(), "verify");
        assert_eq!(TokenPurpose::Reset.as_str(), "reset");
        assert_eq!(TokenPurpose::Mfa.as_str(), "mfa");
    }
}
