//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::principal::Role;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Current TOTP code, required once the account has MFA enrolled.
    #[serde(default)]
    pub totp: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CsrfResponse {
    pub csrf: String,
}

#[derive(IntoParams, Deserialize, Debug)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaEnrollResponse {
    pub secret: String,
    pub otpauth: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaVerifyRequest {
    pub mfa_token: String,
    pub code: String,
}

/// 401 body for logins that passed the password check but still need a TOTP
/// code. The challenge token feeds `/auth/mfa/totp/verify`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaChallengeResponse {
    pub detail: String,
    pub mfa_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_totp_is_optional() {
        let decoded: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw"}"#).expect("decode");
        assert_eq!(decoded.email, "a@x.com");
        assert!(decoded.totp.is_none());

        let decoded: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw","totp":"123456"}"#)
                .expect("decode");
        assert_eq!(decoded.totp.as_deref(), Some("123456"));
    }

    #[test]
    fn user_response_round_trips() {
        let response = UserResponse {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            email: "a@x.com".to_string(),
            role: Role::Student,
            email_verified: false,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["role"], "student");
        let decoded: UserResponse = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded.role, Role::Student);
    }

    #[test]
    fn mfa_challenge_response_shape() {
        let response = MfaChallengeResponse {
            detail: "MFA code required".to_string(),
            mfa_token: "tok".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["mfa_token"], "tok");
    }
}
