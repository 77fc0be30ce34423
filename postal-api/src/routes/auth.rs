/// Authentication endpoints
///
/// - `POST /v1/auth/signup` - Create credentials and a user row
/// - `POST /v1/auth/login` - Verify a password and get tokens
/// - `POST /v1/auth/logout` - Acknowledge sign-out
/// - `POST /v1/auth/refresh` - Trade a refresh token for a new access token
///
/// Tokens are stateless. Signing out only tells the client to drop them.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use postal_shared::auth::{
    account::{normalize_email, AccountService, SignUp},
    jwt::{self, TokenPair},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Postal address, may be filled in later from settings
    #[serde(default)]
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

impl SignupRequest {
    fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

impl LoginRequest {
    fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// Returned by sign-up and login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: i64,
    pub email: String,
    pub privileged: bool,

    /// Page to open: `/admin` or `/user`
    pub redirect: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub redirect: String,
}

/// Register a new, non-privileged user
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Request validation failed
/// - `400 Bad Request`: Password too weak
/// - `409 Conflict`: "User already registered"
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let req = req.normalized();
    req.validate()?;

    let accounts = AccountService::new(state.services.users.clone());
    let user = accounts
        .sign_up(SignUp {
            email: req.email,
            password: req.password,
            address: req.address,
        })
        .await?;

    let tokens = TokenPair::issue(&user.email, state.jwt_secret())?;

    tracing::info!(user_id = user.id, "User signed up");

    Ok(Json(SessionResponse {
        user_id: user.id,
        redirect: "/user".to_string(),
        email: user.email,
        privileged: user.privileged,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

/// Sign in with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: "Invalid login credentials"
/// - `404 Not Found`: "No user record found for this email."
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let req = req.normalized();
    req.validate()?;

    let accounts = AccountService::new(state.services.users.clone());
    let identity = accounts.sign_in(&req.email, &req.password).await?;
    let tokens = TokenPair::issue(identity.email(), state.jwt_secret())?;

    tracing::info!(user_id = identity.user_id(), "User logged in");

    Ok(Json(SessionResponse {
        user_id: identity.user_id(),
        redirect: identity.landing().to_string(),
        email: identity.user.email,
        privileged: identity.user.privileged,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

pub async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Signed out".to_string(),
        redirect: "/".to_string(),
    })
}

/// Refresh an access token
///
/// # Errors
///
/// - `401 Unauthorized`: Refresh token invalid or expired
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_validation() {
        let valid = SignupRequest {
            email: "user@example.com".to_string(),
            password: "abc12345".to_string(),
            address: String::new(),
        };
        assert!(valid.validate().is_ok());

        let short = SignupRequest {
            password: "abc".to_string(),
            ..valid
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_padded_mixed_case_email_is_accepted() {
        let req = SignupRequest {
            email: " Ana@Example.com ".to_string(),
            password: "abc12345".to_string(),
            address: String::new(),
        }
        .normalized();
        assert_eq!(req.email, "ana@example.com");
        assert!(req.validate().is_ok());

        let login = LoginRequest {
            email: "\tANA@example.com".to_string(),
            password: "abc12345".to_string(),
        }
        .normalized();
        assert_eq!(login.email, "ana@example.com");
        assert!(login.validate().is_ok());
    }

    #[test]
    fn test_signup_address_defaults_empty() {
        let req: SignupRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"abc12345"}"#).unwrap();
        assert_eq!(req.address, "");
    }

    #[tokio::test]
    async fn test_logout_response() {
        let Json(body) = logout().await;
        assert_eq!(body.redirect, "/");
    }
}
