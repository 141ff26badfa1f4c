//! Handlers for the `/auth` resource: login, sessions, password reset, SSO.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use intake_core::error::CoreError;
use intake_core::otp::{check_otp, generate_otp, OTP_VALIDITY_MINS};
use intake_core::types::DbId;
use intake_core::validation::normalize_email;
use intake_db::bootstrap::TEMPLATE_FORGOT_PASSWORD_OTP;
use intake_db::models::session::CreateSession;
use intake_db::models::user::{User, UserResponse};
use intake_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, generate_reset_token, hash_refresh_token,
    validate_reset_token,
};
use crate::auth::password::{hash_new_password, verify_password};
use crate::auth::sso::{self, SsoError};
use crate::error::{AppError, AppResult};
use crate::handlers::users::user_response;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for `POST /auth/token/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Request body for `POST /auth/logout`. Without a refresh token every
/// session of the caller is revoked.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// `otp` may arrive as a string or a number.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: Option<String>,
    pub new_password: Option<String>,
}

/// Body of the OAuth callbacks.
#[derive(Debug, Deserialize)]
pub struct AuthorizationCode {
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Payload returned by password and Microsoft sign-in.
#[derive(Debug, Serialize)]
pub struct LoginData {
    pub user_id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token: TokenPair,
}

// ---------------------------------------------------------------------------
// Sign-in and sessions
// ---------------------------------------------------------------------------

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<ApiResponse<LoginData>> {
    let (Some(email), Some(password)) = (non_blank(input.email), non_blank(input.password)) else {
        return Err(AppError::BadRequest("Email and password are required.".into()));
    };

    // Unknown, deleted, inactive and wrong-password all look the same.
    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&email))
        .await?
        .filter(User::can_sign_in)
        .ok_or_else(|| AppError::BadRequest(INVALID_CREDENTIALS.into()))?;

    let password_valid = verify_password(&password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Rejected login with wrong password");
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.into()));
    }

    let data = sign_in(&state, &user).await?;
    Ok(ApiResponse::ok("Login successful.", data))
}

/// POST /auth/token/refresh
///
/// Exchange a live refresh token for a new pair. The old session is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    let token = non_blank(input.refresh)
        .ok_or_else(|| AppError::BadRequest("Refresh token is required.".into()))?;
    let unauthorized =
        || AppError::Core(CoreError::Unauthorized("Invalid or expired refresh token".into()));

    let session = SessionRepo::find_active(&state.pool, &hash_refresh_token(&token))
        .await?
        .ok_or_else(unauthorized)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .filter(User::can_sign_in)
        .ok_or_else(unauthorized)?;

    let role_name = role_name(&state, &user).await?;
    let access = generate_access_token(user.id, &role_name, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let (refresh, refresh_hash) = generate_refresh_token();

    SessionRepo::rotate(&state.pool, session.id, &new_session(&state, user.id, refresh_hash))
        .await?
        .ok_or_else(unauthorized)?;

    Ok(ApiResponse::ok(
        "Token refreshed successfully.",
        TokenPair { refresh, access },
    ))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Option<Json<LogoutRequest>>,
) -> AppResult<ApiResponse<Value>> {
    let refresh = body.and_then(|Json(b)| non_blank(b.refresh));
    match refresh {
        Some(token) => {
            SessionRepo::revoke_by_hash(&state.pool, auth_user.user_id, &hash_refresh_token(&token))
                .await?;
        }
        None => {
            SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
        }
    }
    Ok(ApiResponse::message("Logged out successfully."))
}

/// GET /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    let data = user_response(&state, &user).await?;
    Ok(ApiResponse::ok("User details fetched successfully.", data))
}

// ---------------------------------------------------------------------------
// Forgot password
// ---------------------------------------------------------------------------

/// POST /auth/forgot-password/email
///
/// Issue a fresh code. Delivery problems are logged, not surfaced, so the
/// response does not reveal mail server state.
pub async fn forgot_password_email(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<ApiResponse<Value>> {
    let email = non_blank(input.email)
        .map(|e| normalize_email(&e))
        .ok_or_else(|| AppError::BadRequest("Email is required".into()))?;

    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::BadRequest("No user registered with this email.".into()))?;

    let code = generate_otp();
    UserRepo::set_otp(&state.pool, user.id, &code, Utc::now()).await?;
    state.otp_cache.store(&user.email, &code);

    match &state.mailer {
        Some(mailer) => {
            let context = HashMap::from([
                ("first_name", user.first_name.clone()),
                ("otp", code),
                ("validity_mins", OTP_VALIDITY_MINS.to_string()),
            ]);
            if let Err(e) = mailer
                .send_template(&state.pool, &user.email, TEMPLATE_FORGOT_PASSWORD_OTP, &context)
                .await
            {
                tracing::error!(user_id = user.id, error = %e, "Failed to send verification code");
            }
        }
        None => {
            tracing::warn!(user_id = user.id, "SMTP not configured, verification code not emailed");
        }
    }

    Ok(ApiResponse::ok(
        "Verification code sent successfully.",
        serde_json::json!({ "email": user.email }),
    ))
}

/// POST /auth/forgot-password/verify
///
/// A valid code is consumed and traded for a five minute reset token. The
/// code must match the stored one within its validity window and still be
/// live in the OTP cache.
pub async fn forgot_password_verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyOtpRequest>,
) -> AppResult<ApiResponse<Value>> {
    let email = non_blank(input.email).map(|e| normalize_email(&e));
    let otp = input.otp.and_then(|v| match v {
        Value::String(s) => non_blank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let (Some(email), Some(otp)) = (email, otp) else {
        return Err(AppError::BadRequest("Invalid data".into()));
    };

    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::BadRequest("User not found.".into()))?;

    let check = check_otp(user.otp_code.as_deref(), user.otp_created_at, &otp, Utc::now());
    if !check.is_valid() {
        tracing::info!(user_id = user.id, outcome = ?check, "OTP rejected");
        return Err(AppError::BadRequest("OTP is incorrect or expired.".into()));
    }

    // The cache entry carries the shorter reset-flow TTL.
    if state.otp_cache.get(&user.email).as_deref() != Some(otp.trim()) {
        tracing::info!(user_id = user.id, "OTP cache entry missing or expired");
        return Err(AppError::BadRequest("OTP is incorrect or expired.".into()));
    }

    // A concurrent verify may have consumed the same code first.
    if !UserRepo::consume_otp(&state.pool, user.id, otp.trim()).await? {
        return Err(AppError::BadRequest("OTP is incorrect or expired.".into()));
    }
    state.otp_cache.clear(&user.email);

    let role_name = role_name(&state, &user).await?;
    let reset_token = generate_reset_token(user.id, &role_name, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(ApiResponse::ok(
        "OTP verified successfully.",
        serde_json::json!({ "reset_token": reset_token }),
    ))
}

/// POST /auth/forgot-password/reset
pub async fn forgot_password_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<ApiResponse<Value>> {
    let (Some(token), Some(new_password)) =
        (non_blank(input.reset_token), non_blank(input.new_password))
    else {
        return Err(AppError::BadRequest(
            "reset_token and new_password are required.".into(),
        ));
    };

    let claims = validate_reset_token(&token, &state.config.jwt)
        .map_err(|_| AppError::BadRequest(INVALID_RESET_TOKEN.into()))?;
    let user = UserRepo::find_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN.into()))?;

    let password_hash = hash_new_password(&new_password)?;
    if !UserRepo::reset_password(&state.pool, user.id, &password_hash).await? {
        return Err(AppError::BadRequest(INVALID_RESET_TOKEN.into()));
    }

    tracing::info!(user_id = user.id, "Password reset, sessions revoked");
    Ok(ApiResponse::message("Password updated successfully."))
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// POST /auth/login/microsoft
///
/// Sign in an existing account with a Microsoft authorization code. No
/// account is created on the fly.
pub async fn login_microsoft(
    State(state): State<AppState>,
    Json(input): Json<AuthorizationCode>,
) -> AppResult<ApiResponse<LoginData>> {
    let code = non_blank(input.code)
        .ok_or_else(|| AppError::BadRequest("Authorization code is required.".into()))?;
    let client = state
        .config
        .microsoft
        .as_ref()
        .ok_or_else(|| AppError::InternalError("Microsoft sign-in is not configured".into()))?;
    let endpoints = &state.config.endpoints;

    let access_token =
        sso::exchange_microsoft_code(&state.http, &endpoints.microsoft_token_url, client, &code)
            .await
            .map_err(|e| sso_error("Invalid access.", e))?;

    let profile = sso::fetch_microsoft_profile(&state.http, &endpoints.graph_base, &access_token)
        .await
        .map_err(|e| sso_error("Invalid access.", e))?;
    let email = profile
        .email()
        .map(normalize_email)
        .ok_or_else(|| AppError::BadRequest("Microsoft account does not have an email.".into()))?;

    let user = UserRepo::find_by_email(&state.pool, &email)
        .await?
        .filter(User::can_sign_in)
        .ok_or_else(|| AppError::NotFound("Not registered, please contact admin.".into()))?;

    let data = sign_in(&state, &user).await?;
    Ok(ApiResponse::ok("Login successful.", data))
}

/// POST /auth/login/dropbox
///
/// Returns the raw Dropbox token response for use with the file endpoints.
pub async fn login_dropbox(
    State(state): State<AppState>,
    Json(input): Json<AuthorizationCode>,
) -> AppResult<ApiResponse<Value>> {
    let code = non_blank(input.code)
        .ok_or_else(|| AppError::BadRequest("Authorization code is required.".into()))?;
    let client = state
        .config
        .dropbox
        .as_ref()
        .ok_or_else(|| AppError::InternalError("Dropbox is not configured".into()))?;

    let token = sso::exchange_dropbox_code(
        &state.http,
        &state.config.endpoints.dropbox_token_url,
        client,
        &code,
    )
    .await
    .map_err(|e| sso_error("Failed to get access token from Dropbox.", e))?;

    Ok(ApiResponse::ok("Dropbox token retrieved successfully.", token))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sso_error(rejected_message: &str, err: SsoError) -> AppError {
    match err {
        SsoError::Rejected { detail, .. } => AppError::Rejected {
            message: rejected_message.to_string(),
            errors: detail,
        },
        other => AppError::InternalError(other.to_string()),
    }
}

async fn role_name(state: &AppState, user: &User) -> AppResult<String> {
    Ok(RoleRepo::resolve_name(&state.pool, user.role_id)
        .await?
        .unwrap_or_default())
}

fn new_session(state: &AppState, user_id: DbId, refresh_token_hash: String) -> CreateSession {
    CreateSession {
        user_id,
        refresh_token_hash,
        expires_at: Utc::now() + chrono::Duration::days(state.config.jwt.refresh_token_expiry_days),
        user_agent: None,
        ip_address: None,
    }
}

/// Issue tokens, persist the session and stamp the login time.
async fn sign_in(state: &AppState, user: &User) -> AppResult<LoginData> {
    let role_name = role_name(state, user).await?;
    let access = generate_access_token(user.id, &role_name, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let (refresh, refresh_hash) = generate_refresh_token();

    SessionRepo::create(&state.pool, &new_session(state, user.id, refresh_hash)).await?;
    UserRepo::record_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "User signed in");

    Ok(LoginData {
        user_id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        token: TokenPair { refresh, access },
    })
}
