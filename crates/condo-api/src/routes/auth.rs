//! # Login
//!
//! `POST /login` exchanges a DNI and password for a session token. Mounted
//! outside the auth middleware and behind the login rate limiter.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use condo_core::resident::find_by_dni;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::auth::verify_password;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "invalid DNI or password";

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Login credentials.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub dni: String,
    #[schema(value_type = String, format = Password)]
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("dni", &self.dni)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), String> {
        if self.dni.trim().is_empty() {
            return Err("dni must not be empty".into());
        }
        if self.password.is_empty() {
            return Err("password must not be empty".into());
        }
        Ok(())
    }
}

/// Issued session token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Role of the account (`ADMIN`, `TESORERIA`, `CONDOMINO`).
    pub rol: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

/// POST /login: Authenticate and issue a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid DNI or password", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 429, description = "Too many login attempts", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    tag = "auth"
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let ledger = state.ledger()?;
    let users = ledger.users().await?;
    let user = find_by_dni(&users, &req.dni).cloned();

    let verified = verify_password(req.password, user.as_ref().map(|u| u.password_hash.clone())).await;
    let user = match user {
        Some(user) if verified => user,
        _ => {
            state.metrics.record_login("invalid_credentials");
            tracing::info!("login rejected: invalid credentials");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let Some(role) = user.role else {
        state.metrics.record_login("unknown_role");
        tracing::warn!(dni = %user.dni, "login rejected: account has no valid role");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let issued = state.tokens.issue(&user.dni, user.house, role, Utc::now())?;
    state.metrics.record_login("success");
    tracing::info!(dni = %user.dni, role = %role, "login succeeded");

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        rol: role.as_str().to_string(),
        expires_in: issued.expires_in,
    }))
}
