//! # Authentication & Authorization
//!
//! HS256 bearer tokens with role-based access control.
//!
//! ## Token Format
//!
//! ```text
//! Authorization: Bearer <jwt>
//! claims: { "sub": <DNI>, "ID_CASA": <house>, "ROL": <role>, "iat", "exp" }
//! ```
//!
//! [`auth_middleware`] validates the token and injects a [`CallerIdentity`]
//! into the request extensions. Handlers extract it and check roles with
//! [`require_role`] / [`require_any_role`]. Every authentication failure is
//! a 401 carrying `WWW-Authenticate: Bearer`; a role mismatch is a 403.
//!
//! Passwords are bcrypt hashes in the `PASSWORD_HASH` column. Lookups for
//! unknown users still run one bcrypt verification against a dummy hash.

use std::sync::{Arc, OnceLock};

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use condo_core::{HouseId, Role};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::AppError;

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

// ── Claims ──────────────────────────────────────────────────────────────────

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The user's DNI.
    pub sub: String,
    #[serde(rename = "ID_CASA", default, skip_serializing_if = "Option::is_none")]
    pub house: Option<HouseId>,
    #[serde(rename = "ROL")]
    pub role: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, available to all route handlers
/// via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub dni: String,
    /// House bound to the account; staff accounts may have none.
    pub house: Option<HouseId>,
    pub role: Role,
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// 403 unless the caller has exactly `role`.
pub fn require_role(caller: &CallerIdentity, role: Role) -> Result<(), AppError> {
    require_any_role(caller, &[role])
}

/// 403 unless the caller's role is one of `allowed`.
pub fn require_any_role(caller: &CallerIdentity, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&caller.role) {
        Ok(())
    } else {
        let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
        Err(AppError::Forbidden(format!(
            "role {} required, caller has '{}'",
            names.join(" or "),
            caller.role
        )))
    }
}

// ── Token authority ─────────────────────────────────────────────────────────

/// A signed session token and its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Issues and validates session tokens with one HS256 secret.
///
/// Custom `Debug` hides the key material.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    ephemeral: bool,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("secret", &"[REDACTED]")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}

impl TokenAuthority {
    /// Authority signing with `secret`. Tokens live `ttl_minutes`.
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::minutes(ttl_minutes),
            ephemeral: false,
        }
    }

    /// Authority with a random 256-bit secret. Tokens die with the process.
    pub fn ephemeral(ttl_minutes: i64) -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut secret[..]);
        Self {
            ephemeral: true,
            ..Self::new(&secret[..], ttl_minutes)
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Sign a token for `dni` issued at `issued_at`.
    pub fn issue(
        &self,
        dni: &str,
        house: Option<HouseId>,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let claims = Claims {
            sub: dni.to_string(),
            house,
            role: role.as_str().to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;
        Ok(IssuedToken {
            token,
            expires_in: self.ttl_secs(),
        })
    }

    /// Validate `token` and return the caller it names.
    pub fn verify(&self, token: &str) -> Result<CallerIdentity, String> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => "token expired".to_string(),
                ErrorKind::InvalidSignature => "invalid token signature".to_string(),
                ErrorKind::MissingRequiredClaim(claim) => format!("token missing claim '{claim}'"),
                _ => "could not validate credentials".to_string(),
            })?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err("token missing claim 'sub'".into());
        }
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| "token carries an unknown role".to_string())?;
        Ok(CallerIdentity {
            dni: claims.sub,
            house: claims.house,
            role,
        })
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Validate the bearer token and inject [`CallerIdentity`] for handlers.
///
/// The [`TokenAuthority`] comes from an `Extension` layer. Without one,
/// every request is rejected.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(authority) = request.extensions().get::<Arc<TokenAuthority>>().cloned() else {
        tracing::error!("auth middleware mounted without a token authority");
        return unauthorized_response("authentication is not configured");
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header.map(|h| h.split_once(' ')) {
        Some(Some((scheme, token))) if scheme.eq_ignore_ascii_case("bearer") => {
            match authority.verify(token.trim()) {
                Ok(identity) => {
                    request.extensions_mut().insert(identity);
                    next.run(request).await
                }
                Err(msg) => {
                    tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                    unauthorized_response(&msg)
                }
            }
        }
        Some(_) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("not authenticated")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

// ── Passwords ───────────────────────────────────────────────────────────────

const DUMMY_PASSWORD: &str = "condo-dummy-password";

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| bcrypt::hash(DUMMY_PASSWORD, bcrypt::DEFAULT_COST).ok())
        .as_deref()
}

/// Compute the dummy hash ahead of the first login for an unknown user.
pub fn prime_dummy_hash() {
    if dummy_hash().is_none() {
        tracing::warn!("could not compute the dummy bcrypt hash");
    }
}

/// Check `password` against a stored bcrypt hash on the blocking pool.
///
/// With no hash (unknown user) a dummy hash is verified instead and the
/// result is always `false`. Malformed hashes are logged and rejected.
pub async fn verify_password(password: Zeroizing<String>, hash: Option<String>) -> bool {
    let outcome = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => bcrypt::verify(password.as_bytes(), hash.trim()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored password hash is not valid bcrypt");
            false
        }),
        None => {
            if let Some(dummy) = dummy_hash() {
                let _ = bcrypt::verify(password.as_bytes(), dummy);
            }
            false
        }
    })
    .await;
    outcome.unwrap_or_else(|e| {
        tracing::error!(error = %e, "password verification task failed");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"unit-test-secret";

    fn authority() -> TokenAuthority {
        TokenAuthority::new(SECRET, DEFAULT_TOKEN_TTL_MINUTES)
    }

    fn test_app(authority: TokenAuthority) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.dni, caller.role)
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(Arc::new(authority)))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, Response) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        (response.status(), response)
    }

    #[test]
    fn issued_token_round_trips() {
        let auth = authority();
        let issued = auth
            .issue("12345678", Some(HouseId::new(7)), Role::Resident, Utc::now())
            .unwrap();
        assert_eq!(issued.expires_in, 1800);
        let caller = auth.verify(&issued.token).unwrap();
        assert_eq!(caller.dni, "12345678");
        assert_eq!(caller.house, Some(HouseId::new(7)));
        assert_eq!(caller.role, Role::Resident);
    }

    #[test]
    fn claims_use_sheet_names() {
        let auth = authority();
        let issued = auth
            .issue("1", Some(HouseId::new(3)), Role::Admin, Utc::now())
            .unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = jsonwebtoken::decode::<serde_json::Value>(
            &issued.token,
            &DecodingKey::from_secret(SECRET),
            &validation,
        )
        .unwrap();
        assert_eq!(data.claims["sub"], "1");
        assert_eq!(data.claims["ID_CASA"], 3);
        assert_eq!(data.claims["ROL"], "ADMIN");
        let iat = data.claims["iat"].as_i64().unwrap();
        assert_eq!(data.claims["exp"].as_i64().unwrap() - iat, 1800);
    }

    #[test]
    fn expired_token_rejected() {
        let auth = authority();
        let issued = auth
            .issue("1", None, Role::Admin, Utc::now() - Duration::minutes(31))
            .unwrap();
        assert_eq!(auth.verify(&issued.token).unwrap_err(), "token expired");
    }

    #[test]
    fn foreign_secret_rejected() {
        let issued = TokenAuthority::new(b"another-secret", 30)
            .issue("1", None, Role::Admin, Utc::now())
            .unwrap();
        assert!(authority().verify(&issued.token).is_err());
    }

    #[test]
    fn missing_role_claim_rejected() {
        let claims = serde_json::json!({"sub": "1", "exp": Utc::now().timestamp() + 600});
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(authority().verify(&token).is_err());
    }

    #[test]
    fn ephemeral_authorities_do_not_share_secrets() {
        let a = TokenAuthority::ephemeral(30);
        let b = TokenAuthority::ephemeral(30);
        assert!(a.is_ephemeral());
        let issued = a.issue("1", None, Role::Admin, Utc::now()).unwrap();
        assert!(a.verify(&issued.token).is_ok());
        assert!(b.verify(&issued.token).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", authority());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("unit-test-secret"));
    }

    #[test]
    fn role_checks() {
        let caller = CallerIdentity {
            dni: "1".into(),
            house: None,
            role: Role::Treasurer,
        };
        assert!(require_any_role(&caller, &[Role::Admin, Role::Treasurer]).is_ok());
        let err = require_role(&caller, Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg.contains("ADMIN")));
    }

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let auth = authority();
        let token = auth.issue("99", None, Role::Admin, Utc::now()).unwrap().token;
        let (status, response) = call(test_app(auth), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"99:ADMIN");
    }

    #[tokio::test]
    async fn missing_header_is_401_with_challenge() {
        let (status, response) = call(test_app(authority()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn basic_scheme_rejected() {
        let (status, _) = call(test_app(authority()), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_rejected() {
        let (status, _) = call(test_app(authority()), Some("Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn password_verification() {
        let hash = bcrypt::hash("clave-segura", 4).unwrap();
        assert!(verify_password(Zeroizing::new("clave-segura".into()), Some(hash.clone())).await);
        assert!(!verify_password(Zeroizing::new("otra".into()), Some(hash)).await);
        assert!(!verify_password(Zeroizing::new("x".into()), Some("not-bcrypt".into())).await);
        assert!(!verify_password(Zeroizing::new(DUMMY_PASSWORD.into()), None).await);
    }
}
