//! OAuth2 access tokens for the Sheets API.
//!
//! Service accounts use the JWT-bearer grant: an RS256-signed assertion is
//! POSTed to the key's `token_uri` and exchanged for a short-lived access
//! token. Tokens are cached and reused until [`REFRESH_MARGIN_SECS`] before
//! they expire.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::config::{Credentials, ServiceAccountKey, SPREADSHEETS_SCOPE};
use crate::error::SheetsError;
use crate::retry::{send_with_replay, Replay};

/// Lifetime requested for each assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before their stated expiry.
pub const REFRESH_MARGIN_SECS: i64 = 60;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

/// Supplies bearer tokens for Sheets requests.
pub(crate) enum TokenSource {
    Static(Zeroizing<String>),
    ServiceAccount {
        key: ServiceAccountKey,
        http: reqwest::Client,
        cache: Mutex<Option<CachedToken>>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static([REDACTED])"),
            Self::ServiceAccount { key, .. } => f
                .debug_struct("TokenSource::ServiceAccount")
                .field("client_email", &key.client_email)
                .finish(),
        }
    }
}

impl TokenSource {
    pub(crate) fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        match credentials {
            Credentials::AccessToken(token) => Self::Static(token),
            Credentials::ServiceAccount(key) => Self::ServiceAccount {
                key,
                http,
                cache: Mutex::new(None),
            },
        }
    }

    /// A valid access token, exchanging a fresh assertion when needed.
    pub(crate) async fn access_token(&self) -> Result<Zeroizing<String>, SheetsError> {
        let (key, http, cache) = match self {
            Self::Static(token) => return Ok(token.clone()),
            Self::ServiceAccount { key, http, cache } => (key, http, cache),
        };

        // Held across the exchange so concurrent callers share one refresh.
        let mut guard = cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = guard.as_ref() {
            if now < cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) {
                return Ok(cached.value.clone());
            }
        }

        let fresh = exchange(key, http, now).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }
}

/// Sign an assertion for `key` issued at `now`.
pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<String, SheetsError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: SPREADSHEETS_SCOPE,
        aud: &key.token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SheetsError::Auth(format!("private key is not a PEM RSA key: {e}")))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| SheetsError::Auth(format!("failed to sign assertion: {e}")))
}

async fn exchange(
    key: &ServiceAccountKey,
    http: &reqwest::Client,
    now: DateTime<Utc>,
) -> Result<CachedToken, SheetsError> {
    let endpoint = "POST token";
    let assertion = Zeroizing::new(sign_assertion(key, now)?);
    let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

    // A token grant has no side effect on the sheet; a lost one is just reissued.
    let resp = send_with_replay(Replay::Safe, || http.post(&key.token_uri).form(&form).send())
        .await
        .map_err(|e| SheetsError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::error!(status, client_email = %key.client_email, "token exchange refused");
        return Err(SheetsError::ApiError {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    let token: TokenResponse = resp.json().await.map_err(|e| SheetsError::Deserialization {
        endpoint: endpoint.into(),
        source: e,
    })?;
    tracing::debug!(expires_in = token.expires_in, "obtained Sheets access token");

    Ok(CachedToken {
        value: Zeroizing::new(token.access_token),
        expires_at: now + Duration::seconds(token.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let source = TokenSource::new(
            Credentials::AccessToken(Zeroizing::new("abc".into())),
            reqwest::Client::new(),
        );
        assert_eq!(source.access_token().await.unwrap().as_str(), "abc");
        assert!(!format!("{source:?}").contains("abc"));
    }

    #[test]
    fn malformed_private_key_is_an_auth_error() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"a@b","private_key":"not a key"}"#,
        )
        .unwrap();
        assert!(matches!(sign_assertion(&key, Utc::now()), Err(SheetsError::Auth(_))));
    }
}
