//! Sheets client configuration.
//!
//! The spreadsheet is addressed by ID. Credentials come from, in order:
//!
//! 1. `GSPREAD_CREDENTIALS`: base64-encoded service-account JSON;
//! 2. `GOOGLE_APPLICATION_CREDENTIALS`: path to a service-account JSON file
//!    (default `credentials/credentials.json`, used only if it exists);
//! 3. `SHEETS_ACCESS_TOKEN`: a pre-issued OAuth access token.

use std::path::Path;

use base64::Engine as _;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

/// Default Google Sheets API root.
pub const DEFAULT_API_URL: &str = "https://sheets.googleapis.com";

/// Default path of the service-account key file.
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials/credentials.json";

/// OAuth scope for read/write spreadsheet access.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A Google service-account key, as downloaded from the cloud console.
///
/// Custom `Debug` implementation redacts the private key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: Zeroizing<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[REDACTED]")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse the key JSON.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let key: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials(
                "client_email and private_key are required".into(),
            ));
        }
        Ok(key)
    }

    /// Decode base64 (standard alphabet, surrounding whitespace ignored) and parse.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| ConfigError::InvalidCredentials(format!("base64: {e}")))?,
        );
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| ConfigError::InvalidCredentials(format!("utf-8: {e}")))?;
        Self::from_json(text)
    }

    /// Read and parse a key file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidCredentials(format!("{}: {e}", path.display()))
        })?);
        Self::from_json(&raw)
    }
}

/// How requests are authorized.
#[derive(Clone)]
pub enum Credentials {
    /// Exchange a signed assertion for short-lived access tokens.
    ServiceAccount(ServiceAccountKey),
    /// Send a fixed bearer token.
    AccessToken(Zeroizing<String>),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"[REDACTED]").finish(),
        }
    }
}

/// Configuration for connecting to the Sheets API.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    /// Spreadsheet ID from the document URL.
    pub spreadsheet_id: String,
    /// API root. Default: <https://sheets.googleapis.com>
    pub api_url: Url,
    pub credentials: Credentials,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl SheetsConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SPREADSHEET_ID` (required)
    /// - `GSPREAD_CREDENTIALS`, `GOOGLE_APPLICATION_CREDENTIALS`,
    ///   `SHEETS_ACCESS_TOKEN` (one required, see module docs)
    /// - `SHEETS_API_URL` (default: `https://sheets.googleapis.com`)
    /// - `SHEETS_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = credentials_from_env()?;
        let spreadsheet_id = std::env::var("SPREADSHEET_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSpreadsheetId)?;

        Ok(Self {
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            api_url: env_url("SHEETS_API_URL", DEFAULT_API_URL)?,
            credentials,
            timeout_secs: std::env::var("SHEETS_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// A configuration pointing at a local mock server with a fixed token.
    pub fn local_mock(api_url: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            spreadsheet_id: "test-spreadsheet".to_string(),
            api_url: Url::parse(api_url)
                .map_err(|e| ConfigError::InvalidUrl(api_url.to_string(), e.to_string()))?,
            credentials: Credentials::AccessToken(Zeroizing::new(token.to_string())),
            timeout_secs: 5,
        })
    }
}

fn credentials_from_env() -> Result<Credentials, ConfigError> {
    if let Some(encoded) = non_empty_var("GSPREAD_CREDENTIALS") {
        return ServiceAccountKey::from_base64(&encoded).map(Credentials::ServiceAccount);
    }

    let explicit = non_empty_var("GOOGLE_APPLICATION_CREDENTIALS");
    let path = explicit
        .clone()
        .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string());
    let path = Path::new(&path);
    if path.is_file() {
        return ServiceAccountKey::from_file(path).map(Credentials::ServiceAccount);
    }
    if explicit.is_some() {
        return Err(ConfigError::InvalidCredentials(format!(
            "{} does not exist",
            path.display()
        )));
    }

    if let Some(token) = non_empty_var("SHEETS_ACCESS_TOKEN") {
        return Ok(Credentials::AccessToken(Zeroizing::new(token)));
    }
    Err(ConfigError::MissingCredentials)
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no spreadsheet credentials: set GSPREAD_CREDENTIALS, GOOGLE_APPLICATION_CREDENTIALS or SHEETS_ACCESS_TOKEN")]
    MissingCredentials,
    #[error("SPREADSHEET_ID environment variable is required")]
    MissingSpreadsheetId,
    #[error("invalid service-account credentials: {0}")]
    InvalidCredentials(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
