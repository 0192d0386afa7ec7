//! # Application State
//!
//! Configuration read from the environment and the shared state handed to
//! every handler.

use std::sync::Arc;

use chrono::FixedOffset;
use condo_core::temporal::{parse_utc_offset, DEFAULT_UTC_OFFSET};
use condo_core::LocalClock;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::auth::{TokenAuthority, DEFAULT_TOKEN_TTL_MINUTES};
use crate::error::AppError;
use crate::ledger::Ledger;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimitConfig;
use crate::store::SheetStore;

/// Invalid configuration value.
#[derive(Error, Debug)]
#[error("invalid {name}: \"{value}\" ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Application configuration.
///
/// Custom `Debug` redacts the JWT secret.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HS256 signing secret. `None` means an ephemeral secret is generated.
    pub jwt_secret: Option<Zeroizing<String>>,
    pub token_ttl_minutes: i64,
    /// Local offset of the condominium.
    pub utc_offset: FixedOffset,
    pub login_rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("utc_offset", &self.utc_offset)
            .field("login_rate_limit", &self.login_rate_limit)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            jwt_secret: None,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            utc_offset: LocalClock::default().offset(),
            login_rate_limit: RateLimitConfig::default(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PORT` | 8000 |
    /// | `JWT_SECRET` | ephemeral |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES` | 30 |
    /// | `CONDO_UTC_OFFSET` | -05:00 |
    /// | `LOGIN_RATE_LIMIT_MAX` | 10 |
    /// | `LOGIN_RATE_LIMIT_WINDOW_SECS` | 60 |
    /// | `LOGIN_RATE_LIMIT_MAX_CLIENTS` | 10000 |
    /// | `LOGIN_TRUST_FORWARDED_FOR` | false (set `true` only behind a proxy that appends the peer) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = RateLimitConfig::default();
        let token_ttl_minutes = parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", DEFAULT_TOKEN_TTL_MINUTES)?;
        if token_ttl_minutes <= 0 {
            return Err(ConfigError {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: token_ttl_minutes.to_string(),
                reason: "must be positive".into(),
            });
        }
        let offset_raw = var("CONDO_UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
        let utc_offset = parse_utc_offset(&offset_raw).map_err(|e| ConfigError {
            name: "CONDO_UTC_OFFSET",
            value: offset_raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            port: parse_var("PORT", 8000)?,
            jwt_secret: var("JWT_SECRET").map(Zeroizing::new),
            token_ttl_minutes,
            utc_offset,
            login_rate_limit: RateLimitConfig {
                max_requests: parse_var("LOGIN_RATE_LIMIT_MAX", defaults.max_requests)?,
                window_secs: parse_var("LOGIN_RATE_LIMIT_WINDOW_SECS", defaults.window_secs)?,
                trust_forwarded_for: parse_var(
                    "LOGIN_TRUST_FORWARDED_FOR",
                    defaults.trust_forwarded_for,
                )?,
                max_clients: parse_var("LOGIN_RATE_LIMIT_MAX_CLIENTS", defaults.max_clients)?,
            },
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// `None` when no spreadsheet is configured; data routes return 503.
    pub store: Option<Arc<dyn SheetStore>>,
    pub tokens: Arc<TokenAuthority>,
    pub clock: LocalClock,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.as_ref().map(|_| "configured"))
            .field("tokens", &self.tokens)
            .field("clock", &self.clock)
            .finish()
    }
}

impl AppState {
    /// Build state from `config`. Without a JWT secret an ephemeral one is
    /// generated and a warning logged.
    pub fn new(config: AppConfig, store: Option<Arc<dyn SheetStore>>) -> Self {
        let tokens = match &config.jwt_secret {
            Some(secret) => TokenAuthority::new(secret.as_bytes(), config.token_ttl_minutes),
            None => {
                tracing::warn!(
                    "JWT_SECRET not set; using an ephemeral signing secret. \
                     Issued tokens will not survive a restart."
                );
                TokenAuthority::ephemeral(config.token_ttl_minutes)
            }
        };
        let metrics = ApiMetrics::new();
        metrics.set_jwt_secret_ephemeral(tokens.is_ephemeral());
        Self {
            clock: LocalClock::new(config.utc_offset),
            config,
            store,
            tokens: Arc::new(tokens),
            metrics,
        }
    }

    /// Replace the clock. Tests freeze time with this.
    pub fn with_clock(mut self, clock: LocalClock) -> Self {
        self.clock = clock;
        self
    }

    /// The ledger over the configured store, or 503.
    pub fn ledger(&self) -> Result<Ledger, AppError> {
        self.store
            .as_ref()
            .map(|store| Ledger::new(Arc::clone(store)))
            .ok_or_else(AppError::store_unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let config = AppConfig {
            jwt_secret: Some(Zeroizing::new("super-secret-value".into())),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn default_offset_is_minus_five() {
        assert_eq!(AppConfig::default().utc_offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn missing_secret_makes_ephemeral_authority() {
        let state = AppState::new(AppConfig::default(), None);
        assert!(state.tokens.is_ephemeral());
        assert!(matches!(state.ledger(), Err(AppError::ServiceUnavailable(_))));
    }

    #[test]
    fn configured_secret_is_used() {
        let config = AppConfig {
            jwt_secret: Some(Zeroizing::new("configured".into())),
            ..AppConfig::default()
        };
        let state = AppState::new(config, None);
        assert!(!state.tokens.is_ephemeral());
    }
}
