//! # condo-sheets: Typed Client for Google Sheets
//!
//! Reads and writes cell ranges of a single spreadsheet through the Sheets
//! v4 REST API. The condominium ledger keeps every table (users, movements,
//! delinquency alerts, configuration) as a sheet of that spreadsheet; this
//! crate knows nothing about those tables and only moves rows of text.
//!
//! ## Authentication
//!
//! Service-account credentials are exchanged for access tokens with the
//! OAuth2 JWT-bearer grant (see [`auth`]). A pre-issued access token can be
//! used instead, which is also how the tests talk to mock servers.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub(crate) mod retry;

pub use client::{SheetsClient, UpdateSummary};
pub use config::{ConfigError, Credentials, ServiceAccountKey, SheetsConfig};
pub use error::SheetsError;
