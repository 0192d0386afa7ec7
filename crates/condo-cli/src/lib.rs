//! # condo-cli: Terminal Client for the Condominium Ledger
//!
//! Library side of the `condo` binary. Each subcommand lives in its own
//! module with a clap `Args` struct and a `run_*` function returning an
//! exit code.
//!
//! - [`password`]: `hash-password`, offline.
//! - [`account`]: `login` and `statement`.
//! - [`dashboard`]: `dashboard` and `refresh` (ADMIN).
//! - [`client`]: the HTTP client shared by the online commands.
//! - [`render`]: plain-text tables.

pub mod account;
pub mod client;
pub mod dashboard;
pub mod password;
pub mod render;
