//! # API Route Modules
//!
//! - [`auth`]: `POST /login`.
//! - [`resident`]: `/condomino/*`, the caller's own house.
//! - [`admin`]: `/admin/*`, ADMIN only.
//! - [`treasury`]: `/admin/tesoreria/*`, ADMIN or TESORERIA.
//! - [`statement`]: statement views shared by resident and admin routes.

pub mod admin;
pub mod auth;
pub mod resident;
pub mod statement;
pub mod treasury;
