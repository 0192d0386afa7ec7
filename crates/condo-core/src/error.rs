//! # Error Hierarchy
//!
//! Validation errors for the domain primitives in this crate, built with
//! `thiserror`. Each variant carries the rejected input so operators can
//! diagnose bad sheet data or bad requests without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes and request values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// House identifier is not a non-negative integer.
    #[error("invalid house id: \"{0}\" (expected a non-negative integer)")]
    InvalidHouseId(String),

    /// Movement identifier does not match `M` followed by digits.
    #[error("invalid movement id: \"{0}\" (expected M followed by digits, e.g. M0001)")]
    InvalidMovementId(String),

    /// Role is not one of the known roles.
    #[error("unknown role: \"{0}\" (expected ADMIN, TESORERIA or CONDOMINO)")]
    UnknownRole(String),

    /// Payment method is not accepted.
    #[error("invalid payment method: \"{0}\" (expected TRANSFERENCIA, EFECTIVO or CHEQUE)")]
    InvalidPaymentMethod(String),

    /// Cash-flow direction is not accepted.
    #[error("invalid cash flow: \"{0}\" (expected INGRESO or EGRESO)")]
    InvalidCashFlow(String),

    /// Billing period is not `YYYY-MM`.
    #[error("invalid billing period: \"{0}\" (expected YYYY-MM, e.g. 2025-04)")]
    InvalidPeriod(String),

    /// Due day does not exist in the billing period.
    #[error("day {day} does not exist in period {period}")]
    InvalidDueDay {
        /// The billing period.
        period: String,
        /// The configured due day.
        day: u32,
    },

    /// Amount must be strictly positive and finite.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(f64),

    /// A required text field is blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// UTC offset string is not `±HH:MM`.
    #[error("invalid UTC offset: \"{0}\" (expected ±HH:MM)")]
    InvalidUtcOffset(String),
}
