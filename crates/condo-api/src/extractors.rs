//! # Ledger Request Bodies
//!
//! Every write endpoint takes a JSON body (`LoginRequest`, `PaymentRequest`,
//! `FineRequest`, `MonthlyFeeRequest`, `TreasuryRequest`). Handlers accept
//! `Result<Json<T>, JsonRejection>` so that a body serde cannot read (a
//! string `MONTO`, a missing `ID_CASA`) and a body that reads but breaks a
//! ledger rule (non-positive `MONTO`, an empty `DNI`, a `MES_PERIODO` that
//! is not `YYYY-MM`) both answer 422 with the error envelope, rather than
//! axum's plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Rules a request body must satisfy before it reaches the ledger.
pub trait Validate {
    /// The first rule the body breaks, as a message naming the field.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a body, turning a serde rejection into `BAD_REQUEST` (422).
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// [`extract_json`], then [`Validate::validate`] as `VALIDATION_ERROR` (422).
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
