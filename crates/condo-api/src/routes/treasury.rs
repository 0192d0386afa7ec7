//! # Treasury Routes
//!
//! Income and expenses of the condominium itself, booked on house 0.
//! Open to ADMIN and TESORERIA.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use condo_core::movement::{require_positive, require_text};
use condo_core::{CashFlow, NewMovement, Role};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{require_any_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::admin::{record_movement, WriteResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/tesoreria/transaccion", post(register_transaction))
}

/// A treasury booking.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TreasuryRequest {
    /// Business label, stored uppercased (e.g. `GASTO_LUZ`).
    #[serde(rename = "TIPO_MOVIMIENTO")]
    pub label: String,
    #[serde(rename = "CONCEPTO")]
    pub concept: String,
    /// Always positive; the sign comes from the cash flow.
    #[serde(rename = "MONTO")]
    pub amount: f64,
    #[serde(rename = "TIPO_PAGO")]
    pub method: String,
    /// `INGRESO` or `EGRESO`.
    #[serde(rename = "TIPO_MOVIMIENTO_FINANCIERO")]
    pub cash_flow: String,
}

impl Validate for TreasuryRequest {
    fn validate(&self) -> Result<(), String> {
        require_positive(self.amount)
            .map(|_| ())
            .map_err(|_| "MONTO must be greater than 0".to_string())
    }
}

/// POST /admin/tesoreria/transaccion: Book treasury income or expense.
#[utoipa::path(
    post,
    path = "/admin/tesoreria/transaccion",
    request_body = TreasuryRequest,
    responses(
        (status = 200, description = "Transaction recorded", body = WriteResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is neither ADMIN nor TESORERIA", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid transaction", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "treasury"
)]
pub(crate) async fn register_transaction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<TreasuryRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Treasurer])?;
    let req = extract_validated_json(body)?;
    let flow: CashFlow = req.cash_flow.parse()?;
    let label = require_text("TIPO_MOVIMIENTO", &req.label)?;
    let concept = require_text("CONCEPTO", &req.concept)?;
    let method = require_text("TIPO_PAGO", &req.method)?;
    let ledger = state.ledger()?;

    let movement = NewMovement::treasury(
        ledger.next_movement_id().await?,
        state.clock.current_period(),
        &label,
        concept,
        req.amount,
        &method,
        flow,
        state.clock.stamp(),
    );
    Ok(Json(record_movement(&state, &ledger, movement, "Transaction").await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_must_be_positive() {
        let req: TreasuryRequest = serde_json::from_value(serde_json::json!({
            "TIPO_MOVIMIENTO": "GASTO",
            "CONCEPTO": "Luz",
            "MONTO": 0,
            "TIPO_PAGO": "EFECTIVO",
            "TIPO_MOVIMIENTO_FINANCIERO": "EGRESO"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
