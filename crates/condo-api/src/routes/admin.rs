//! # Admin Routes
//!
//! `/admin/*` endpoints for the ADMIN role: payments, fines, the monthly
//! fee run, delinquency consolidation and statements of any house.
//!
//! Every write appends one row per movement to `MOVIMIENTOS`. Identifiers
//! are allocated by reading the sheet first, so two concurrent writers can
//! pick the same identifier.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use condo_core::movement::{require_positive, require_text};
use condo_core::resident::{active_houses, contact_directory, find_by_house};
use condo_core::{
    assess, BillingPeriod, Contact, HouseId, NewMovement, PaymentMethod, Role, TrafficLight,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::ledger::Ledger;
use crate::routes::statement::{self, DelinquencyView, StatementResponse};
use crate::state::AppState;

/// Concept used by the fee run when the request leaves it out.
pub const DEFAULT_FEE_CONCEPT: &str = "Cuota de Mantenimiento Ordinaria";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/pagos", post(register_payment))
        .route("/admin/multas", post(register_fine))
        .route("/admin/alicuotas", post(register_monthly_fees))
        .route("/admin/actualizar_semaforo", post(refresh_delinquency))
        .route("/admin/semaforo", get(list_delinquency))
        .route("/admin/estado-cuenta/:id_casa", get(house_statement))
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

fn require_house(id: u32) -> Result<(), String> {
    if id == 0 {
        Err("ID_CASA must be greater than 0".into())
    } else {
        Ok(())
    }
}

fn require_amount(amount: f64, field: &str) -> Result<(), String> {
    require_positive(amount)
        .map(|_| ())
        .map_err(|_| format!("{field} must be greater than 0"))
}

/// A payment received from a house.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentRequest {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    /// Amount paid; stored negative.
    #[serde(rename = "MONTO")]
    pub amount: f64,
    #[serde(rename = "CONCEPTO")]
    pub concept: String,
    /// `TRANSFERENCIA`, `EFECTIVO` or `CHEQUE`.
    #[serde(rename = "TIPO_PAGO")]
    pub method: String,
}

impl Validate for PaymentRequest {
    fn validate(&self) -> Result<(), String> {
        require_house(self.house)?;
        require_amount(self.amount, "MONTO")
    }
}

/// A fine charged to a house.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FineRequest {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    #[serde(rename = "MONTO")]
    pub amount: f64,
    #[serde(rename = "CONCEPTO")]
    pub concept: String,
}

impl Validate for FineRequest {
    fn validate(&self) -> Result<(), String> {
        require_house(self.house)?;
        require_amount(self.amount, "MONTO")
    }
}

/// The monthly fee run.
///
/// The amount charged and the due day come from `CONFIGURACION`;
/// `MONTO_ALICUOTA` is only checked to be positive.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MonthlyFeeRequest {
    /// Billing period, `YYYY-MM`.
    #[serde(rename = "MES_PERIODO")]
    pub period: String,
    #[serde(rename = "MONTO_ALICUOTA")]
    pub amount: f64,
    #[serde(rename = "CONCEPTO", default)]
    pub concept: Option<String>,
}

impl Validate for MonthlyFeeRequest {
    fn validate(&self) -> Result<(), String> {
        require_amount(self.amount, "MONTO_ALICUOTA")
    }
}

/// Result of a single-movement write.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WriteResponse {
    pub status: String,
    pub message: String,
    #[serde(rename = "ID_MOVIMIENTO")]
    pub movement_id: String,
}

/// Result of the monthly fee run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlyFeeResponse {
    /// `success`, or `warning` when there was no active house.
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodo: Option<String>,
}

/// Delinquency rows with contacts.
#[derive(Debug, Serialize, ToSchema)]
pub struct DelinquencyResponse {
    /// `success`, or `warning` when there was no house to assess.
    pub status: String,
    pub message: String,
    pub results: Vec<DelinquencyView>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Append `movement` and describe it.
pub(crate) async fn record_movement(
    state: &AppState,
    ledger: &Ledger,
    movement: NewMovement,
    what: &str,
) -> Result<WriteResponse, AppError> {
    ledger.append_movement(&movement).await?;
    state.metrics.record_movements(movement.kind.as_str(), 1);
    tracing::info!(
        id = %movement.id,
        house = %movement.house,
        kind = movement.kind.as_str(),
        amount = movement.amount,
        "movement recorded"
    );
    Ok(WriteResponse {
        status: "success".to_string(),
        message: format!("{what} recorded. ID: {}", movement.id),
        movement_id: movement.id.to_string(),
    })
}

/// POST /admin/pagos: Register a payment (stored as a negative amount).
#[utoipa::path(
    post,
    path = "/admin/pagos",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = WriteResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid payment", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn register_payment(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let method: PaymentMethod = req.method.parse()?;
    let concept = require_text("CONCEPTO", &req.concept)?;
    let ledger = state.ledger()?;

    let movement = NewMovement::payment(
        ledger.next_movement_id().await?,
        HouseId::new(req.house),
        state.clock.current_period(),
        concept,
        req.amount,
        method,
        state.clock.stamp(),
    );
    Ok(Json(record_movement(&state, &ledger, movement, "Payment").await?))
}

/// POST /admin/multas: Register a fine (stored as a positive amount).
#[utoipa::path(
    post,
    path = "/admin/multas",
    request_body = FineRequest,
    responses(
        (status = 200, description = "Fine recorded", body = WriteResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid fine", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn register_fine(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<FineRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let concept = require_text("CONCEPTO", &req.concept)?;
    let ledger = state.ledger()?;

    let movement = NewMovement::fine(
        ledger.next_movement_id().await?,
        HouseId::new(req.house),
        state.clock.current_period(),
        concept,
        req.amount,
        state.clock.stamp(),
    );
    Ok(Json(record_movement(&state, &ledger, movement, "Fine").await?))
}

/// POST /admin/alicuotas: Charge the monthly fee to every active house.
#[utoipa::path(
    post,
    path = "/admin/alicuotas",
    request_body = MonthlyFeeRequest,
    responses(
        (status = 200, description = "Fees recorded, or warning when no house is active", body = MonthlyFeeResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid period or due day", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn register_monthly_fees(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<MonthlyFeeRequest>, JsonRejection>,
) -> Result<Json<MonthlyFeeResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let period: BillingPeriod = req.period.parse()?;
    let concept = match req.concept.as_deref() {
        Some(c) => require_text("CONCEPTO", c)?,
        None => DEFAULT_FEE_CONCEPT.to_string(),
    };
    let ledger = state.ledger()?;

    let settings = ledger.settings().await;
    let amount = settings.fee_amount();
    let due_date = period.due_date(settings.due_day())?;

    let houses = active_houses(&ledger.users().await?);
    if houses.is_empty() {
        return Ok(Json(MonthlyFeeResponse {
            status: "warning".to_string(),
            message: "no active houses found; no fees recorded".to_string(),
            periodo: None,
        }));
    }

    let recorded_at = state.clock.stamp();
    let mut id = ledger.next_movement_id().await?;
    for house in &houses {
        let movement = NewMovement::maintenance_fee(
            id,
            *house,
            period,
            concept.clone(),
            amount,
            due_date,
            recorded_at.clone(),
        );
        ledger.append_movement(&movement).await?;
        id = id.next();
    }
    state
        .metrics
        .record_movements(condo_core::MovementKind::MaintenanceFee.as_str(), houses.len() as u64);
    tracing::info!(%period, houses = houses.len(), amount, %due_date, "monthly fees recorded");

    Ok(Json(MonthlyFeeResponse {
        status: "success".to_string(),
        message: format!("Monthly fees recorded for {} houses.", houses.len()),
        periodo: Some(period.to_string()),
    }))
}

fn contact_for(directory: &BTreeMap<HouseId, Contact>, house: HouseId) -> Contact {
    directory.get(&house).cloned().unwrap_or_default()
}

/// POST /admin/actualizar_semaforo: Recompute and persist delinquency.
#[utoipa::path(
    post,
    path = "/admin/actualizar_semaforo",
    responses(
        (status = 200, description = "Delinquency refreshed", body = DelinquencyResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn refresh_delinquency(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DelinquencyResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let ledger = state.ledger()?;

    let users = ledger.users().await?;
    let houses: Vec<HouseId> = active_houses(&users)
        .into_iter()
        .filter(|h| !h.is_treasury())
        .collect();
    if houses.is_empty() {
        return Ok(Json(DelinquencyResponse {
            status: "warning".to_string(),
            message: "no active houses to assess".to_string(),
            results: Vec::new(),
        }));
    }

    let movements = ledger.movements().await?;
    let today = state.clock.today();
    let stamp = state.clock.stamp();
    let snapshots: Vec<_> = houses
        .iter()
        .map(|&house| assess(house, &movements, today).snapshot(stamp.clone()))
        .collect();
    ledger.save_alerts(&snapshots).await?;

    let mut lights: BTreeMap<&str, usize> = [TrafficLight::Green, TrafficLight::Yellow, TrafficLight::Red]
        .iter()
        .map(|l| (l.as_str(), 0))
        .collect();
    for snapshot in &snapshots {
        if let Some(n) = lights.get_mut(snapshot.light.as_str()) {
            *n += 1;
        }
    }
    state.metrics.set_houses_by_light(lights.into_iter());
    tracing::info!(houses = snapshots.len(), "delinquency refreshed");

    let directory = contact_directory(&users);
    let results = snapshots
        .iter()
        .map(|s| DelinquencyView::from_snapshot(s, &contact_for(&directory, s.house)))
        .collect();
    Ok(Json(DelinquencyResponse {
        status: "success".to_string(),
        message: format!("Delinquency refreshed for {} houses.", snapshots.len()),
        results,
    }))
}

/// GET /admin/semaforo: The persisted delinquency snapshot with contacts.
#[utoipa::path(
    get,
    path = "/admin/semaforo",
    responses(
        (status = 200, description = "Persisted delinquency rows", body = DelinquencyResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn list_delinquency(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<DelinquencyResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let ledger = state.ledger()?;

    let directory = contact_directory(&ledger.users().await?);
    let results: Vec<DelinquencyView> = ledger
        .alerts()
        .await?
        .iter()
        .filter(|a| !a.house.is_treasury())
        .map(|a| DelinquencyView::from_snapshot(a, &contact_for(&directory, a.house)))
        .collect();

    Ok(Json(DelinquencyResponse {
        status: "success".to_string(),
        message: format!("{} houses in the delinquency snapshot.", results.len()),
        results,
    }))
}

/// GET /admin/estado-cuenta/:id_casa: Statement of any house, including 0.
#[utoipa::path(
    get,
    path = "/admin/estado-cuenta/{id_casa}",
    params(("id_casa" = u32, Path, description = "House number; 0 is the treasury")),
    responses(
        (status = 200, description = "Account statement", body = StatementResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not ADMIN", body = crate::error::ErrorBody),
        (status = 404, description = "House has no user row", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub(crate) async fn house_statement(
    State(state): State<AppState>,
    caller: CallerIdentity,
    id_casa: Result<Path<u32>, PathRejection>,
) -> Result<Json<StatementResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let Path(id) = id_casa.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let house = HouseId::new(id);
    let ledger = state.ledger()?;

    let users = ledger.users().await?;
    let contact = find_by_house(&users, house)
        .map(|u| u.contact())
        .ok_or_else(|| AppError::NotFound(format!("house {house} has no registered user")))?;

    let response = statement::build(&ledger, house, &contact, state.clock.offset()).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_validation() {
        let ok = PaymentRequest {
            house: 3,
            amount: 25.0,
            concept: "Pago".into(),
            method: "efectivo".into(),
        };
        assert!(ok.validate().is_ok());
        let zero_house = PaymentRequest { house: 0, ..ok };
        assert!(zero_house.validate().unwrap_err().contains("ID_CASA"));
    }

    #[test]
    fn fine_rejects_negative_amount() {
        let req = FineRequest {
            house: 2,
            amount: -5.0,
            concept: "Ruido".into(),
        };
        assert!(req.validate().unwrap_err().contains("MONTO"));
    }

    #[test]
    fn fee_request_defaults_concept() {
        let req: MonthlyFeeRequest =
            serde_json::from_str(r#"{"MES_PERIODO":"2025-04","MONTO_ALICUOTA":50}"#).unwrap();
        assert!(req.concept.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn warning_response_omits_period() {
        let json = serde_json::to_value(MonthlyFeeResponse {
            status: "warning".into(),
            message: "none".into(),
            periodo: None,
        })
        .unwrap();
        assert!(json.get("periodo").is_none());
    }
}
