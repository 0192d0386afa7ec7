//! # Account Statements
//!
//! Response views shared by the resident and admin statement endpoints,
//! and the builder that assembles them from the ledger. Field names are
//! the sheet column names the dashboard reads.

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use condo_core::delinquency::balance;
use condo_core::{AlertSnapshot, Contact, HouseId, Movement};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::ledger::Ledger;

/// Name shown for house 0 in statements.
pub const TREASURY_NAME: &str = "Tesorería/Administración";
/// Light reported for house 0, which is never assessed.
pub const TREASURY_LIGHT: &str = "N/A";

const MISSING: &str = "N/A";

/// Contact block of a statement.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactView {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    pub nombre: String,
    pub email: String,
    pub celular: String,
}

/// One house's delinquency status with contact details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DelinquencyView {
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    pub nombre_condomino: String,
    pub email: String,
    pub celular: String,
    #[serde(rename = "SALDO")]
    pub balance: f64,
    #[serde(rename = "ESTADO_SEMAFORO")]
    pub light: String,
    #[serde(rename = "DIAS_ATRASO")]
    pub days_overdue: i64,
    #[serde(rename = "CUOTAS_PENDIENTES")]
    pub pending_fees: u32,
}

impl DelinquencyView {
    /// Join a persisted snapshot with the house's contact.
    pub fn from_snapshot(snapshot: &AlertSnapshot, contact: &Contact) -> Self {
        Self {
            house: snapshot.house.get(),
            nombre_condomino: contact.display_name(snapshot.house),
            email: contact.display_email(),
            celular: contact.display_phone(),
            balance: snapshot.balance,
            light: snapshot.light.clone(),
            days_overdue: snapshot.days_overdue,
            pending_fees: snapshot.pending_fees,
        }
    }
}

/// A ledger movement. Dates carry the condominium's UTC offset.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementView {
    #[serde(rename = "ID_MOVIMIENTO")]
    pub id: String,
    #[serde(rename = "ID_CASA")]
    pub house: u32,
    #[serde(rename = "MES_PERIODO")]
    pub period: Option<String>,
    #[serde(rename = "TIPO_MOVIMIENTO")]
    pub kind: String,
    #[serde(rename = "CONCEPTO")]
    pub concept: Option<String>,
    #[serde(rename = "MONTO")]
    pub amount: f64,
    /// RFC 3339, local midnight.
    #[serde(rename = "FECHA_VENCIMIENTO")]
    pub due_date: Option<String>,
    #[serde(rename = "TIPO_PAGO")]
    pub payment_method: Option<String>,
    /// RFC 3339.
    #[serde(rename = "FECHA_REGISTRO")]
    pub recorded_at: Option<String>,
    #[serde(rename = "TIPO_MOVIMIENTO_FINANCIERO")]
    pub cash_flow: Option<String>,
}

fn localized(naive: NaiveDateTime, offset: FixedOffset) -> Option<String> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.to_rfc3339())
}

impl MovementView {
    pub fn new(movement: &Movement, offset: FixedOffset) -> Self {
        Self {
            id: if movement.id.is_empty() {
                MISSING.to_string()
            } else {
                movement.id.clone()
            },
            house: movement.house.get(),
            period: movement.period.clone(),
            kind: movement.kind.as_str().to_string(),
            concept: movement.concept.clone(),
            amount: movement.amount,
            due_date: movement
                .due_date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .and_then(|dt| localized(dt, offset)),
            payment_method: movement.payment_method.clone(),
            recorded_at: movement.recorded_at.and_then(|dt| localized(dt, offset)),
            cash_flow: movement.cash_flow.clone(),
        }
    }
}

/// Full account statement of a house.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatementResponse {
    pub status: String,
    pub condomino: ContactView,
    pub semaforo_actual: DelinquencyView,
    pub movimientos: Vec<MovementView>,
    /// Live balance: the sum of the house's movements.
    pub saldo_pendiente: f64,
}

/// Assemble the statement of `house`.
///
/// The balance is recomputed from the movements; light, days overdue and
/// pending fees come from the persisted snapshot (green when the house was
/// never consolidated). House 0 is never assessed.
pub async fn build(
    ledger: &Ledger,
    house: HouseId,
    contact: &Contact,
    offset: FixedOffset,
) -> Result<StatementResponse, AppError> {
    let movements = ledger.movements_of(house).await?;
    let live_balance = balance(&movements);

    let condomino = ContactView {
        house: house.get(),
        nombre: contact.name.clone().unwrap_or_else(|| MISSING.to_string()),
        email: contact.display_email(),
        celular: contact.display_phone(),
    };

    let semaforo_actual = if house.is_treasury() {
        DelinquencyView {
            house: 0,
            nombre_condomino: TREASURY_NAME.to_string(),
            email: condomino.email.clone(),
            celular: condomino.celular.clone(),
            balance: live_balance,
            light: TREASURY_LIGHT.to_string(),
            days_overdue: 0,
            pending_fees: 0,
        }
    } else {
        let snapshot = ledger
            .alert_for(house)
            .await?
            .unwrap_or_else(|| AlertSnapshot::never_assessed(house));
        DelinquencyView {
            balance: live_balance,
            ..DelinquencyView::from_snapshot(&snapshot, contact)
        }
    };

    Ok(StatementResponse {
        status: "success".to_string(),
        condomino,
        semaforo_actual,
        movimientos: movements
            .iter()
            .map(|m| MovementView::new(m, offset))
            .collect(),
        saldo_pendiente: live_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use condo_core::MovementKind;

    fn offset() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    #[test]
    fn movement_view_localizes_dates() {
        let movement = Movement {
            id: "M0001".into(),
            house: HouseId::new(3),
            period: Some("2025-04".into()),
            kind: MovementKind::MaintenanceFee,
            concept: Some("Cuota".into()),
            amount: 50.0,
            due_date: chrono::NaiveDate::from_ymd_opt(2025, 4, 5),
            payment_method: None,
            recorded_at: chrono::NaiveDate::from_ymd_opt(2025, 4, 1)
                .and_then(|d| d.and_hms_opt(9, 30, 0)),
            cash_flow: None,
        };
        let view = MovementView::new(&movement, offset());
        assert_eq!(view.due_date.as_deref(), Some("2025-04-05T00:00:00-05:00"));
        assert_eq!(view.recorded_at.as_deref(), Some("2025-04-01T09:30:00-05:00"));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["TIPO_MOVIMIENTO"], "ALICUOTA");
        assert_eq!(json["ID_CASA"], 3);
    }

    #[test]
    fn movement_view_fills_missing_id() {
        let movement = Movement {
            id: String::new(),
            house: HouseId::new(1),
            period: None,
            kind: MovementKind::Fine,
            concept: None,
            amount: 5.0,
            due_date: None,
            payment_method: None,
            recorded_at: None,
            cash_flow: None,
        };
        assert_eq!(MovementView::new(&movement, offset()).id, "N/A");
    }

    #[test]
    fn delinquency_view_uses_contact_fallbacks() {
        let snapshot = AlertSnapshot::never_assessed(HouseId::new(9));
        let view = DelinquencyView::from_snapshot(&snapshot, &Contact::default());
        assert_eq!(view.nombre_condomino, "N/A (Casa 9)");
        assert_eq!(view.email, "N/A");
        assert_eq!(view.light, "VERDE");
    }
}
