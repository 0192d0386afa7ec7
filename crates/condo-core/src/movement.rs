//! # Ledger Movements
//!
//! Every financial event is one row in the movements sheet. The sign of
//! `MONTO` carries the meaning: positive amounts increase what a house owes
//! (fees, fines), negative amounts reduce it (payments). On the treasury
//! account (house 0) positive is income and negative is expense.
//!
//! ## Row layout
//!
//! ```text
//! ID_MOVIMIENTO | ID_CASA | MES_PERIODO | TIPO_MOVIMIENTO | CONCEPTO | MONTO |
//! FECHA_VENCIMIENTO | TIPO_PAGO | FECHA_REGISTRO | TIPO_MOVIMIENTO_FINANCIERO
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::cell::{non_blank, parse_amount, round_cents};
use crate::error::ValidationError;
use crate::house::HouseId;
use crate::record::Record;
use crate::temporal::{parse_date, parse_timestamp, BillingPeriod, DATE_FORMAT};

/// Column headers of the movements sheet, in write order.
pub const MOVEMENT_COLUMNS: [&str; 10] = [
    "ID_MOVIMIENTO",
    "ID_CASA",
    "MES_PERIODO",
    "TIPO_MOVIMIENTO",
    "CONCEPTO",
    "MONTO",
    "FECHA_VENCIMIENTO",
    "TIPO_PAGO",
    "FECHA_REGISTRO",
    "TIPO_MOVIMIENTO_FINANCIERO",
];

// ── MovementId ──────────────────────────────────────────────────────────────

/// Sequential movement identifier rendered as `M0001`, `M0002`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MovementId(u32);

impl MovementId {
    /// The identifier used when the sheet holds no valid ids.
    pub const FIRST: MovementId = MovementId(1);

    /// Wrap a raw sequence number.
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    /// The numeric suffix.
    pub fn number(self) -> u32 {
        self.0
    }

    /// The identifier that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Allocate the id after the highest valid id in `existing`.
    ///
    /// Blank and malformed entries (`"X7"`, `"M12a"`, `"M"`) are ignored.
    pub fn next_after<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        existing
            .into_iter()
            .filter_map(|raw| raw.trim().parse::<MovementId>().ok())
            .max()
            .map(MovementId::next)
            .unwrap_or(Self::FIRST)
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{:04}", self.0)
    }
}

impl FromStr for MovementId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('M')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ValidationError::InvalidMovementId(s.to_string()))?;
        digits
            .parse()
            .map(Self)
            .map_err(|_| ValidationError::InvalidMovementId(s.to_string()))
    }
}

impl Serialize for MovementId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Enumerations ────────────────────────────────────────────────────────────

/// `TIPO_MOVIMIENTO`. Treasury bookings may use any label, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MovementKind {
    /// `PAGO`: a house pays down its balance.
    Payment,
    /// `MULTA`: a fine charged to a house.
    Fine,
    /// `ALICUOTA`: the monthly maintenance fee.
    MaintenanceFee,
    /// Any other label (uppercased).
    Other(String),
}

impl MovementKind {
    /// Sheet representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Payment => "PAGO",
            Self::Fine => "MULTA",
            Self::MaintenanceFee => "ALICUOTA",
            Self::Other(label) => label,
        }
    }

    /// Parse a sheet label. Never fails; unknown labels become [`MovementKind::Other`].
    pub fn from_label(label: &str) -> Self {
        let upper = label.trim().to_uppercase();
        match upper.as_str() {
            "PAGO" => Self::Payment,
            "MULTA" => Self::Fine,
            "ALICUOTA" => Self::MaintenanceFee,
            _ => Self::Other(upper),
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MovementKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// `TIPO_PAGO`: how a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PaymentMethod {
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
    #[serde(rename = "EFECTIVO")]
    Cash,
    #[serde(rename = "CHEQUE")]
    Check,
}

impl PaymentMethod {
    /// Sheet representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "TRANSFERENCIA",
            Self::Cash => "EFECTIVO",
            Self::Check => "CHEQUE",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRANSFERENCIA" => Ok(Self::Transfer),
            "EFECTIVO" => Ok(Self::Cash),
            "CHEQUE" => Ok(Self::Check),
            _ => Err(ValidationError::InvalidPaymentMethod(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `TIPO_MOVIMIENTO_FINANCIERO`: direction of a treasury booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CashFlow {
    #[serde(rename = "INGRESO")]
    Income,
    #[serde(rename = "EGRESO")]
    Expense,
}

impl CashFlow {
    /// Sheet representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INGRESO",
            Self::Expense => "EGRESO",
        }
    }

    /// Apply the direction's sign to an amount.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            Self::Income => amount.abs(),
            Self::Expense => -amount.abs(),
        }
    }
}

impl FromStr for CashFlow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INGRESO" => Ok(Self::Income),
            "EGRESO" => Ok(Self::Expense),
            _ => Err(ValidationError::InvalidCashFlow(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for CashFlow {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reject zero, negative, and non-finite amounts.
pub fn require_positive(amount: f64) -> Result<f64, ValidationError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(ValidationError::NonPositiveAmount(amount))
    }
}

// ── Records ─────────────────────────────────────────────────────────────────

/// A movement as read back from the sheet.
///
/// Text fields keep whatever the sheet holds; dates that fail to parse are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    #[serde(rename = "ID_MOVIMIENTO")]
    pub id: String,
    #[serde(rename = "ID_CASA")]
    pub house: HouseId,
    #[serde(rename = "MES_PERIODO")]
    pub period: Option<String>,
    #[serde(rename = "TIPO_MOVIMIENTO")]
    pub kind: MovementKind,
    #[serde(rename = "CONCEPTO")]
    pub concept: Option<String>,
    #[serde(rename = "MONTO")]
    pub amount: f64,
    #[serde(rename = "FECHA_VENCIMIENTO")]
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "TIPO_PAGO")]
    pub payment_method: Option<String>,
    #[serde(rename = "FECHA_REGISTRO")]
    pub recorded_at: Option<NaiveDateTime>,
    #[serde(rename = "TIPO_MOVIMIENTO_FINANCIERO")]
    pub cash_flow: Option<String>,
}

impl Movement {
    /// Map a movements-sheet record. Returns `None` when `ID_CASA` is not a
    /// valid house number. A blank or unreadable `MONTO` counts as zero.
    pub fn from_record(record: &Record) -> Option<Movement> {
        let house = HouseId::from_cell(record.text("ID_CASA"))?;
        let owned = |col: &str| record.get(col).map(str::to_string);
        Some(Movement {
            id: record.text("ID_MOVIMIENTO").to_string(),
            house,
            period: owned("MES_PERIODO"),
            kind: MovementKind::from_label(record.text("TIPO_MOVIMIENTO")),
            concept: owned("CONCEPTO"),
            amount: parse_amount(record.text("MONTO")).unwrap_or(0.0),
            due_date: record.get("FECHA_VENCIMIENTO").and_then(parse_date),
            payment_method: owned("TIPO_PAGO"),
            recorded_at: record.get("FECHA_REGISTRO").and_then(parse_timestamp),
            cash_flow: owned("TIPO_MOVIMIENTO_FINANCIERO"),
        })
    }
}

/// Require a non-blank text field, returning it trimmed.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    non_blank(value)
        .map(str::to_string)
        .ok_or(ValidationError::Empty(field))
}

/// A movement about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub id: MovementId,
    pub house: HouseId,
    pub period: BillingPeriod,
    pub kind: MovementKind,
    pub concept: String,
    pub amount: f64,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub recorded_at: String,
    pub cash_flow: Option<CashFlow>,
}

impl NewMovement {
    /// A payment from a house. Stored negative.
    pub fn payment(
        id: MovementId,
        house: HouseId,
        period: BillingPeriod,
        concept: String,
        amount: f64,
        method: PaymentMethod,
        recorded_at: String,
    ) -> Self {
        Self {
            id,
            house,
            period,
            kind: MovementKind::Payment,
            concept,
            amount: -amount.abs(),
            due_date: None,
            payment_method: Some(method.as_str().to_string()),
            recorded_at,
            cash_flow: None,
        }
    }

    /// A fine charged to a house. Stored positive.
    pub fn fine(
        id: MovementId,
        house: HouseId,
        period: BillingPeriod,
        concept: String,
        amount: f64,
        recorded_at: String,
    ) -> Self {
        Self {
            id,
            house,
            period,
            kind: MovementKind::Fine,
            concept,
            amount: amount.abs(),
            due_date: None,
            payment_method: None,
            recorded_at,
            cash_flow: None,
        }
    }

    /// The monthly fee for a house, due on `due_date`. Stored positive.
    pub fn maintenance_fee(
        id: MovementId,
        house: HouseId,
        period: BillingPeriod,
        concept: String,
        amount: f64,
        due_date: NaiveDate,
        recorded_at: String,
    ) -> Self {
        Self {
            id,
            house,
            period,
            kind: MovementKind::MaintenanceFee,
            concept,
            amount: amount.abs(),
            due_date: Some(due_date),
            payment_method: None,
            recorded_at,
            cash_flow: None,
        }
    }

    /// A treasury booking on house 0, signed by its cash flow.
    #[allow(clippy::too_many_arguments)]
    pub fn treasury(
        id: MovementId,
        period: BillingPeriod,
        label: &str,
        concept: String,
        amount: f64,
        method: &str,
        flow: CashFlow,
        recorded_at: String,
    ) -> Self {
        Self {
            id,
            house: HouseId::TREASURY,
            period,
            kind: MovementKind::from_label(label),
            concept,
            amount: flow.signed(amount),
            due_date: None,
            payment_method: Some(method.trim().to_uppercase()),
            recorded_at,
            cash_flow: Some(flow),
        }
    }

    /// Cells in [`MOVEMENT_COLUMNS`] order. `MONTO` is written in whole cents.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.house.to_string(),
            self.period.to_string(),
            self.kind.as_str().to_string(),
            self.concept.clone(),
            round_cents(self.amount).to_string(),
            self.due_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            self.payment_method.clone().unwrap_or_default(),
            self.recorded_at.clone(),
            self.cash_flow
                .map(|f| f.as_str().to_string())
                .unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> BillingPeriod {
        "2025-04".parse().unwrap()
    }

    #[test]
    fn movement_id_display_pads_to_four() {
        assert_eq!(MovementId::new(1).to_string(), "M0001");
        assert_eq!(MovementId::new(123).to_string(), "M0123");
        assert_eq!(MovementId::new(12345).to_string(), "M12345");
    }

    #[test]
    fn movement_id_parse() {
        assert_eq!("M0042".parse::<MovementId>().unwrap(), MovementId::new(42));
        assert!("M".parse::<MovementId>().is_err());
        assert!("m0042".parse::<MovementId>().is_err());
        assert!("M12a".parse::<MovementId>().is_err());
        assert!("X0001".parse::<MovementId>().is_err());
    }

    #[test]
    fn next_after_skips_malformed() {
        let ids = ["M0001", "", "M0009", "X0100", "M00x5", "M0003"];
        assert_eq!(MovementId::next_after(ids).to_string(), "M0010");
    }

    #[test]
    fn next_after_empty_is_first() {
        assert_eq!(MovementId::next_after([]), MovementId::FIRST);
        assert_eq!(MovementId::next_after(["junk"]).to_string(), "M0001");
    }

    #[test]
    fn kind_labels() {
        assert_eq!(MovementKind::from_label("pago"), MovementKind::Payment);
        assert_eq!(MovementKind::from_label(" Alicuota "), MovementKind::MaintenanceFee);
        assert_eq!(
            MovementKind::from_label("mantenimiento"),
            MovementKind::Other("MANTENIMIENTO".into())
        );
    }

    #[test]
    fn payment_method_normalizes() {
        assert_eq!(" efectivo ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
        let m: PaymentMethod = serde_json::from_str("\"Transferencia\"").unwrap();
        assert_eq!(m, PaymentMethod::Transfer);
    }

    #[test]
    fn cash_flow_sign() {
        assert_eq!(CashFlow::Income.signed(-20.0), 20.0);
        assert_eq!(CashFlow::Expense.signed(20.0), -20.0);
        assert!(serde_json::from_str::<CashFlow>("\"gasto\"").is_err());
    }

    #[test]
    fn positive_amounts_only() {
        assert!(require_positive(0.01).is_ok());
        assert!(require_positive(0.0).is_err());
        assert!(require_positive(-5.0).is_err());
        assert!(require_positive(f64::INFINITY).is_err());
    }

    #[test]
    fn movement_from_record_parses_loose_cells() {
        let r = Record::from_pairs([
            ("ID_MOVIMIENTO", "M0004"),
            ("ID_CASA", "3.0"),
            ("MES_PERIODO", "2025-04"),
            ("TIPO_MOVIMIENTO", "alicuota"),
            ("MONTO", "50,5"),
            ("FECHA_VENCIMIENTO", "2025-04-05"),
            ("FECHA_REGISTRO", "2025-04-01 08:00"),
        ]);
        let m = Movement::from_record(&r).unwrap();
        assert_eq!(m.house, HouseId::new(3));
        assert_eq!(m.kind, MovementKind::MaintenanceFee);
        assert_eq!(m.amount, 50.5);
        assert_eq!(m.due_date, NaiveDate::from_ymd_opt(2025, 4, 5));
        assert!(m.recorded_at.is_some());
        assert_eq!(m.concept, None);
    }

    #[test]
    fn movement_without_house_is_skipped() {
        let r = Record::from_pairs([("ID_CASA", "casa"), ("MONTO", "10")]);
        assert!(Movement::from_record(&r).is_none());
    }

    #[test]
    fn movement_serializes_with_sheet_names() {
        let r = Record::from_pairs([("ID_MOVIMIENTO", "M0001"), ("ID_CASA", "2"), ("MONTO", "-5")]);
        let json = serde_json::to_value(Movement::from_record(&r).unwrap()).unwrap();
        assert_eq!(json["ID_CASA"], 2);
        assert_eq!(json["MONTO"], -5.0);
        assert_eq!(json["FECHA_VENCIMIENTO"], serde_json::Value::Null);
    }

    #[test]
    fn text_fields_must_not_be_blank() {
        assert_eq!(require_text("CONCEPTO", "  x "), Ok("x".to_string()));
        assert_eq!(require_text("CONCEPTO", "  "), Err(ValidationError::Empty("CONCEPTO")));
    }

    #[test]
    fn payment_row_is_negative() {
        let m = NewMovement::payment(
            MovementId::new(7),
            HouseId::new(3),
            period(),
            "Abono".into(),
            40.0,
            PaymentMethod::Cash,
            "2025-04-10 09:15".into(),
        );
        assert_eq!(
            m.to_row(),
            vec!["M0007", "3", "2025-04", "PAGO", "Abono", "-40", "", "EFECTIVO", "2025-04-10 09:15", ""]
        );
    }

    #[test]
    fn fee_row_carries_due_date() {
        let due = NaiveDate::from_ymd_opt(2025, 4, 5).unwrap();
        let m = NewMovement::maintenance_fee(
            MovementId::new(8),
            HouseId::new(2),
            period(),
            "Cuota".into(),
            50.0,
            due,
            "2025-04-01 08:00".into(),
        );
        let row = m.to_row();
        assert_eq!(row[3], "ALICUOTA");
        assert_eq!(row[5], "50");
        assert_eq!(row[6], "2025-04-05");
    }

    #[test]
    fn treasury_expense_row() {
        let m = NewMovement::treasury(
            MovementId::new(9),
            period(),
            "mantenimiento",
            "Jardinería".into(),
            120.5,
            "transferencia",
            CashFlow::Expense,
            "2025-04-10 10:00".into(),
        );
        let row = m.to_row();
        assert_eq!(row[1], "0");
        assert_eq!(row[3], "MANTENIMIENTO");
        assert_eq!(row[5], "-120.5");
        assert_eq!(row[7], "TRANSFERENCIA");
        assert_eq!(row[9], "EGRESO");
        assert_eq!(row.len(), MOVEMENT_COLUMNS.len());
    }

    #[test]
    fn amount_is_written_in_cents() {
        let fine = NewMovement::fine(
            MovementId::new(10),
            HouseId::new(4),
            period(),
            "Ruido".into(),
            45.550_000_000_000_004,
            "2025-04-10 11:00".into(),
        );
        assert_eq!(fine.to_row()[5], "45.55");

        let payment = NewMovement::payment(
            MovementId::new(11),
            HouseId::new(4),
            period(),
            "Abono".into(),
            0.1 + 0.2,
            PaymentMethod::Transfer,
            "2025-04-10 11:05".into(),
        );
        assert_eq!(payment.to_row()[5], "-0.3");
    }
}
