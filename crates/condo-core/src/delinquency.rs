//! # Delinquency Assessment
//!
//! Classifies each house into a traffic light from its movements:
//!
//! - balance = sum of all `MONTO`s for the house;
//! - when the balance is positive, the pending fees are the house's
//!   `ALICUOTA` movements with a positive amount;
//! - days overdue = today minus the earliest due date among them;
//! - 30 days or more is [`TrafficLight::Red`], 15 or more is
//!   [`TrafficLight::Yellow`], anything else is [`TrafficLight::Green`].
//!
//! The result is persisted as one row per house in `ALERTAS_SEMAFORO`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cell::{parse_amount, parse_integer, round_cents};
use crate::house::HouseId;
use crate::movement::{Movement, MovementKind};
use crate::record::Record;

/// Days overdue at which a house turns yellow.
pub const YELLOW_AFTER_DAYS: i64 = 15;
/// Days overdue at which a house turns red.
pub const RED_AFTER_DAYS: i64 = 30;

/// Column headers of the alerts sheet, in write order.
pub const ALERT_COLUMNS: [&str; 6] = [
    "ID_CASA",
    "SALDO_PENDIENTE",
    "DIAS_ATRASO",
    "ESTADO_SEMAFORO",
    "CUOTAS_PENDIENTES",
    "FECHA_ACTUALIZACION",
];

/// `ESTADO_SEMAFORO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficLight {
    #[serde(rename = "VERDE")]
    Green,
    #[serde(rename = "AMARILLO")]
    Yellow,
    #[serde(rename = "ROJO")]
    Red,
}

impl TrafficLight {
    /// Classify a number of days overdue.
    pub fn for_days_overdue(days: i64) -> Self {
        if days >= RED_AFTER_DAYS {
            Self::Red
        } else if days >= YELLOW_AFTER_DAYS {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    /// Sheet representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "VERDE",
            Self::Yellow => "AMARILLO",
            Self::Red => "ROJO",
        }
    }
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficLight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "VERDE" => Ok(Self::Green),
            "AMARILLO" => Ok(Self::Yellow),
            "ROJO" => Ok(Self::Red),
            other => Err(format!("unknown traffic light: {other}")),
        }
    }
}

/// Result of assessing one house.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub house: HouseId,
    pub balance: f64,
    pub days_overdue: i64,
    pub light: TrafficLight,
    pub pending_fees: u32,
}

impl Assessment {
    /// The snapshot row to persist, stamped with `updated_at`.
    pub fn snapshot(&self, updated_at: String) -> AlertSnapshot {
        AlertSnapshot {
            house: self.house,
            balance: self.balance,
            days_overdue: self.days_overdue,
            light: self.light.as_str().to_string(),
            pending_fees: self.pending_fees,
            updated_at,
        }
    }
}

/// Sum of amounts, rounded to cents.
pub fn balance<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> f64 {
    round_cents(movements.into_iter().map(|m| m.amount).sum())
}

/// Assess `house` from `movements` as of `today`. Movements of other
/// houses are ignored.
///
/// Days overdue run from the earliest due date among pending fees that
/// parses. Fees whose due date is blank or unreadable still count as
/// pending but do not move the light; if none parse the house is VERDE.
pub fn assess(house: HouseId, movements: &[Movement], today: NaiveDate) -> Assessment {
    let own: Vec<&Movement> = movements.iter().filter(|m| m.house == house).collect();
    let balance = balance(own.iter().copied());

    let mut assessment = Assessment {
        house,
        balance,
        days_overdue: 0,
        light: TrafficLight::Green,
        pending_fees: 0,
    };
    if balance <= 0.0 {
        return assessment;
    }

    let pending: Vec<&&Movement> = own
        .iter()
        .filter(|m| m.kind == MovementKind::MaintenanceFee && m.amount > 0.0)
        .collect();
    assessment.pending_fees = u32::try_from(pending.len()).unwrap_or(u32::MAX);

    if let Some(earliest) = pending.iter().filter_map(|m| m.due_date).min() {
        let days = (today - earliest).num_days().max(0);
        assessment.days_overdue = days;
        assessment.light = TrafficLight::for_days_overdue(days);
    }
    assessment
}

/// One row of `ALERTAS_SEMAFORO`.
///
/// The light is kept as text so hand-edited sheets still round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSnapshot {
    pub house: HouseId,
    pub balance: f64,
    pub days_overdue: i64,
    pub light: String,
    pub pending_fees: u32,
    pub updated_at: String,
}

impl AlertSnapshot {
    /// The snapshot used for a house that was never consolidated.
    pub fn never_assessed(house: HouseId) -> Self {
        Self {
            house,
            balance: 0.0,
            days_overdue: 0,
            light: TrafficLight::Green.as_str().to_string(),
            pending_fees: 0,
            updated_at: String::new(),
        }
    }

    /// Cells in [`ALERT_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.house.to_string(),
            format!("{:.2}", self.balance),
            self.days_overdue.to_string(),
            self.light.clone(),
            self.pending_fees.to_string(),
            self.updated_at.clone(),
        ]
    }

    /// Map an alerts-sheet record. `None` when `ID_CASA` is unreadable.
    /// Unreadable numeric cells count as zero.
    pub fn from_record(record: &Record) -> Option<Self> {
        let house = HouseId::from_cell(record.text("ID_CASA"))?;
        Some(Self {
            house,
            balance: parse_amount(record.text("SALDO_PENDIENTE")).unwrap_or(0.0),
            days_overdue: parse_integer(record.text("DIAS_ATRASO")).unwrap_or(0).max(0),
            light: record.get("ESTADO_SEMAFORO").unwrap_or("NO_INFO").to_string(),
            pending_fees: parse_integer(record.text("CUOTAS_PENDIENTES"))
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            updated_at: record.text("FECHA_ACTUALIZACION").to_string(),
        })
    }
}
