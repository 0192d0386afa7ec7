//! # Condominium Settings
//!
//! Key/value pairs from the `CONFIGURACION` sheet. Keys are trimmed and
//! uppercased. Values are typed by shape: anything containing `.` or `,`
//! is a decimal, all-digit values are integers, the rest stays text.
//! Missing or unusable values fall back to the defaults below.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cell::parse_amount;

pub const KEY_FEE_AMOUNT: &str = "VALOR_ALICUOTA";
pub const KEY_DUE_DAY: &str = "DIA_VENCIMIENTO";
pub const KEY_ON_TIME_POINTS: &str = "PUNTOS_POR_PAGO_A_TIEMPO";
pub const KEY_DISCOUNT_PERCENT: &str = "PORCENTAJE_DESCUENTO";

pub const DEFAULT_FEE_AMOUNT: f64 = 50.0;
pub const DEFAULT_DUE_DAY: u32 = 5;
pub const DEFAULT_ON_TIME_POINTS: i64 = 10;
pub const DEFAULT_DISCOUNT_PERCENT: f64 = 0.0;

/// A typed `VALOR` cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl SettingValue {
    /// Type a raw cell.
    pub fn parse(raw: &str) -> SettingValue {
        let raw = raw.trim();
        if raw.contains('.') || raw.contains(',') {
            if let Some(f) = parse_amount(raw) {
                return Self::Decimal(f);
            }
        } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse() {
                return Self::Integer(n);
            }
        }
        Self::Text(raw.to_string())
    }

    /// Numeric view of the value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(f) => Some(*f),
            Self::Text(_) => None,
        }
    }
}

/// Parsed `CONFIGURACION` sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Settings {
    /// Build from `(CLAVE, VALOR)` pairs. Blank keys are skipped; later
    /// duplicates win.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Settings
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let values = pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let key = k.as_ref().trim().to_uppercase();
                (!key.is_empty()).then(|| (key, SettingValue::parse(v.as_ref())))
            })
            .collect();
        Settings { values }
    }

    /// Raw typed value for a key.
    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(&key.trim().to_uppercase())
    }

    fn positive(&self, key: &str) -> Option<f64> {
        self.get(key)
            .and_then(SettingValue::as_f64)
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Monthly maintenance fee charged by the bulk fee operation.
    pub fn fee_amount(&self) -> f64 {
        self.positive(KEY_FEE_AMOUNT).unwrap_or(DEFAULT_FEE_AMOUNT)
    }

    /// Day of the month fees fall due. Values outside 1..=31 use the default.
    pub fn due_day(&self) -> u32 {
        self.positive(KEY_DUE_DAY)
            .map(|d| d.trunc())
            .filter(|d| (1.0..=31.0).contains(d))
            .map(|d| d as u32)
            .unwrap_or(DEFAULT_DUE_DAY)
    }

    /// Loyalty points awarded for an on-time payment.
    pub fn on_time_points(&self) -> i64 {
        self.positive(KEY_ON_TIME_POINTS)
            .map(|p| p.trunc() as i64)
            .unwrap_or(DEFAULT_ON_TIME_POINTS)
    }

    /// Early-payment discount in percent.
    pub fn discount_percent(&self) -> f64 {
        self.get(KEY_DISCOUNT_PERCENT)
            .and_then(SettingValue::as_f64)
            .filter(|v| (0.0..=100.0).contains(v))
            .unwrap_or(DEFAULT_DISCOUNT_PERCENT)
    }
}
