//! # Houses and Roles
//!
//! [`HouseId`] identifies a unit in the condominium. House `0` is reserved
//! for the treasury / administration account, which books common income
//! and expenses and never appears in delinquency reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cell::parse_integer;
use crate::error::ValidationError;

/// A condominium house number (`ID_CASA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseId(u32);

impl HouseId {
    /// The treasury / administration account.
    pub const TREASURY: HouseId = HouseId(0);

    /// Wrap a raw house number.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw house number.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the treasury account.
    pub fn is_treasury(self) -> bool {
        self == Self::TREASURY
    }

    /// Parse a sheet cell such as `"7"` or `"7.0"`.
    pub fn from_cell(cell: &str) -> Option<Self> {
        parse_integer(cell)
            .and_then(|n| u32::try_from(n).ok())
            .map(Self)
    }
}

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HouseId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_cell(s).ok_or_else(|| ValidationError::InvalidHouseId(s.to_string()))
    }
}

/// Roles stored in the `ROL` column of the user sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative access.
    #[serde(rename = "ADMIN")]
    Admin,
    /// Treasury staff; may book treasury transactions.
    #[serde(rename = "TESORERIA")]
    Treasurer,
    /// A resident; may read their own account.
    #[serde(rename = "CONDOMINO")]
    Resident,
}

impl Role {
    /// Sheet / token representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Treasurer => "TESORERIA",
            Self::Resident => "CONDOMINO",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "TESORERIA" => Ok(Self::Treasurer),
            "CONDOMINO" => Ok(Self::Resident),
            _ => Err(ValidationError::UnknownRole(s.to_string())),
        }
    }
}
