//! Rows of the `USUARIOS` sheet: login accounts and house contacts.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::house::{HouseId, Role};
use crate::record::Record;

/// Value of `ESTADO` for houses that are billed and assessed.
pub const ACTIVE_STATUS: &str = "ACTIVO";

/// One user row. Columns are looked up by header, in any order.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub dni: String,
    pub password_hash: String,
    pub house: Option<HouseId>,
    /// `None` when `ROL` is blank or unknown; such users cannot log in.
    pub role: Option<Role>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
}

impl UserAccount {
    /// Map a users-sheet record.
    pub fn from_record(record: &Record) -> Self {
        let owned = |col: &str| record.get(col).map(str::to_string);
        Self {
            dni: record.text("DNI").to_string(),
            password_hash: record.text("PASSWORD_HASH").to_string(),
            house: HouseId::from_cell(record.text("ID_CASA")),
            role: record.get("ROL").and_then(|r| r.parse().ok()),
            name: owned("NOMBRE"),
            email: owned("EMAIL"),
            phone: owned("CELULAR"),
            status: owned("ESTADO"),
        }
    }

    /// A blank `ESTADO` counts as active.
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.trim().eq_ignore_ascii_case(ACTIVE_STATUS))
    }

    /// Contact details for reports.
    pub fn contact(&self) -> Contact {
        Contact {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Contact details attached to statements and delinquency reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    /// Name, or `N/A (Casa n)` when unknown.
    pub fn display_name(&self, house: HouseId) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("N/A (Casa {house})"))
    }

    pub fn display_email(&self) -> String {
        self.email.clone().unwrap_or_else(|| "N/A".to_string())
    }

    pub fn display_phone(&self) -> String {
        self.phone.clone().unwrap_or_else(|| "N/A".to_string())
    }
}

/// Find the login account for `dni`. Comparison is on trimmed text.
pub fn find_by_dni<'a>(users: &'a [UserAccount], dni: &str) -> Option<&'a UserAccount> {
    let dni = dni.trim();
    if dni.is_empty() {
        return None;
    }
    users.iter().find(|u| u.dni == dni)
}

/// First user row registered for `house`.
pub fn find_by_house(users: &[UserAccount], house: HouseId) -> Option<&UserAccount> {
    users.iter().find(|u| u.house == Some(house))
}

/// Active houses, deduplicated and sorted. House 0 is included when active.
pub fn active_houses(users: &[UserAccount]) -> Vec<HouseId> {
    users
        .iter()
        .filter(|u| u.is_active())
        .filter_map(|u| u.house)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// House to contact map. The first row for a house wins.
pub fn contact_directory(users: &[UserAccount]) -> BTreeMap<HouseId, Contact> {
    let mut directory = BTreeMap::new();
    for user in users {
        if let Some(house) = user.house {
            directory.entry(house).or_insert_with(|| user.contact());
        }
    }
    directory
}
