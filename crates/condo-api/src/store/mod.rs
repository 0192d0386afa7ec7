//! # Sheet Storage
//!
//! The service sees the spreadsheet as named grids of text cells. The
//! [`SheetStore`] trait is that seam: [`SheetsStore`] talks to Google
//! Sheets, [`MemoryStore`] keeps grids in process for tests and local runs.
//! Typed access lives one level up in [`crate::ledger`].

mod memory;
mod sheets;

pub use memory::MemoryStore;
pub use sheets::SheetsStore;

use async_trait::async_trait;
use thiserror::Error;

/// User accounts.
pub const USERS_SHEET: &str = "USUARIOS";
/// Ledger movements.
pub const MOVEMENTS_SHEET: &str = "MOVIMIENTOS";
/// Persisted delinquency snapshot.
pub const ALERTS_SHEET: &str = "ALERTAS_SEMAFORO";
/// `CLAVE`/`VALOR` settings.
pub const SETTINGS_SHEET: &str = "CONFIGURACION";

/// Errors from a sheet store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The Sheets API call failed.
    #[error(transparent)]
    Sheets(#[from] condo_sheets::SheetsError),

    /// The sheet does not exist in the store.
    #[error("sheet not found: {0}")]
    UnknownSheet(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Row-level access to the spreadsheet.
///
/// Grids are returned header row first. Row numbers are 1-based sheet rows,
/// so the first data row is 2.
#[async_trait]
pub trait SheetStore: Send + Sync + 'static {
    /// All rows of `sheet`, header first. Trailing blank cells may be missing.
    async fn read(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append `row` after the last row of `sheet`.
    async fn append(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError>;

    /// Overwrite row `row_number` of `sheet`, starting at column A.
    async fn update_row(
        &self,
        sheet: &str,
        row_number: usize,
        row: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Check that the backing spreadsheet is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Spreadsheet column letter for a 1-based column index (1 → A, 27 → AA).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
