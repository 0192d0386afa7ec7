use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{SheetStore, StoreError};

/// In-process [`SheetStore`].
///
/// Clones share the same grids, so a test can keep a handle and inspect
/// what the service wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: Arc<RwLock<HashMap<String, Vec<Vec<String>>>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `sheet` with `rows` (header first).
    pub fn with_sheet<R, C>(self, sheet: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.sheets.write().insert(sheet.to_string(), grid);
        self
    }

    /// Snapshot of `sheet`, or an empty grid when it does not exist.
    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets.read().get(sheet).cloned().unwrap_or_default()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn read(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.check_online()?;
        self.sheets
            .read()
            .get(sheet)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))
    }

    async fn append(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.check_online()?;
        let mut sheets = self.sheets.write();
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))?;
        grid.push(row);
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &str,
        row_number: usize,
        row: Vec<String>,
    ) -> Result<(), StoreError> {
        self.check_online()?;
        let mut sheets = self.sheets.write();
        let grid = sheets
            .get_mut(sheet)
            .ok_or_else(|| StoreError::UnknownSheet(sheet.to_string()))?;
        let index = row_number.saturating_sub(1);
        if grid.len() <= index {
            grid.resize(index + 1, Vec::new());
        }
        let target = &mut grid[index];
        if target.len() < row.len() {
            target.resize(row.len(), String::new());
        }
        for (cell, value) in target.iter_mut().zip(row) {
            *cell = value;
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }
}
