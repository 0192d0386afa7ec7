//! # Ledger
//!
//! Typed reads and writes over the four sheets of the condominium
//! spreadsheet. Every call goes to the store; nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;

use condo_core::{
    AlertSnapshot, HouseId, Movement, MovementId, NewMovement, Record, Settings, UserAccount,
};

use crate::store::{
    SheetStore, StoreError, ALERTS_SHEET, MOVEMENTS_SHEET, SETTINGS_SHEET, USERS_SHEET,
};

/// Typed façade over a [`SheetStore`].
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn SheetStore>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self { store }
    }

    async fn records(&self, sheet: &str) -> Result<Vec<Record>, StoreError> {
        Ok(Record::from_values(self.store.read(sheet).await?))
    }

    /// All rows of `USUARIOS`.
    pub async fn users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let records = self.records(USERS_SHEET).await?;
        Ok(records.iter().map(UserAccount::from_record).collect())
    }

    /// All movements with a readable `ID_CASA`.
    pub async fn movements(&self) -> Result<Vec<Movement>, StoreError> {
        let records = self.records(MOVEMENTS_SHEET).await?;
        Ok(records
            .iter()
            .filter_map(|record| {
                let movement = Movement::from_record(record);
                if movement.is_none() {
                    tracing::debug!(row = record.row_number(), "skipping movement without a house");
                }
                movement
            })
            .collect())
    }

    /// Movements of one house, in sheet order.
    pub async fn movements_of(&self, house: HouseId) -> Result<Vec<Movement>, StoreError> {
        let mut movements = self.movements().await?;
        movements.retain(|m| m.house == house);
        Ok(movements)
    }

    /// The identifier the next appended movement should take.
    pub async fn next_movement_id(&self) -> Result<MovementId, StoreError> {
        let records = self.records(MOVEMENTS_SHEET).await?;
        Ok(MovementId::next_after(
            records.iter().map(|r| r.text("ID_MOVIMIENTO")),
        ))
    }

    pub async fn append_movement(&self, movement: &NewMovement) -> Result<(), StoreError> {
        self.store.append(MOVEMENTS_SHEET, movement.to_row()).await
    }

    /// Persisted delinquency rows. Rows without a readable house are
    /// logged and skipped.
    pub async fn alerts(&self) -> Result<Vec<AlertSnapshot>, StoreError> {
        let records = self.records(ALERTS_SHEET).await?;
        Ok(records
            .iter()
            .filter_map(|record| {
                let snapshot = AlertSnapshot::from_record(record);
                if snapshot.is_none() {
                    tracing::warn!(
                        row = record.row_number(),
                        house = record.text("ID_CASA"),
                        "unreadable delinquency row"
                    );
                }
                snapshot
            })
            .collect())
    }

    /// The persisted snapshot for `house`, if it was ever consolidated.
    pub async fn alert_for(&self, house: HouseId) -> Result<Option<AlertSnapshot>, StoreError> {
        let alerts = self.alerts().await?;
        Ok(alerts.into_iter().find(|a| a.house == house))
    }

    /// Write `snapshots` to the alerts sheet: rows of houses already
    /// present are overwritten in place, the others appended.
    pub async fn save_alerts(&self, snapshots: &[AlertSnapshot]) -> Result<(), StoreError> {
        let records = self.records(ALERTS_SHEET).await?;
        let mut rows: HashMap<HouseId, usize> = HashMap::new();
        for record in &records {
            if let Some(house) = HouseId::from_cell(record.text("ID_CASA")) {
                rows.entry(house).or_insert(record.row_number());
            }
        }

        for snapshot in snapshots {
            match rows.get(&snapshot.house) {
                Some(&row) => {
                    self.store
                        .update_row(ALERTS_SHEET, row, snapshot.to_row())
                        .await?
                }
                None => self.store.append(ALERTS_SHEET, snapshot.to_row()).await?,
            }
        }
        Ok(())
    }

    /// `CONFIGURACION` values. An unreadable sheet yields the defaults.
    pub async fn settings(&self) -> Settings {
        match self.records(SETTINGS_SHEET).await {
            Ok(records) => Settings::from_pairs(
                records
                    .iter()
                    .map(|r| (r.text("CLAVE").to_string(), r.text("VALOR").to_string())),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "settings unavailable, using defaults");
                Settings::default()
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use condo_core::settings::DEFAULT_FEE_AMOUNT;

    fn ledger(store: &MemoryStore) -> Ledger {
        Ledger::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn next_id_ignores_malformed_ids() {
        let store = MemoryStore::new().with_sheet(
            MOVEMENTS_SHEET,
            [
                vec!["ID_MOVIMIENTO", "ID_CASA"],
                vec!["M0007", "1"],
                vec!["bogus", "2"],
                vec!["M0003", "x"],
            ],
        );
        let next = ledger(&store).next_movement_id().await.unwrap();
        assert_eq!(next.to_string(), "M0008");
    }

    #[tokio::test]
    async fn movements_skip_rows_without_house() {
        let store = MemoryStore::new().with_sheet(
            MOVEMENTS_SHEET,
            [
                vec!["ID_MOVIMIENTO", "ID_CASA", "MONTO"],
                vec!["M0001", "1", "50"],
                vec!["M0002", "", "10"],
                vec!["M0003", "2.0", "20,5"],
            ],
        );
        let movements = ledger(&store).movements().await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[1].house, HouseId::new(2));
        assert_eq!(movements[1].amount, 20.5);
    }

    #[tokio::test]
    async fn save_alerts_updates_existing_and_appends_new() {
        let store = MemoryStore::new().with_sheet(
            ALERTS_SHEET,
            [
                vec![
                    "ID_CASA",
                    "SALDO_PENDIENTE",
                    "DIAS_ATRASO",
                    "ESTADO_SEMAFORO",
                    "CUOTAS_PENDIENTES",
                    "FECHA_ACTUALIZACION",
                ],
                vec!["2", "100.00", "40", "ROJO", "2", "2025-01-01 10:00"],
            ],
        );
        let mut paid = AlertSnapshot::never_assessed(HouseId::new(2));
        paid.updated_at = "2025-02-01 09:00".into();
        let mut fresh = AlertSnapshot::never_assessed(HouseId::new(5));
        fresh.updated_at = "2025-02-01 09:00".into();

        ledger(&store).save_alerts(&[paid, fresh]).await.unwrap();

        let rows = store.rows(ALERTS_SHEET);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["2", "0.00", "0", "VERDE", "0", "2025-02-01 09:00"]);
        assert_eq!(rows[2][0], "5");
    }

    #[tokio::test]
    async fn settings_default_when_sheet_missing() {
        let store = MemoryStore::new();
        let settings = ledger(&store).settings().await;
        assert_eq!(settings.fee_amount(), DEFAULT_FEE_AMOUNT);
    }

    #[tokio::test]
    async fn settings_read_from_sheet() {
        let store = MemoryStore::new().with_sheet(
            SETTINGS_SHEET,
            [
                vec!["CLAVE", "VALOR"],
                vec![" valor_alicuota ", "75,50"],
                vec!["DIA_VENCIMIENTO", "10"],
            ],
        );
        let settings = ledger(&store).settings().await;
        assert_eq!(settings.fee_amount(), 75.5);
        assert_eq!(settings.due_day(), 10);
    }
}
