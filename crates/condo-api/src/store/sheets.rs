use async_trait::async_trait;
use condo_sheets::SheetsClient;

use super::{column_letter, SheetStore, StoreError};

/// [`SheetStore`] backed by the Google Sheets API.
#[derive(Debug, Clone)]
pub struct SheetsStore {
    client: SheetsClient,
}

impl SheetsStore {
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SheetStore for SheetsStore {
    async fn read(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.client.get_values(sheet).await?)
    }

    async fn append(&self, sheet: &str, row: Vec<String>) -> Result<(), StoreError> {
        let summary = self.client.append_row(sheet, row).await?;
        tracing::debug!(
            sheet,
            range = summary.updated_range.as_deref().unwrap_or(""),
            "row appended"
        );
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &str,
        row_number: usize,
        row: Vec<String>,
    ) -> Result<(), StoreError> {
        let last = column_letter(row.len().max(1));
        let range = format!("{sheet}!A{row_number}:{last}{row_number}");
        self.client.update_range(&range, vec![row]).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.client.probe().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condo_sheets::SheetsConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn update_row_targets_a_to_last_column() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/v4/spreadsheets/test-spreadsheet/values/ALERTAS_SEMAFORO!A3:F3",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "updatedRange": "ALERTAS_SEMAFORO!A3:F3",
                "updatedRows": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = SheetsConfig::local_mock(&server.uri(), "secret-token").unwrap();
        let store = SheetsStore::new(SheetsClient::new(config).unwrap());
        let row = vec!["7".to_string(); 6];
        store.update_row("ALERTAS_SEMAFORO", 3, row).await.unwrap();
    }
}
