//! Typed client for the spreadsheet `values` collection.
//!
//! ## API Paths
//!
//! | Method | Path (relative to API root) | Operation |
//! |--------|-----------------------------|-----------|
//! | GET    | `/v4/spreadsheets/{id}?fields=spreadsheetId` | Probe access |
//! | GET    | `/v4/spreadsheets/{id}/values/{range}` | Read a range |
//! | POST   | `/v4/spreadsheets/{id}/values/{range}:append` | Append rows |
//! | PUT    | `/v4/spreadsheets/{id}/values/{range}` | Overwrite a range |

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::TokenSource;
use crate::config::{ConfigError, SheetsConfig};
use crate::error::SheetsError;
use crate::retry::{send_with_replay, Replay};

/// How written strings are interpreted. `USER_ENTERED` parses numbers and
/// dates the way the Sheets UI does.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteBody<'a> {
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Result of an append or update call.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: UpdateSummary,
}

/// Client for one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    api_url: Url,
    spreadsheet_id: String,
    tokens: Arc<TokenSource>,
}

impl SheetsClient {
    /// Create a client from configuration.
    pub fn new(config: SheetsConfig) -> Result<Self, SheetsError> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::MissingSpreadsheetId.into());
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SheetsError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        let tokens = Arc::new(TokenSource::new(config.credentials, http.clone()));
        Ok(Self {
            http,
            api_url: config.api_url,
            spreadsheet_id: config.spreadsheet_id,
            tokens,
        })
    }

    /// The spreadsheet this client addresses.
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn url(&self, tail: Option<&str>) -> Result<Url, SheetsError> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ConfigError::InvalidUrl(self.api_url.to_string(), "cannot be a base".into())
            })?;
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()]);
            if let Some(tail) = tail {
                segments.extend(["values", tail]);
            }
        }
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, SheetsError> {
        let token = self.tokens.access_token().await?;
        Ok(format!("Bearer {}", token.as_str()))
    }

    async fn check(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response, SheetsError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(endpoint, status, "Sheets API call failed");
        Err(SheetsError::ApiError {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    /// Confirm the spreadsheet exists and the credentials can open it.
    ///
    /// Calls `GET {api}/v4/spreadsheets/{id}?fields=spreadsheetId`.
    pub async fn probe(&self) -> Result<(), SheetsError> {
        let endpoint = "GET spreadsheet";
        let mut url = self.url(None)?;
        url.query_pairs_mut().append_pair("fields", "spreadsheetId");
        let auth = self.bearer().await?;

        let resp = send_with_replay(Replay::Safe, || {
            self.http
                .get(url.clone())
                .header(reqwest::header::AUTHORIZATION, &auth)
                .send()
        })
        .await
        .map_err(|e| SheetsError::Http {
            endpoint: endpoint.into(),
            source: e,
        })?;
        Self::check(resp, endpoint).await.map(|_| ())
    }

    /// Read `range` (A1 notation, e.g. `MOVIMIENTOS!A:J` or just `USUARIOS`)
    /// as rendered text. Numbers and booleans are converted to strings,
    /// empty cells to `""`. Trailing empty cells are omitted by the API.
    ///
    /// Calls `GET {api}/v4/spreadsheets/{id}/values/{range}`.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let endpoint = format!("GET values/{range}");
        let mut url = self.url(Some(range))?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        let auth = self.bearer().await?;

        let resp = send_with_replay(Replay::Safe, || {
            self.http
                .get(url.clone())
                .header(reqwest::header::AUTHORIZATION, &auth)
                .send()
        })
        .await
        .map_err(|e| SheetsError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let resp = Self::check(resp, &endpoint).await?;

        let body: ValueRange = resp.json().await.map_err(|e| SheetsError::Deserialization {
            endpoint,
            source: e,
        })?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Append `row` after the last row of the table in `range`.
    ///
    /// Not replayed after a timeout: the row may already be stored.
    ///
    /// Calls `POST {api}/v4/spreadsheets/{id}/values/{range}:append`.
    pub async fn append_row(&self, range: &str, row: Vec<String>) -> Result<UpdateSummary, SheetsError> {
        let endpoint = format!("POST values/{range}:append");
        let mut url = self.url(Some(&format!("{range}:append")))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION)
            .append_pair("insertDataOption", "INSERT_ROWS");
        let auth = self.bearer().await?;
        let rows = [row];
        let body = WriteBody {
            major_dimension: "ROWS",
            values: &rows,
        };

        let resp = send_with_replay(Replay::ConnectOnly, || {
            self.http
                .post(url.clone())
                .header(reqwest::header::AUTHORIZATION, &auth)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| SheetsError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let resp = Self::check(resp, &endpoint).await?;

        let parsed: AppendResponse = resp.json().await.map_err(|e| SheetsError::Deserialization {
            endpoint,
            source: e,
        })?;
        Ok(parsed.updates)
    }

    /// Overwrite `range` with `rows`.
    ///
    /// Calls `PUT {api}/v4/spreadsheets/{id}/values/{range}`.
    pub async fn update_range(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<UpdateSummary, SheetsError> {
        let endpoint = format!("PUT values/{range}");
        let mut url = self.url(Some(range))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION);
        let auth = self.bearer().await?;
        let body = WriteBody {
            major_dimension: "ROWS",
            values: &rows,
        };

        let resp = send_with_replay(Replay::Safe, || {
            self.http
                .put(url.clone())
                .header(reqwest::header::AUTHORIZATION, &auth)
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| SheetsError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let resp = Self::check(resp, &endpoint).await?;

        resp.json().await.map_err(|e| SheetsError::Deserialization {
            endpoint,
            source: e,
        })
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api: &str) -> SheetsClient {
        SheetsClient::new(SheetsConfig::local_mock(api, "tok").unwrap()).unwrap()
    }

    #[test]
    fn builds_values_urls() {
        let c = client("http://127.0.0.1:9000");
        assert_eq!(
            c.url(Some("MOVIMIENTOS!A:J")).unwrap().as_str(),
            "http://127.0.0.1:9000/v4/spreadsheets/test-spreadsheet/values/MOVIMIENTOS!A:J"
        );
        assert_eq!(
            c.url(None).unwrap().as_str(),
            "http://127.0.0.1:9000/v4/spreadsheets/test-spreadsheet"
        );
    }

    #[test]
    fn keeps_api_path_prefix() {
        let c = client("http://127.0.0.1:9000/proxy/");
        assert_eq!(
            c.url(Some("USUARIOS")).unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/v4/spreadsheets/test-spreadsheet/values/USUARIOS"
        );
    }

    #[test]
    fn converts_cells_to_text() {
        assert_eq!(cell_text(serde_json::json!("x")), "x");
        assert_eq!(cell_text(serde_json::json!(50)), "50");
        assert_eq!(cell_text(serde_json::json!(-12.5)), "-12.5");
        assert_eq!(cell_text(serde_json::json!(true)), "TRUE");
        assert_eq!(cell_text(serde_json::Value::Null), "");
    }

    #[test]
    fn blank_spreadsheet_id_is_rejected() {
        let mut cfg = SheetsConfig::local_mock("http://127.0.0.1:9000", "tok").unwrap();
        cfg.spreadsheet_id = " ".into();
        assert!(matches!(
            SheetsClient::new(cfg),
            Err(SheetsError::Config(ConfigError::MissingSpreadsheetId))
        ));
    }
}
