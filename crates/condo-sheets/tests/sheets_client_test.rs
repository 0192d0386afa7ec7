//! Contract tests for SheetsClient against the Sheets v4 values API.
//!
//! wiremock stands in for both `sheets.googleapis.com` and the OAuth token
//! endpoint. Paths, query parameters and bodies follow the public REST
//! reference for `spreadsheets.values`.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/v4/spreadsheets/{id}/values/{range}` | `get_values_*` |
//! | POST   | `/v4/spreadsheets/{id}/values/{range}:append` | `append_row_*` |
//! | PUT    | `/v4/spreadsheets/{id}/values/{range}` | `update_range_*` |
//! | GET    | `/v4/spreadsheets/{id}` | `probe_*` |
//! | POST   | `{token_uri}` | `service_account_*` |

use condo_sheets::{Credentials, ServiceAccountKey, SheetsClient, SheetsConfig, SheetsError};
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "/v4/spreadsheets/test-spreadsheet";

fn test_client(server: &MockServer) -> SheetsClient {
    let config = SheetsConfig::local_mock(&server.uri(), "test-token").unwrap();
    SheetsClient::new(config).unwrap()
}

fn service_account_client(server: &MockServer) -> SheetsClient {
    let key = ServiceAccountKey::from_json(
        &serde_json::json!({
            "type": "service_account",
            "client_email": "ledger@condo.iam.gserviceaccount.com",
            "private_key": include_str!("fixtures/test_service_account_key.pem"),
            "token_uri": format!("{}/token", server.uri()),
        })
        .to_string(),
    )
    .unwrap();
    let mut config = SheetsConfig::local_mock(&server.uri(), "unused").unwrap();
    config.credentials = Credentials::ServiceAccount(key);
    SheetsClient::new(config).unwrap()
}

// ── GET values ──────────────────────────────────────────────────────

#[tokio::test]
async fn get_values_sends_path_query_and_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/values/USUARIOS")))
        .and(query_param("valueRenderOption", "FORMATTED_VALUE"))
        .and(query_param("majorDimension", "ROWS"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "USUARIOS!A1:H3",
            "majorDimension": "ROWS",
            "values": [
                ["DNI", "PASSWORD_HASH", "ID_CASA", "ROL"],
                ["12345678", "$2b$12$abc", 3, "CONDOMINO"],
                ["87654321", "$2b$12$def", 0, "ADMIN", true]
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = test_client(&server).get_values("USUARIOS").await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], vec!["12345678", "$2b$12$abc", "3", "CONDOMINO"]);
    assert_eq!(rows[2][4], "TRUE");
}

#[tokio::test]
async fn get_values_of_empty_sheet_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/values/CONFIGURACION")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "range": "CONFIGURACION!A1:Z1000",
            "majorDimension": "ROWS"
        })))
        .mount(&server)
        .await;

    let rows = test_client(&server).get_values("CONFIGURACION").await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn get_values_returns_api_error_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/values/MOVIMIENTOS")))
        .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server).get_values("MOVIMIENTOS").await.unwrap_err();
    match err {
        SheetsError::ApiError { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "PERMISSION_DENIED");
        }
        other => panic!("expected ApiError, got {other:?}"),
    }
}

// ── POST values:append ──────────────────────────────────────────────

#[tokio::test]
async fn append_row_uses_user_entered_insert_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{BASE}/values/MOVIMIENTOS:append")))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(serde_json::json!({
            "majorDimension": "ROWS",
            "values": [["M0001", "3", "2025-04", "PAGO", "Abono", "-40", "", "EFECTIVO", "2025-04-10 09:15", ""]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "spreadsheetId": "test-spreadsheet",
            "tableRange": "MOVIMIENTOS!A1:J5",
            "updates": {
                "spreadsheetId": "test-spreadsheet",
                "updatedRange": "MOVIMIENTOS!A6:J6",
                "updatedRows": 1,
                "updatedColumns": 10,
                "updatedCells": 10
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let row = ["M0001", "3", "2025-04", "PAGO", "Abono", "-40", "", "EFECTIVO", "2025-04-10 09:15", ""]
        .map(String::from)
        .to_vec();
    let summary = test_client(&server).append_row("MOVIMIENTOS", row).await.unwrap();
    assert_eq!(summary.updated_range.as_deref(), Some("MOVIMIENTOS!A6:J6"));
    assert_eq!(summary.updated_rows, Some(1));
}

#[tokio::test]
async fn append_row_is_sent_once_when_the_response_times_out() {
    let server = MockServer::start().await;

    // The row is stored, but the response arrives after the client gave up.
    Mock::given(method("POST"))
        .and(path(format!("{BASE}/values/MOVIMIENTOS:append")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(2))
                .set_body_json(serde_json::json!({ "updates": { "updatedRows": 1 } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = SheetsConfig::local_mock(&server.uri(), "test-token").unwrap();
    config.timeout_secs = 1;
    let client = SheetsClient::new(config).unwrap();

    let err = client
        .append_row("MOVIMIENTOS", vec!["M0001".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SheetsError::Http { .. }), "{err:?}");

    let received = server.received_requests().await.unwrap();
    let appends = received.iter().filter(|r| r.method.as_str() == "POST").count();
    assert_eq!(appends, 1);
}

// ── PUT values ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_range_overwrites_a_row() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("{BASE}/values/ALERTAS_SEMAFORO!A4:F4")))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(serde_json::json!({
            "majorDimension": "ROWS",
            "values": [["3", "80.00", "33", "ROJO", "2", "2025-03-10 09:00"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "spreadsheetId": "test-spreadsheet",
            "updatedRange": "ALERTAS_SEMAFORO!A4:F4",
            "updatedRows": 1,
            "updatedCells": 6
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = vec![["3", "80.00", "33", "ROJO", "2", "2025-03-10 09:00"].map(String::from).to_vec()];
    let summary = test_client(&server)
        .update_range("ALERTAS_SEMAFORO!A4:F4", rows)
        .await
        .unwrap();
    assert_eq!(summary.updated_cells, Some(6));
}

// ── GET spreadsheet ─────────────────────────────────────────────────

#[tokio::test]
async fn probe_requests_only_the_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BASE))
        .and(query_param("fields", "spreadsheetId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "spreadsheetId": "test-spreadsheet"
        })))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server).probe().await.unwrap();
}

#[tokio::test]
async fn probe_reports_missing_spreadsheet() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BASE))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_client(&server).probe().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

// ── Service-account token exchange ──────────────────────────────────

#[tokio::test]
async fn service_account_token_is_exchanged_once_and_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion=ey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.exchanged",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/values/USUARIOS")))
        .and(header("authorization", "Bearer ya29.exchanged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "values": [["DNI"]]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = service_account_client(&server);
    client.get_values("USUARIOS").await.unwrap();
    client.get_values("USUARIOS").await.unwrap();
}

#[tokio::test]
async fn service_account_token_near_expiry_is_refreshed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.short",
            "expires_in": 30
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{BASE}/values/USUARIOS")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"values": []})))
        .mount(&server)
        .await;

    let client = service_account_client(&server);
    client.get_values("USUARIOS").await.unwrap();
    client.get_values("USUARIOS").await.unwrap();
}

#[tokio::test]
async fn service_account_refusal_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let err = service_account_client(&server)
        .get_values("USUARIOS")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}
