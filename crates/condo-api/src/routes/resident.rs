//! # Resident Routes
//!
//! `/condomino/*`: a resident's view of their own house.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use condo_core::resident::find_by_house;
use condo_core::{Contact, Role};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::routes::statement::{self, StatementResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/condomino/estado_cuenta", get(own_statement))
}

/// GET /condomino/estado_cuenta: Statement of the caller's house.
#[utoipa::path(
    get,
    path = "/condomino/estado_cuenta",
    responses(
        (status = 200, description = "Account statement", body = StatementResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not a resident or has no house", body = crate::error::ErrorBody),
        (status = 502, description = "Spreadsheet error", body = crate::error::ErrorBody),
        (status = 503, description = "Spreadsheet not configured", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "resident"
)]
pub(crate) async fn own_statement(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<StatementResponse>, AppError> {
    require_role(&caller, Role::Resident)?;
    let house = caller
        .house
        .ok_or_else(|| AppError::Forbidden("token is not bound to a house".into()))?;
    let ledger = state.ledger()?;

    let users = ledger.users().await?;
    let contact = find_by_house(&users, house)
        .map(|u| u.contact())
        .unwrap_or_else(Contact::default);

    let response = statement::build(&ledger, house, &contact, state.clock.offset()).await?;
    Ok(Json(response))
}
