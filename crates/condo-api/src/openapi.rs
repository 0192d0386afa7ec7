//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json` (behind authentication).

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Condominium Ledger API",
        version = "0.1.0",
        description = "Resident account statements, payments, fines, monthly fees, treasury bookings and delinquency alerts over a Google Sheets ledger."
    ),
    paths(
        crate::routes::auth::login,
        crate::routes::resident::own_statement,
        crate::routes::admin::register_payment,
        crate::routes::admin::register_fine,
        crate::routes::admin::register_monthly_fees,
        crate::routes::admin::refresh_delinquency,
        crate::routes::admin::list_delinquency,
        crate::routes::admin::house_statement,
        crate::routes::treasury::register_transaction,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::auth::LoginRequest,
        crate::routes::auth::LoginResponse,
        crate::routes::admin::PaymentRequest,
        crate::routes::admin::FineRequest,
        crate::routes::admin::MonthlyFeeRequest,
        crate::routes::admin::WriteResponse,
        crate::routes::admin::MonthlyFeeResponse,
        crate::routes::admin::DelinquencyResponse,
        crate::routes::treasury::TreasuryRequest,
        crate::routes::statement::StatementResponse,
        crate::routes::statement::ContactView,
        crate::routes::statement::DelinquencyView,
        crate::routes::statement::MovementView,
    )),
    modifiers(&BearerScheme),
    tags(
        (name = "auth", description = "Session tokens"),
        (name = "resident", description = "Resident self-service"),
        (name = "admin", description = "Administration"),
        (name = "treasury", description = "Treasury bookings on house 0"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
struct BearerScheme;

impl Modify for BearerScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
