//! # condo-api: HTTP Service for the Condominium Ledger
//!
//! Authenticates residents and staff with JWT bearer tokens and keeps the
//! ledger in a Google Sheets spreadsheet.
//!
//! ## API Surface
//!
//! | Path | Role | Module |
//! |------|------|--------|
//! | `POST /login` | none | [`routes::auth`] |
//! | `GET /condomino/estado_cuenta` | CONDOMINO | [`routes::resident`] |
//! | `POST /admin/pagos`, `/admin/multas`, `/admin/alicuotas` | ADMIN | [`routes::admin`] |
//! | `POST /admin/actualizar_semaforo`, `GET /admin/semaforo` | ADMIN | [`routes::admin`] |
//! | `GET /admin/estado-cuenta/:id_casa` | ADMIN | [`routes::admin`] |
//! | `POST /admin/tesoreria/transaccion` | ADMIN, TESORERIA | [`routes::treasury`] |
//! | `GET /openapi.json` | any | [`openapi`] |
//! | `GET /health/*`, `GET /metrics` | none | this module |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler          (protected)
//! TraceLayer → MetricsMiddleware → RateLimitMiddleware → Handler     (/login)
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod ledger;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Login, health probes and `/metrics` are mounted outside the auth
/// middleware.
pub fn app(state: AppState) -> Router {
    let limiter = RateLimiter::new(state.config.login_rate_limit.clone());
    let tokens = Arc::clone(&state.tokens);
    let metrics = state.metrics.clone();

    // Bearer-token routes.
    let protected = Router::new()
        .merge(routes::resident::router())
        .merge(routes::admin::router())
        .merge(routes::treasury::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware));

    let login = routes::auth::router()
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(axum::Extension(limiter));

    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(prometheus_metrics));

    Router::new()
        .merge(protected)
        .merge(login)
        .merge(public)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(tokens))
        .layer(axum::Extension(metrics))
        .with_state(state)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" when the spreadsheet is configured and
/// reachable, 503 with a diagnostic message otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = &state.store else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "spreadsheet backend not configured",
        )
            .into_response();
    };
    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "readiness check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, "spreadsheet unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
