use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use ember_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::store::Database;
use crate::AppState;

/// Liveness plus a probe of the database and the event broker.
pub async fn health_check<D: Database>(State(state): State<Arc<AppState<D>>>) -> Response {
    let database = match state.db.ping() {
        Ok(()) => HealthCheck::pass("database"),
        Err(e) => HealthCheck::fail("database", e.to_string()),
    };
    // Events are best effort, so a lost broker only degrades the service.
    let broker = if state.events.is_connected() {
        HealthCheck::pass("rabbitmq")
    } else {
        HealthCheck {
            name: "rabbitmq".to_string(),
            status: HealthStatus::Degraded,
            message: Some("not connected".to_string()),
        }
    };

    let response = HealthResponse::healthy("ember-match", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database, broker]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Prometheus text exposition.
pub async fn metrics<D: Database>(State(state): State<Arc<AppState<D>>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
