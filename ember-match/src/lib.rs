pub mod config;
pub mod events;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ember_shared::middleware::metrics_middleware;

use config::AppConfig;
use events::EventSink;
use store::Database;

pub struct AppState<D: Database> {
    pub db: Arc<D>,
    pub config: AppConfig,
    pub events: Arc<dyn EventSink>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router<D: Database>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health_check::<D>))
        .route("/metrics", get(routes::health::metrics::<D>))
        // Swipes
        .route("/swipes", post(routes::swipes::record_swipe::<D>))
        .route("/swipes/stats", get(routes::swipes::get_stats::<D>))
        // Matches and conversations
        .route("/matches", get(routes::matches::list_matches::<D>))
        .route("/matches/:id", get(routes::matches::get_match::<D>))
        .route(
            "/matches/:id/messages",
            get(routes::matches::list_messages::<D>).post(routes::matches::post_message::<D>),
        )
        // Discovery
        .route("/discovery", get(routes::discovery::nearby_profiles::<D>))
        .route("/discovery/preferences", get(routes::discovery::preferences::<D>))
        // Profile
        .route(
            "/profile",
            get(routes::profile::get_profile::<D>).patch(routes::profile::update_profile::<D>),
        )
        .route("/profile/location", put(routes::profile::update_location::<D>))
        .route("/profile/photos", post(routes::profile::add_photo::<D>))
        .route("/hobbies", get(routes::profile::list_hobbies::<D>))
        .route_layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
