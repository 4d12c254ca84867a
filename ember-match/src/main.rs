use std::sync::Arc;

use ember_match::config::AppConfig;
use ember_match::events::publisher::RabbitEventSink;
use ember_match::events::subscriber;
use ember_match::store::postgres::PgDatabase;
use ember_match::{router, AppState};
use ember_shared::clients::db::create_pool;
use ember_shared::clients::rabbitmq::RabbitMQClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ember_shared::middleware::init_tracing("ember-match");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics = ember_shared::middleware::init_metrics()?;

    // Database pool
    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let db = Arc::new(PgDatabase::new(pool));

    // Event broker
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    // Mirror registered users so swipe targets resolve locally
    let sub_rabbitmq = rabbitmq.clone();
    let sub_db = db.clone();
    tokio::spawn(async move {
        if let Err(e) = subscriber::listen_user_registered(sub_rabbitmq, sub_db).await {
            tracing::error!(error = %e, "user.registered subscriber failed");
        }
    });

    let state = Arc::new(AppState {
        db,
        config,
        events: Arc::new(RabbitEventSink::new(rabbitmq)),
        metrics: Some(metrics),
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "ember-match starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
