use std::sync::Arc;

use futures_lite::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};

use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::types::event::{payloads, routing_keys, Event};

use crate::store::{Database, ProfileRepository};

/// Mirror user ids announced by the auth service so target resolution works.
pub async fn listen_user_registered<D: Database>(rabbitmq: RabbitMQClient, db: Arc<D>) -> anyhow::Result<()> {
    let mut consumer = rabbitmq
        .consume("ember-match.user_registered", routing_keys::AUTH_USER_REGISTERED)
        .await?;

    tracing::info!("listening for user.registered events");

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "consumer delivery error");
                continue;
            }
        };

        match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
            Ok(event) => {
                let user_id = event.data.user_id;
                match db.transaction(|conn| conn.register_user(user_id)) {
                    Ok(inserted) => {
                        tracing::info!(user_id = %user_id, new = inserted, "user registered");
                        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                            tracing::error!(error = %e, "failed to ack delivery");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, user_id = %user_id, "failed to register user");
                        let requeue = e.code().is_retryable();
                        if let Err(e) = delivery
                            .nack(BasicNackOptions { requeue, ..Default::default() })
                            .await
                        {
                            tracing::error!(error = %e, "failed to nack delivery");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to deserialize user.registered event");
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::error!(error = %e, "failed to ack malformed delivery");
                }
            }
        }
    }

    Ok(())
}
