//! Broker access for the two flows the services have: publishing enveloped
//! domain events to the topic exchange, and consuming one routing key into a
//! durable per-service queue.

use lapin::{
    options::{
        BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use serde::Serialize;

use crate::types::Event;

pub const EXCHANGE_NAME: &str = "ember.events";

/// Unacked deliveries a consumer may hold at once.
const CONSUMER_PREFETCH: u16 = 16;

const PERSISTENT: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker: {0}")]
    Broker(#[from] lapin::Error),

    #[error("event encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ");
        Ok(Self { channel })
    }

    /// Publishes a persistent event, routed by its `event_type`, and waits
    /// for the broker confirmation.
    pub async fn publish_event<T: Serialize>(&self, event: &Event<T>) -> Result<(), BrokerError> {
        let payload = encode(event)?;
        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                &event.event_type,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_message_id(event.id.to_string().into())
                    .with_delivery_mode(PERSISTENT),
            )
            .await?
            .await?;

        tracing::debug!(routing_key = %event.event_type, event_id = %event.id, "event published");
        Ok(())
    }

    /// Binds a durable queue to one routing key and starts consuming with
    /// manual acks.
    pub async fn consume(&self, queue: &str, routing_key: &str) -> Result<Consumer, BrokerError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        self.channel
            .queue_bind(queue, EXCHANGE_NAME, routing_key, QueueBindOptions::default(), FieldTable::default())
            .await?;
        self.channel
            .basic_qos(CONSUMER_PREFETCH, BasicQosOptions::default())
            .await?;

        let consumer = self
            .channel
            .basic_consume(queue, &consumer_tag(queue), BasicConsumeOptions::default(), FieldTable::default())
            .await?;

        tracing::info!(queue = %queue, routing_key = %routing_key, "consuming from RabbitMQ");
        Ok(consumer)
    }

    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }
}

fn encode<T: Serialize>(event: &Event<T>) -> Result<Vec<u8>, BrokerError> {
    serde_json::to_vec(event).map_err(|e| {
        tracing::error!(error = %e, event_type = %event.event_type, "failed to serialize event");
        BrokerError::from(e)
    })
}

fn consumer_tag(queue: &str) -> String {
    format!("{queue}-consumer")
}
