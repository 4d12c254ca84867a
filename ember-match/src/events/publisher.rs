use uuid::Uuid;

use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{ConversationMessage, Match};

use super::EventSink;

const SOURCE: &str = "ember-match";

pub async fn publish_match_created(rabbitmq: &RabbitMQClient, match_id: Uuid, user1_id: Uuid, user2_id: Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCH_CREATED,
        payloads::MatchCreated {
            match_id,
            user1_id,
            user2_id,
        },
    )
    .with_correlation(match_id);

    if let Err(e) = rabbitmq.publish_event(&event).await {
        tracing::error!(error = %e, match_id = %match_id, "failed to publish match.created event");
    }
}

pub async fn publish_message_sent(
    rabbitmq: &RabbitMQClient,
    message_id: Uuid,
    match_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    content_preview: &str,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCH_MESSAGE_SENT,
        payloads::MessageSent {
            message_id,
            match_id,
            sender_id,
            recipient_id,
            content_preview: content_preview.to_string(),
        },
    )
    .with_user(sender_id)
    .with_correlation(match_id);

    if let Err(e) = rabbitmq.publish_event(&event).await {
        tracing::error!(error = %e, "failed to publish message.sent event");
    }
}

/// Publishes to RabbitMQ on a detached task so the request path never waits on the broker.
pub struct RabbitEventSink {
    rabbitmq: RabbitMQClient,
}

impl RabbitEventSink {
    pub fn new(rabbitmq: RabbitMQClient) -> Self {
        Self { rabbitmq }
    }
}

impl EventSink for RabbitEventSink {
    fn match_created(&self, created: &Match) {
        let rabbitmq = self.rabbitmq.clone();
        let (match_id, user1_id, user2_id) = (created.id, created.user1_id, created.user2_id);
        tokio::spawn(async move {
            publish_match_created(&rabbitmq, match_id, user1_id, user2_id).await;
        });
    }

    fn message_posted(&self, message: &ConversationMessage, recipient_id: Uuid) {
        let rabbitmq = self.rabbitmq.clone();
        let (message_id, match_id, sender_id) = (message.id, message.match_id, message.sender_id);
        let preview: String = message.content.chars().take(100).collect();
        tokio::spawn(async move {
            publish_message_sent(&rabbitmq, message_id, match_id, sender_id, recipient_id, &preview).await;
        });
    }

    fn is_connected(&self) -> bool {
        self.rabbitmq.is_connected()
    }
}
