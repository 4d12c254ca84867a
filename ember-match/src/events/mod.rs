pub mod publisher;
pub mod subscriber;

use uuid::Uuid;

use crate::models::{ConversationMessage, Match};

/// Outbound side-channel for domain events. Emission happens after the
/// originating transaction commits and must never block or fail the caller.
pub trait EventSink: Send + Sync {
    fn match_created(&self, created: &Match);

    fn message_posted(&self, message: &ConversationMessage, recipient_id: Uuid);

    fn is_connected(&self) -> bool {
        true
    }
}
