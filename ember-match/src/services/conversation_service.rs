use chrono::{DateTime, Utc};
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::events::EventSink;
use crate::models::{ConversationMessage, NewMessage};
use crate::services::swipe_service::authorize_participant;
use crate::store::{Database, MatchRepository, MessageRepository};

pub const MAX_MESSAGE_CHARS: usize = 1000;

pub fn list_messages<D: Database>(db: &D, match_id: Uuid, user_id: Uuid) -> AppResult<Vec<ConversationMessage>> {
    db.transaction(|conn| {
        authorize_participant(conn, match_id, user_id)?;
        conn.list_messages(match_id)
    })
}

/// Appends a message to the match conversation and bumps the match's
/// `last_interaction_at` to the message timestamp.
pub fn post_message<D: Database>(
    db: &D,
    events: &dyn EventSink,
    match_id: Uuid,
    sender_id: Uuid,
    content: &str,
    now: DateTime<Utc>,
) -> AppResult<ConversationMessage> {
    let (message, recipient_id) = db.transaction(|conn| {
        let found = authorize_participant(conn, match_id, sender_id)?;
        let content = validate_content(content)?;

        let message = conn.insert_message(NewMessage {
            match_id,
            sender_id,
            content: content.to_string(),
            created_at: now,
        })?;
        conn.update_last_interaction(match_id, now)?;

        let recipient_id = found
            .other_participant(sender_id)
            .ok_or_else(|| AppError::internal("participant check passed without a counterpart"))?;
        Ok((message, recipient_id))
    })?;

    metrics::counter!("messages_posted_total").increment(1);
    events.message_posted(&message, recipient_id);
    Ok(message)
}

fn validate_content(content: &str) -> AppResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(ErrorCode::InvalidContent, "message cannot be empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::new(
            ErrorCode::InvalidContent,
            format!("message cannot exceed {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(trimmed)
}
