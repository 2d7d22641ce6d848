//! Conversation and message handlers

use crate::error::AppError;
use crate::handlers::{validated, JsonBody};
use crate::models::auth::AuthContext;
use crate::models::connection::Connection;
use crate::models::conversation::{Conversation, Message, SendMessage};
use crate::models::PaginationParams;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{debug, warn};
use uuid::Uuid;

async fn load_conversation(db: &sqlx::PgPool, conversation_id: Uuid) -> Result<Conversation, AppError> {
    Conversation::find_by_id(db, conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation", conversation_id))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let conversations = Conversation::list_for_user(&state.db_pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": conversations
    })))
}

/// Message history, newest first; marks the caller's unread messages as read
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    let conversation = load_conversation(&state.db_pool, conversation_id).await?;
    state
        .messaging_policy
        .authorize_read(&auth, &conversation)
        .map_err(|err| {
            warn!(conversation_id = %conversation.id, user_id = %auth.user_id, "Conversation read denied");
            err
        })?;

    let messages = Message::list(&state.db_pool, conversation.id, &params).await?;

    if conversation.is_participant(auth.user_id) {
        let marked = Message::mark_read(&state.db_pool, conversation.id, auth.user_id).await?;
        debug!(conversation_id = %conversation.id, marked, "Messages marked read");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "data": messages
    })))
}

/// Post into a conversation
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(conversation_id): Path<Uuid>,
    body: JsonBody<SendMessage>,
) -> Result<impl IntoResponse, AppError> {
    let payload = validated(body)?;
    let conversation = load_conversation(&state.db_pool, conversation_id).await?;

    let connection_status = match conversation.other_participant(auth.user_id) {
        Some(other) => Connection::find_between(&state.db_pool, auth.user_id, other)
            .await?
            .map(|connection| connection.status),
        None => None,
    };

    state
        .messaging_policy
        .authorize_send(&auth, &conversation, connection_status)
        .map_err(|err| {
            warn!(
                conversation_id = %conversation.id,
                user_id = %auth.user_id,
                error = %err,
                "Message send denied"
            );
            err
        })?;

    let message = Message::create(&state.db_pool, conversation.id, auth.user_id, &payload.content).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": message
        })),
    ))
}
