//! Connection request handlers

use crate::authz::connection::{respond, validate_request};
use crate::authz::ConnectionDecision;
use crate::error::AppError;
use crate::handlers::JsonBody;
use crate::models::auth::AuthContext;
use crate::models::connection::{Connection, ConnectionStatus, CreateConnection};
use crate::models::conversation::Conversation;
use crate::models::user::User;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Connection list filter
#[derive(Debug, Deserialize)]
pub struct ConnectionFilter {
    pub status: Option<ConnectionStatus>,
}

/// Receiver's response body
#[derive(Debug, Deserialize)]
pub struct RespondToRequest {
    pub action: ConnectionDecision,
}

/// Open a connection request towards another user
pub async fn send_request(
    State(state): State<AppState>,
    auth: AuthContext,
    body: JsonBody<CreateConnection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = body?;

    let existing = Connection::find_between(&state.db_pool, auth.user_id, payload.receiver_id).await?;
    validate_request(&auth, payload.receiver_id, existing.as_ref())?;

    match User::find_by_id(&state.db_pool, payload.receiver_id).await? {
        Some(receiver) if receiver.is_active => {}
        _ => return Err(AppError::not_found("User", payload.receiver_id)),
    }

    let connection = Connection::create(&state.db_pool, auth.user_id, payload.receiver_id).await?;
    info!(
        connection_id = %connection.id,
        requester_id = %auth.user_id,
        receiver_id = %payload.receiver_id,
        "Connection requested"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": connection
        })),
    ))
}

/// The caller's connections, optionally by status
pub async fn list_connections(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(filter): Query<ConnectionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let connections = Connection::list_for_user(&state.db_pool, auth.user_id, filter.status).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": connections
    })))
}

/// Accept or reject a pending request.
///
/// Accepting also opens the conversation between the pair.
pub async fn respond_to_request(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(connection_id): Path<Uuid>,
    body: JsonBody<RespondToRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = body?;

    let connection = Connection::find_by_id(&state.db_pool, connection_id)
        .await?
        .ok_or_else(|| AppError::not_found("Connection request", connection_id))?;

    let status = respond(&auth, &connection, payload.action).map_err(|err| {
        warn!(
            connection_id = %connection.id,
            user_id = %auth.user_id,
            error = %err,
            "Connection response refused"
        );
        err
    })?;

    let mut tx = state.db_pool.begin().await?;

    let Some(resolved) = Connection::resolve(&mut *tx, connection.id, status).await? else {
        // Settled by a concurrent response after we loaded it.
        let current = Connection::find_by_id(&state.db_pool, connection.id)
            .await?
            .map(|c| c.status)
            .unwrap_or(status);
        return Err(AppError::InvalidState(format!("Request already {}", current)));
    };

    let conversation = if resolved.status == ConnectionStatus::Accepted {
        Some(Conversation::find_or_create(&mut *tx, resolved.requester_id, resolved.receiver_id).await?)
    } else {
        None
    };

    tx.commit().await?;

    info!(
        connection_id = %resolved.id,
        status = %resolved.status,
        "Connection request resolved"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "data": {
            "connection": resolved,
            "conversation": conversation
        }
    })))
}
