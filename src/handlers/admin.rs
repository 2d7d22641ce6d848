//! Admin request handlers
//!
//! Every route here requires an admin-surface role. Mutations additionally
//! require ADMIN or SUPER_ADMIN and are written to the audit log.

use crate::authz::{authorize_account_management, authorize_role_change, require_roles, AdminContext};
use crate::error::AppError;
use crate::handlers::JsonBody;
use crate::models::admin_log::{record_best_effort, AdminAction, AdminLog};
use crate::models::auth::AuthContext;
use crate::models::user::{User, UserProfile};
use crate::models::{PaginatedResponse, PaginationParams, UserRole};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// User listing query
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub is_active: bool,
}

async fn load_user(db: &sqlx::PgPool, user_id: Uuid) -> Result<User, AppError> {
    User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminContext(_auth): AdminContext,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = PaginationParams {
        page: params.page,
        limit: params.limit,
    };
    let (users, total) = User::list(&state.db_pool, params.role, &pagination).await?;
    let profiles: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "data": PaginatedResponse::new(profiles, &pagination, total)
    })))
}

pub async fn list_logs(
    State(state): State<AppState>,
    AdminContext(_auth): AdminContext,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = AdminLog::list(&state.db_pool, &params).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": entries
    })))
}

/// Audit a refused role change, then hand the refusal back
async fn deny_role_change(
    state: &AppState,
    auth: &AuthContext,
    target_id: Uuid,
    requested: UserRole,
    err: AppError,
) -> AppError {
    warn!(
        admin_id = %auth.user_id,
        target_id = %target_id,
        requested = %requested,
        error = %err,
        "Role change denied"
    );
    record_best_effort(
        &state.db_pool,
        auth.user_id,
        AdminAction::RoleChangeDenied,
        "user",
        Some(target_id),
        serde_json::json!({ "requested_role": requested, "reason": err.to_string() }),
    )
    .await;
    err
}

pub async fn change_role(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(user_id): Path<Uuid>,
    body: JsonBody<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = body?;

    if let Err(err) = authorize_role_change(&auth, user_id, payload.role) {
        return Err(deny_role_change(&state, &auth, user_id, payload.role, err).await);
    }

    let target = load_user(&state.db_pool, user_id).await?;
    if let Err(err) = authorize_account_management(&auth, target.role) {
        return Err(deny_role_change(&state, &auth, user_id, payload.role, err).await);
    }

    let previous = target.role;
    let updated = User::update_role(&state.db_pool, target.id, payload.role)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;

    record_best_effort(
        &state.db_pool,
        auth.user_id,
        AdminAction::RoleChanged,
        "user",
        Some(updated.id),
        serde_json::json!({ "from": previous, "to": updated.role }),
    )
    .await;

    info!(
        admin_id = %auth.user_id,
        target_id = %updated.id,
        from = %previous,
        to = %updated.role,
        "User role changed"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "data": UserProfile::from(updated)
    })))
}

/// Activate or deactivate an account
pub async fn set_user_status(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(user_id): Path<Uuid>,
    body: JsonBody<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = body?;
    require_roles(&auth, &[UserRole::Admin, UserRole::SuperAdmin])?;

    if user_id == auth.user_id && !payload.is_active {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let target = load_user(&state.db_pool, user_id).await?;
    authorize_account_management(&auth, target.role)?;

    let updated = User::set_active(&state.db_pool, target.id, payload.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))?;

    let action = if updated.is_active {
        AdminAction::UserActivated
    } else {
        AdminAction::UserDeactivated
    };
    record_best_effort(
        &state.db_pool,
        auth.user_id,
        action,
        "user",
        Some(updated.id),
        serde_json::json!({ "is_active": updated.is_active }),
    )
    .await;

    info!(admin_id = %auth.user_id, target_id = %updated.id, action = action.as_str(), "User status changed");

    Ok(Json(serde_json::json!({
        "success": true,
        "data": UserProfile::from(updated)
    })))
}
