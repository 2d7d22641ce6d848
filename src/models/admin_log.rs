//! Audit trail of admin actions

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::PaginationParams;

/// Audit entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminLog {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// What an admin did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    RoleChanged,
    RoleChangeDenied,
    UserActivated,
    UserDeactivated,
}

impl AdminAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminAction::RoleChanged => "ROLE_CHANGED",
            AdminAction::RoleChangeDenied => "ROLE_CHANGE_DENIED",
            AdminAction::UserActivated => "USER_ACTIVATED",
            AdminAction::UserDeactivated => "USER_DEACTIVATED",
        }
    }
}

impl AdminLog {
    pub async fn record(
        db: &sqlx::PgPool,
        admin_id: Uuid,
        action: AdminAction,
        target_type: &str,
        target_id: Option<Uuid>,
        details: serde_json::Value,
    ) -> Result<Self, AppError> {
        let entry = sqlx::query_as::<_, AdminLog>(
            r#"
            INSERT INTO admin_logs (admin_id, action, target_type, target_id, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(admin_id)
        .bind(action.as_str())
        .bind(target_type)
        .bind(target_id)
        .bind(details)
        .fetch_one(db)
        .await?;

        Ok(entry)
    }

    pub async fn list(db: &sqlx::PgPool, params: &PaginationParams) -> Result<Vec<Self>, AppError> {
        let entries = sqlx::query_as::<_, AdminLog>(
            "SELECT * FROM admin_logs ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(params.limit()))
        .bind(i64::from(params.offset()))
        .fetch_all(db)
        .await?;

        Ok(entries)
    }
}

/// Write an audit entry without letting a failure reach the caller
pub async fn record_best_effort(
    db: &sqlx::PgPool,
    admin_id: Uuid,
    action: AdminAction,
    target_type: &str,
    target_id: Option<Uuid>,
    details: serde_json::Value,
) {
    if let Err(err) = AdminLog::record(db, admin_id, action, target_type, target_id, details).await {
        tracing::warn!(
            error = %err,
            admin_id = %admin_id,
            action = action.as_str(),
            "Failed to write admin audit log"
        );
    }
}
