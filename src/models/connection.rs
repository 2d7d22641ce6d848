//! Connection requests between users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;

/// Connection request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ConnectionStatus::Pending)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        })
    }
}

/// Connection model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Connection {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub receiver_id: Uuid,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Connection request payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConnection {
    pub receiver_id: Uuid,
}

impl Connection {
    pub async fn create(
        db: &sqlx::PgPool,
        requester_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Self, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connections (requester_id, receiver_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(requester_id)
        .bind(receiver_id)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "A connection with this user already exists"))?;

        Ok(connection)
    }

    pub async fn find_by_id(db: &sqlx::PgPool, connection_id: Uuid) -> Result<Option<Self>, AppError> {
        let connection = sqlx::query_as::<_, Connection>("SELECT * FROM connections WHERE id = $1")
            .bind(connection_id)
            .fetch_optional(db)
            .await?;

        Ok(connection)
    }

    /// Connection between two users, in either direction
    pub async fn find_between(
        db: &sqlx::PgPool,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Self>, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            SELECT * FROM connections
            WHERE (requester_id = $1 AND receiver_id = $2)
               OR (requester_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(db)
        .await?;

        Ok(connection)
    }

    pub async fn list_for_user(
        db: &sqlx::PgPool,
        user_id: Uuid,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Self>, AppError> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
            SELECT * FROM connections
            WHERE (requester_id = $1 OR receiver_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(db)
        .await?;

        Ok(connections)
    }

    /// Move a pending connection to `status`.
    ///
    /// Returns `None` when the row is no longer pending, so two concurrent
    /// responses cannot both succeed.
    pub async fn resolve(
        conn: &mut sqlx::PgConnection,
        connection_id: Uuid,
        status: ConnectionStatus,
    ) -> Result<Option<Self>, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
            UPDATE connections SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(status)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(status: ConnectionStatus) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ConnectionStatus::Pending.is_terminal());
        assert!(ConnectionStatus::Accepted.is_terminal());
        assert!(ConnectionStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        let value = serde_json::to_value(connection(ConnectionStatus::Accepted)).unwrap();
        assert_eq!(value["status"], "ACCEPTED");

        let status: ConnectionStatus = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(status, ConnectionStatus::Rejected);
    }
}
