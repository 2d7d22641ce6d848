//! Private conversations and their messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::PaginationParams;

/// Two-party conversation. Participants are stored in sorted order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_one_id: Uuid,
    pub participant_two_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn participants(&self) -> [Uuid; 2] {
        [self.participant_one_id, self.participant_two_id]
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participants().contains(&user_id)
    }

    /// The participant that is not `user_id`
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_one_id == user_id {
            Some(self.participant_two_id)
        } else if self.participant_two_id == user_id {
            Some(self.participant_one_id)
        } else {
            None
        }
    }
}

fn ordered(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Message model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Message submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessage {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

impl Conversation {
    /// Conversation for the pair, created if missing
    pub async fn find_or_create(
        conn: &mut sqlx::PgConnection,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Self, AppError> {
        let (one, two) = ordered(user_a, user_b);

        sqlx::query(
            r#"
            INSERT INTO conversations (participant_one_id, participant_two_id)
            VALUES ($1, $2)
            ON CONFLICT (participant_one_id, participant_two_id) DO NOTHING
            "#,
        )
        .bind(one)
        .bind(two)
        .execute(&mut *conn)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE participant_one_id = $1 AND participant_two_id = $2",
        )
        .bind(one)
        .bind(two)
        .fetch_one(&mut *conn)
        .await?;

        Ok(conversation)
    }

    pub async fn find_by_id(
        db: &sqlx::PgPool,
        conversation_id: Uuid,
    ) -> Result<Option<Self>, AppError> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(db)
                .await?;

        Ok(conversation)
    }

    pub async fn list_for_user(db: &sqlx::PgPool, user_id: Uuid) -> Result<Vec<Self>, AppError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE participant_one_id = $1 OR participant_two_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(conversations)
    }
}

impl Message {
    /// Store a message and bump the conversation's activity time
    pub async fn create(
        db: &sqlx::PgPool,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Self, AppError> {
        let mut tx = db.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (conversation_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn list(
        db: &sqlx::PgPool,
        conversation_id: Uuid,
        params: &PaginationParams,
    ) -> Result<Vec<Self>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(i64::from(params.limit()))
        .bind(i64::from(params.offset()))
        .fetch_all(db)
        .await?;

        Ok(messages)
    }

    /// Mark everything the reader did not send as read
    pub async fn mark_read(
        db: &sqlx::PgPool,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = NOW()
            WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }
}
