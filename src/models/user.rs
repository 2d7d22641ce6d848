//! User accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{PaginationParams, UserRole};

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: String::new(),
            password_hash: String::new(),
            name: String::new(),
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// User creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub role: Option<UserRole>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// User profile response (without sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Create a user with an already hashed password
    pub async fn create(
        db: &sqlx::PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
        role: UserRole,
    ) -> Result<Self, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email.trim().to_lowercase())
        .bind(password_hash)
        .bind(name.trim())
        .bind(role)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Email already registered"))?;

        Ok(user)
    }

    pub async fn find_by_id(db: &sqlx::PgPool, user_id: Uuid) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

        Ok(user)
    }

    pub async fn find_by_email(db: &sqlx::PgPool, email: &str) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(db)
            .await?;

        Ok(user)
    }

    /// List users, optionally filtered by role
    pub async fn list(
        db: &sqlx::PgPool,
        role: Option<UserRole>,
        params: &PaginationParams,
    ) -> Result<(Vec<Self>, u64), AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(i64::from(params.limit()))
        .bind(i64::from(params.offset()))
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)",
        )
        .bind(role)
        .fetch_one(db)
        .await?;

        Ok((users, total.max(0) as u64))
    }

    /// Account totals per role
    pub async fn count_by_role(db: &sqlx::PgPool) -> Result<Vec<(UserRole, i64)>, AppError> {
        let counts = sqlx::query_as::<_, (UserRole, i64)>(
            "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(db)
        .await?;

        Ok(counts)
    }

    pub async fn update_role(
        db: &sqlx::PgPool,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(role)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    pub async fn set_active(
        db: &sqlx::PgPool,
        user_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_hides_password_hash() {
        let user = User {
            password_hash: "$2b$12$secret".to_string(),
            ..User::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());

        let profile = UserProfile::from(user);
        assert_eq!(profile.role, UserRole::User);
    }

    #[test]
    fn test_create_user_validation() {
        let request = CreateUser {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: "".to_string(),
            role: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("name"));
    }
}
