//! Companies and their owner / HR manager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::authz::Ownership;
use crate::error::AppError;

/// Company model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub owner_id: Uuid,
    pub hr_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: Some(self.owner_id),
            hr_id: self.hr_id,
        }
    }
}

/// Company creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCompany {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub hr_id: Option<Uuid>,
}

/// Company update request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCompany {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub hr_id: Option<Uuid>,
}

impl Company {
    pub async fn create(
        db: &sqlx::PgPool,
        owner_id: Uuid,
        create: CreateCompany,
    ) -> Result<Self, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, description, website, location, owner_id, hr_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(create.name.trim())
        .bind(create.description)
        .bind(create.website)
        .bind(create.location)
        .bind(owner_id)
        .bind(create.hr_id)
        .fetch_one(db)
        .await?;

        Ok(company)
    }

    pub async fn find_by_id(db: &sqlx::PgPool, company_id: Uuid) -> Result<Option<Self>, AppError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(db)
            .await?;

        Ok(company)
    }

    /// Companies the user owns or manages
    pub async fn list_managed_by(db: &sqlx::PgPool, user_id: Uuid) -> Result<Vec<Self>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT * FROM companies
            WHERE owner_id = $1 OR hr_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(companies)
    }

    pub async fn update(&self, db: &sqlx::PgPool, update: UpdateCompany) -> Result<Self, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                website = COALESCE($4, website),
                location = COALESCE($5, location),
                hr_id = COALESCE($6, hr_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(update.name.map(|name| name.trim().to_string()))
        .bind(update.description)
        .bind(update.website)
        .bind(update.location)
        .bind(update.hr_id)
        .fetch_one(db)
        .await?;

        Ok(company)
    }
}
