//! Job applications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::authz::Ownership;
use crate::error::AppError;

/// Application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Shortlisted,
    Rejected,
    Hired,
}

impl Default for ApplicationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Application model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Applicant row as seen by the hiring side
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Applicant {
    pub application_id: Uuid,
    pub applicant_id: Uuid,
    pub name: String,
    pub email: String,
    pub cover_letter: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Ownership identities behind an application
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ApplicationAccess {
    pub application_id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub owner_id: Uuid,
    pub hr_id: Option<Uuid>,
    pub status: ApplicationStatus,
}

impl ApplicationAccess {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: Some(self.owner_id),
            hr_id: self.hr_id,
        }
    }
}

/// Application submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApplication {
    #[validate(length(max = 10000))]
    pub cover_letter: Option<String>,
    #[validate(url)]
    pub resume_url: Option<String>,
}

/// Status change request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateApplicationStatus {
    pub status: ApplicationStatus,
}

impl Application {
    pub async fn create(
        db: &sqlx::PgPool,
        job_id: Uuid,
        applicant_id: Uuid,
        create: CreateApplication,
    ) -> Result<Self, AppError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, applicant_id, cover_letter, resume_url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(applicant_id)
        .bind(create.cover_letter)
        .bind(create.resume_url)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "You have already applied to this job"))?;

        Ok(application)
    }

    pub async fn exists(db: &sqlx::PgPool, job_id: Uuid, applicant_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE job_id = $1 AND applicant_id = $2)",
        )
        .bind(job_id)
        .bind(applicant_id)
        .fetch_one(db)
        .await?;

        Ok(exists)
    }

    pub async fn list_for_applicant(
        db: &sqlx::PgPool,
        applicant_id: Uuid,
    ) -> Result<Vec<Self>, AppError> {
        let applications = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE applicant_id = $1 ORDER BY created_at DESC",
        )
        .bind(applicant_id)
        .fetch_all(db)
        .await?;

        Ok(applications)
    }

    pub async fn list_applicants(db: &sqlx::PgPool, job_id: Uuid) -> Result<Vec<Applicant>, AppError> {
        let applicants = sqlx::query_as::<_, Applicant>(
            r#"
            SELECT a.id AS application_id, a.applicant_id, u.name, u.email,
                   a.cover_letter, a.resume_url, a.status, a.created_at AS applied_at
            FROM applications a
            JOIN users u ON u.id = a.applicant_id
            WHERE a.job_id = $1
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(db)
        .await?;

        Ok(applicants)
    }

    pub async fn find_access(
        db: &sqlx::PgPool,
        application_id: Uuid,
    ) -> Result<Option<ApplicationAccess>, AppError> {
        let access = sqlx::query_as::<_, ApplicationAccess>(
            r#"
            SELECT a.id AS application_id, a.job_id, a.applicant_id, c.owner_id, c.hr_id, a.status
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            JOIN companies c ON c.id = j.company_id
            WHERE a.id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(db)
        .await?;

        Ok(access)
    }

    pub async fn update_status(
        db: &sqlx::PgPool,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Self, AppError> {
        let application = sqlx::query_as::<_, Application>(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(application_id)
        .bind(status)
        .fetch_one(db)
        .await?;

        Ok(application)
    }

    /// Pending applications across the given companies
    pub async fn count_pending_for_companies(
        db: &sqlx::PgPool,
        company_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.status = 'PENDING' AND j.company_id = ANY($1)
            "#,
        )
        .bind(company_ids)
        .fetch_one(db)
        .await?;

        Ok(total.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let update: UpdateApplicationStatus =
            serde_json::from_str(r#"{"status":"SHORTLISTED"}"#).unwrap();
        assert_eq!(update.status, ApplicationStatus::Shortlisted);
        assert!(serde_json::from_str::<UpdateApplicationStatus>(r#"{"status":"MAYBE"}"#).is_err());
    }
}
