//! Job postings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::authz::Ownership;
use crate::error::AppError;
use crate::models::PaginationParams;

/// Employment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl Default for EmploymentType {
    fn default() -> Self {
        Self::FullTime
    }
}

/// Job posting
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Search result row with the hiring company's name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobListing {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub title: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Who may manage a job, resolved through its company
#[derive(Debug, Clone, Copy, FromRow)]
pub struct JobAccess {
    pub job_id: Uuid,
    pub company_id: Uuid,
    pub owner_id: Uuid,
    pub hr_id: Option<Uuid>,
    pub is_active: bool,
}

impl JobAccess {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: Some(self.owner_id),
            hr_id: self.hr_id,
        }
    }
}

/// Job creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_salary_range"))]
pub struct CreateJob {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    #[validate(range(min = 0))]
    pub salary_min: Option<i32>,
    #[validate(range(min = 0))]
    pub salary_max: Option<i32>,
}

fn validate_salary_range(job: &CreateJob) -> Result<(), validator::ValidationError> {
    match (job.salary_min, job.salary_max) {
        (Some(min), Some(max)) if min > max => {
            Err(validator::ValidationError::new("salary_range"))
        }
        _ => Ok(()),
    }
}

/// Job search query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSearchParams {
    pub q: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl JobSearchParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }

    fn pattern(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| format!("%{}%", v.replace('%', "\\%").replace('_', "\\_")))
    }

    pub fn query_pattern(&self) -> Option<String> {
        Self::pattern(&self.q)
    }

    pub fn location_pattern(&self) -> Option<String> {
        Self::pattern(&self.location)
    }
}

impl Job {
    pub async fn create(
        db: &sqlx::PgPool,
        company_id: Uuid,
        create: CreateJob,
    ) -> Result<Self, AppError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (company_id, title, description, location, employment_type, salary_min, salary_max)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(create.title.trim())
        .bind(create.description)
        .bind(create.location)
        .bind(create.employment_type.unwrap_or_default())
        .bind(create.salary_min)
        .bind(create.salary_max)
        .fetch_one(db)
        .await?;

        Ok(job)
    }

    pub async fn find_by_id(db: &sqlx::PgPool, job_id: Uuid) -> Result<Option<Self>, AppError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(db)
            .await?;

        Ok(job)
    }

    pub async fn find_access(db: &sqlx::PgPool, job_id: Uuid) -> Result<Option<JobAccess>, AppError> {
        let access = sqlx::query_as::<_, JobAccess>(
            r#"
            SELECT j.id AS job_id, j.company_id, c.owner_id, c.hr_id, j.is_active
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE j.id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(db)
        .await?;

        Ok(access)
    }

    /// Active jobs matching the search filters, newest first
    pub async fn search(
        db: &sqlx::PgPool,
        params: &JobSearchParams,
    ) -> Result<(Vec<JobListing>, u64), AppError> {
        let query = params.query_pattern();
        let location = params.location_pattern();
        let pagination = params.pagination();

        let listings = sqlx::query_as::<_, JobListing>(
            r#"
            SELECT j.id, j.company_id, c.name AS company_name, j.title, j.location,
                   j.employment_type, j.salary_min, j.salary_max, j.created_at
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE j.is_active
              AND ($1::text IS NULL OR j.title ILIKE $1 OR j.description ILIKE $1 OR c.name ILIKE $1)
              AND ($2::text IS NULL OR j.location ILIKE $2)
              AND ($3::text IS NULL OR j.employment_type = $3)
            ORDER BY j.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&query)
        .bind(&location)
        .bind(params.employment_type)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM jobs j
            JOIN companies c ON c.id = j.company_id
            WHERE j.is_active
              AND ($1::text IS NULL OR j.title ILIKE $1 OR j.description ILIKE $1 OR c.name ILIKE $1)
              AND ($2::text IS NULL OR j.location ILIKE $2)
              AND ($3::text IS NULL OR j.employment_type = $3)
            "#,
        )
        .bind(&query)
        .bind(&location)
        .bind(params.employment_type)
        .fetch_one(db)
        .await?;

        Ok((listings, total.max(0) as u64))
    }

    /// Number of active postings across the given companies
    pub async fn count_active_for_companies(
        db: &sqlx::PgPool,
        company_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE is_active AND company_id = ANY($1)",
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
    fn test_search_patterns_escape_wildcards() {
        let params = JobSearchParams {
            q: Some(" 100%_rust ".to_string()),
            location: Some("   ".to_string()),
            ..JobSearchParams::default()
        };
        assert_eq!(params.query_pattern().as_deref(), Some("%100\\%\\_rust%"));
        assert_eq!(params.location_pattern(), None);
    }

    #[test]
    fn test_salary_range_validation() {
        let job = CreateJob {
            title: "Backend Engineer".to_string(),
            description: "Build things".to_string(),
            location: None,
            employment_type: None,
            salary_min: Some(90_000),
            salary_max: Some(60_000),
        };
        assert!(job.validate().is_err());

        let job = CreateJob {
            salary_max: Some(120_000),
            ..job
        };
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_job_access_ownership() {
        let owner = Uuid::new_v4();
        let access = JobAccess {
            job_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            owner_id: owner,
            hr_id: None,
            is_active: true,
        };
        assert_eq!(access.ownership().owner_id, Some(owner));
        assert_eq!(access.ownership().hr_id, None);
    }
}
