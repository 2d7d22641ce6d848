//! Job posting request handlers

use crate::authz::{authorize, Action};
use crate::error::AppError;
use crate::handlers::{validated, JsonBody};
use crate::models::application::Application;
use crate::models::auth::AuthContext;
use crate::models::company::Company;
use crate::models::job::{CreateJob, Job, JobSearchParams};
use crate::models::PaginatedResponse;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Public job search
pub async fn search_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let (listings, total) = Job::search(&state.db_pool, &params).await?;
    let response = PaginatedResponse::new(listings, &params.pagination(), total);

    Ok(Json(serde_json::json!({
        "success": true,
        "data": response
    })))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = Job::find_by_id(&state.db_pool, job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", job_id))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": job
    })))
}

/// Post a job under a company
pub async fn create_job(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
    body: JsonBody<CreateJob>,
) -> Result<impl IntoResponse, AppError> {
    let company = Company::find_by_id(&state.db_pool, company_id)
        .await?
        .ok_or_else(|| AppError::not_found("Company", company_id))?;
    authorize(&auth, Action::PostJob, &company.ownership())?;

    let payload = validated(body)?;
    let job = Job::create(&state.db_pool, company.id, payload).await?;
    info!(job_id = %job.id, company_id = %company.id, user_id = %auth.user_id, "Job posted");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": job
        })),
    ))
}

/// Applicants for a job; the company's HR manager or an admin only
pub async fn list_applicants(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let access = Job::find_access(&state.db_pool, job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", job_id))?;
    authorize(&auth, Action::ViewApplicants, &access.ownership())?;

    let applicants = Application::list_applicants(&state.db_pool, access.job_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": applicants
    })))
}
