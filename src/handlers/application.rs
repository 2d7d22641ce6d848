//! Job application request handlers

use crate::authz::{authorize, require_roles, Action};
use crate::error::AppError;
use crate::handlers::{validated, JsonBody};
use crate::models::application::{Application, CreateApplication, UpdateApplicationStatus};
use crate::models::auth::AuthContext;
use crate::models::job::Job;
use crate::models::UserRole;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Apply to a job as a job seeker
pub async fn apply(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(job_id): Path<Uuid>,
    body: JsonBody<CreateApplication>,
) -> Result<impl IntoResponse, AppError> {
    require_roles(&auth, &[UserRole::User])?;
    let payload = validated(body)?;

    let access = Job::find_access(&state.db_pool, job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", job_id))?;

    if !access.is_active {
        return Err(AppError::InvalidState(
            "Job is no longer accepting applications".to_string(),
        ));
    }

    if Application::exists(&state.db_pool, job_id, auth.user_id).await? {
        return Err(AppError::Conflict("You have already applied to this job".to_string()));
    }

    let application = Application::create(&state.db_pool, job_id, auth.user_id, payload).await?;
    info!(application_id = %application.id, job_id = %job_id, "Application submitted");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": application
        })),
    ))
}

/// The caller's own applications
pub async fn list_my_applications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let applications = Application::list_for_applicant(&state.db_pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": applications
    })))
}

/// Move an application through review
pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(application_id): Path<Uuid>,
    body: JsonBody<UpdateApplicationStatus>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = body?;

    let access = Application::find_access(&state.db_pool, application_id)
        .await?
        .ok_or_else(|| AppError::not_found("Application", application_id))?;
    authorize(&auth, Action::UpdateApplicationStatus, &access.ownership())?;

    let application =
        Application::update_status(&state.db_pool, access.application_id, payload.status).await?;

    info!(
        application_id = %application.id,
        from = ?access.status,
        to = ?application.status,
        user_id = %auth.user_id,
        "Application status updated"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "data": application
    })))
}
