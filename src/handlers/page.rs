//! Dashboard pages
//!
//! Guards here redirect; a database failure after the guard passed is still
//! reported as a JSON error.

use crate::authz::page::{landing_path, require_role};
use crate::authz::{AdminPage, SignedIn};
use crate::error::AppError;
use crate::models::application::Application;
use crate::models::auth::AuthContext;
use crate::models::company::Company;
use crate::models::connection::{Connection, ConnectionStatus};
use crate::models::job::Job;
use crate::models::user::User;
use crate::models::UserRole;
use crate::server::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

fn render(result: Result<Value, AppError>) -> Response {
    match result {
        Ok(data) => Json(serde_json::json!({ "success": true, "data": data })).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Send the caller to their role's dashboard
pub async fn dashboard(SignedIn(auth): SignedIn) -> Redirect {
    Redirect::to(landing_path(auth.role))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    AdminPage(auth): AdminPage,
) -> Response {
    render(admin_summary(&state, &auth).await)
}

async fn admin_summary(state: &AppState, auth: &AuthContext) -> Result<Value, AppError> {
    let counts = User::count_by_role(&state.db_pool).await?;
    let users_by_role: serde_json::Map<String, Value> = counts
        .into_iter()
        .map(|(role, count)| (role.as_str().to_string(), Value::from(count)))
        .collect();

    Ok(serde_json::json!({
        "role": auth.role,
        "users_by_role": users_by_role,
    }))
}

pub async fn hr_dashboard(State(state): State<AppState>, session: Option<AuthContext>) -> Response {
    match require_role(session, &[UserRole::Hr]) {
        Ok(auth) => render(hr_summary(&state, &auth).await),
        Err(redirect) => redirect.into_response(),
    }
}

async fn hr_summary(state: &AppState, auth: &AuthContext) -> Result<Value, AppError> {
    let companies = Company::list_managed_by(&state.db_pool, auth.user_id).await?;
    let company_ids: Vec<Uuid> = companies.iter().map(|company| company.id).collect();

    let active_jobs = Job::count_active_for_companies(&state.db_pool, &company_ids).await?;
    let pending_applications =
        Application::count_pending_for_companies(&state.db_pool, &company_ids).await?;

    Ok(serde_json::json!({
        "companies": companies,
        "active_jobs": active_jobs,
        "pending_applications": pending_applications,
    }))
}

pub async fn user_dashboard(State(state): State<AppState>, session: Option<AuthContext>) -> Response {
    match require_role(session, &[UserRole::User]) {
        Ok(auth) => render(user_summary(&state, &auth).await),
        Err(redirect) => redirect.into_response(),
    }
}

async fn user_summary(state: &AppState, auth: &AuthContext) -> Result<Value, AppError> {
    let applications = Application::list_for_applicant(&state.db_pool, auth.user_id).await?;
    let pending = Connection::list_for_user(
        &state.db_pool,
        auth.user_id,
        Some(ConnectionStatus::Pending),
    )
    .await?;
    let incoming_requests = pending
        .iter()
        .filter(|connection| connection.receiver_id == auth.user_id)
        .count();

    Ok(serde_json::json!({
        "applications": applications,
        "incoming_connection_requests": incoming_requests,
    }))
}
