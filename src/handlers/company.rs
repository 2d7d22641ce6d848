//! Company request handlers

use crate::authz::{authorize, require_roles, Action};
use crate::error::AppError;
use crate::handlers::{validated, JsonBody};
use crate::models::auth::AuthContext;
use crate::models::company::{Company, CreateCompany, UpdateCompany};
use crate::models::user::User;
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

/// Roles that may register a company
const COMPANY_CREATORS: [UserRole; 3] = [UserRole::Hr, UserRole::Admin, UserRole::SuperAdmin];

/// An assigned HR manager must be an active HR account
async fn ensure_hr_manager(db: &sqlx::PgPool, hr_id: Uuid) -> Result<(), AppError> {
    match User::find_by_id(db, hr_id).await? {
        Some(user) if user.role == UserRole::Hr && user.is_active => Ok(()),
        Some(_) => Err(AppError::BadRequest(
            "Assigned HR manager must be an active HR account".to_string(),
        )),
        None => Err(AppError::not_found("User", hr_id)),
    }
}

async fn load_company(db: &sqlx::PgPool, company_id: Uuid) -> Result<Company, AppError> {
    Company::find_by_id(db, company_id)
        .await?
        .ok_or_else(|| AppError::not_found("Company", company_id))
}

/// Register a company owned by the caller
pub async fn create_company(
    State(state): State<AppState>,
    auth: AuthContext,
    body: JsonBody<CreateCompany>,
) -> Result<impl IntoResponse, AppError> {
    require_roles(&auth, &COMPANY_CREATORS)?;
    let payload = validated(body)?;

    if let Some(hr_id) = payload.hr_id {
        ensure_hr_manager(&state.db_pool, hr_id).await?;
    }

    let company = Company::create(&state.db_pool, auth.user_id, payload).await?;
    info!(company_id = %company.id, owner_id = %auth.user_id, "Company created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": company
        })),
    ))
}

pub async fn get_company(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = load_company(&state.db_pool, company_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": company
    })))
}

/// Update a company; owner or admin only
pub async fn update_company(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(company_id): Path<Uuid>,
    body: JsonBody<UpdateCompany>,
) -> Result<impl IntoResponse, AppError> {
    let company = load_company(&state.db_pool, company_id).await?;
    authorize(&auth, Action::UpdateCompany, &company.ownership())?;

    let payload = validated(body)?;
    if let Some(hr_id) = payload.hr_id {
        ensure_hr_manager(&state.db_pool, hr_id).await?;
    }

    let company = company.update(&state.db_pool, payload).await?;
    info!(company_id = %company.id, user_id = %auth.user_id, "Company updated");

    Ok(Json(serde_json::json!({
        "success": true,
        "data": company
    })))
}
