//! Authentication request handlers

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::handlers::{validated, JsonBody};
use crate::models::auth::{AuthContext, PasswordUtils, SessionToken};
use crate::models::user::{CreateUser, LoginRequest, User, UserProfile};
use crate::models::UserRole;
use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

/// Roles an account can pick for itself at sign-up
const SELF_SERVICE_ROLES: [UserRole; 2] = [UserRole::User, UserRole::Hr];

/// Sign-in / sign-up response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: SessionToken,
}

/// `Set-Cookie` value carrying the session token
fn session_cookie(config: &SessionConfig, token: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name, token, max_age
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Run a bcrypt operation off the async workers
async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {}", e)))?
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    body: JsonBody<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    if !state.config.features.registration {
        return Err(AppError::Authorization("Registration is disabled".to_string()));
    }

    let payload = validated(body)?;
    PasswordUtils::validate_password_strength(&payload.password)?;

    let role = payload.role.unwrap_or(UserRole::User);
    if !SELF_SERVICE_ROLES.contains(&role) {
        warn!(email = %payload.email, role = %role, "Rejected self-registration with elevated role");
        return Err(AppError::BadRequest(
            "Accounts can only register as USER or HR".to_string(),
        ));
    }

    if User::find_by_email(&state.db_pool, &payload.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password = payload.password.clone();
    let password_hash = blocking(move || PasswordUtils::hash_password(&password)).await?;

    let user = User::create(
        &state.db_pool,
        &payload.email,
        &password_hash,
        &payload.name,
        role,
    )
    .await?;

    let token = state.jwt_service.issue(&user)?;
    let cookie = session_cookie(&state.config.session, &token.access_token, token.expires_in);

    info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "success": true,
            "data": AuthResponse {
                user: UserProfile::from(user),
                token,
            }
        })),
    ))
}

/// Sign in with email and password
pub async fn login(
    State(state): State<AppState>,
    body: JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = validated(body)?;

    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db_pool, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    let password = payload.password;
    let hash = user.password_hash.clone();
    if !blocking(move || PasswordUtils::verify_password(&password, &hash)).await? {
        warn!(user_id = %user.id, "Failed sign-in attempt");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::Authorization("Account is deactivated".to_string()));
    }

    let token = state.jwt_service.issue(&user)?;
    let cookie = session_cookie(&state.config.session, &token.access_token, token.expires_in);

    info!(user_id = %user.id, role = %user.role, "User signed in");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "success": true,
            "data": AuthResponse {
                user: UserProfile::from(user),
                token,
            }
        })),
    ))
}

/// Clear the session cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, session_cookie(&state.config.session, "", 0))],
        Json(serde_json::json!({ "success": true })),
    )
}

/// Current user's profile
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_id(&state.db_pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", auth.user_id))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "data": UserProfile::from(user)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::server::{create_router, tests::test_state};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn test_session_cookie_attributes() {
        let mut session = test_config().session;
        let cookie = session_cookie(&session, "abc", 60);
        assert_eq!(
            cookie,
            "jobboard_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        session.secure_cookie = true;
        assert!(session_cookie(&session, "abc", 60).ends_with("; Secure"));
    }

    fn register_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_rejects_elevated_roles_before_touching_the_database() {
        let app = create_router(test_state(test_config()));

        for role in ["ADMIN", "SUPER_ADMIN", "MODERATOR"] {
            let body = format!(
                r#"{{"email":"new@example.com","password":"Str0ngPass","name":"New","role":"{}"}}"#,
                role
            );
            let response = app.clone().oneshot(register_request(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let app = create_router(test_state(test_config()));
        let response = app
            .oneshot(register_request(
                r#"{"email":"new@example.com","password":"alllowercase1","name":"New"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_can_be_disabled() {
        let mut config = test_config();
        config.features.registration = false;
        let app = create_router(test_state(config));

        let response = app
            .oneshot(register_request(
                r#"{"email":"new@example.com","password":"Str0ngPass","name":"New"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let app = create_router(test_state(test_config()));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }
}
