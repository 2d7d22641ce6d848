//! Page-level guard
//!
//! Pages never see an error: a missing session goes to sign-in, a wrong role
//! goes to that role's own dashboard.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};

use crate::models::auth::AuthContext;
use crate::models::UserRole;

pub const SIGN_IN_PATH: &str = "/auth/signin";
pub const ADMIN_DASHBOARD_PATH: &str = "/dashboard/admin";
pub const HR_DASHBOARD_PATH: &str = "/dashboard/hr";
pub const USER_DASHBOARD_PATH: &str = "/dashboard/user";

/// Where a role lands after sign-in or after hitting a page it cannot see
pub fn landing_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin | UserRole::SuperAdmin | UserRole::Moderator => ADMIN_DASHBOARD_PATH,
        UserRole::Hr => HR_DASHBOARD_PATH,
        UserRole::User => USER_DASHBOARD_PATH,
    }
}

pub fn require_auth(session: Option<AuthContext>) -> Result<AuthContext, Redirect> {
    session.ok_or_else(|| Redirect::to(SIGN_IN_PATH))
}

pub fn require_role(
    session: Option<AuthContext>,
    allowed: &[UserRole],
) -> Result<AuthContext, Redirect> {
    let auth = require_auth(session)?;

    if auth.has_any_role(allowed) {
        Ok(auth)
    } else {
        tracing::debug!(
            user_id = %auth.user_id,
            role = %auth.role,
            "Redirecting to role landing page"
        );
        Err(Redirect::to(landing_path(auth.role)))
    }
}

pub fn require_admin(session: Option<AuthContext>) -> Result<AuthContext, Redirect> {
    require_role(
        session,
        &[UserRole::Admin, UserRole::SuperAdmin, UserRole::Moderator],
    )
}

/// Any signed-in user, or a redirect to sign-in
#[derive(Debug, Clone)]
pub struct SignedIn(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_auth(parts.extensions.get::<AuthContext>().cloned()).map(SignedIn)
    }
}

/// Admin-surface user, or a redirect
#[derive(Debug, Clone)]
pub struct AdminPage(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminPage
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        require_admin(parts.extensions.get::<AuthContext>().cloned()).map(AdminPage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::header, response::IntoResponse};
    use uuid::Uuid;

    fn session(role: UserRole) -> Option<AuthContext> {
        Some(AuthContext {
            user_id: Uuid::new_v4(),
            email: "page@example.com".to_string(),
            role,
        })
    }

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        assert!(response.status().is_redirection());
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_missing_session_goes_to_sign_in() {
        assert_eq!(location(require_auth(None).unwrap_err()), SIGN_IN_PATH);
        assert_eq!(location(require_admin(None).unwrap_err()), SIGN_IN_PATH);
    }

    #[test]
    fn test_wrong_role_goes_to_own_landing_page() {
        let redirect = require_role(session(UserRole::User), &[UserRole::Hr]).unwrap_err();
        assert_eq!(location(redirect), USER_DASHBOARD_PATH);

        let redirect = require_admin(session(UserRole::Hr)).unwrap_err();
        assert_eq!(location(redirect), HR_DASHBOARD_PATH);

        let redirect = require_role(session(UserRole::Moderator), &[UserRole::User]).unwrap_err();
        assert_eq!(location(redirect), ADMIN_DASHBOARD_PATH);
    }

    #[test]
    fn test_allowed_role_passes_through() {
        let auth = require_role(session(UserRole::Hr), &[UserRole::Hr, UserRole::Admin]).unwrap();
        assert_eq!(auth.role, UserRole::Hr);
        assert!(require_admin(session(UserRole::SuperAdmin)).is_ok());
    }
}
