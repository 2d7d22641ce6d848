//! API-level guard extractors
//!
//! These reject with a JSON error instead of redirecting: 401 without a
//! session, 403 when the role does not fit.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::auth::AuthContext;

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))
    }
}

/// Caller allowed onto admin-only API surfaces
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if !auth.role.has_admin_access() {
            tracing::warn!(
                user_id = %auth.user_id,
                role = %auth.role,
                path = %parts.uri.path(),
                "Admin surface denied"
            );
            return Err(AppError::Authorization("Admin access required".to_string()));
        }

        Ok(AdminContext(auth))
    }
}
