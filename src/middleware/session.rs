//! Session resolution middleware
//!
//! Turns a bearer token or session cookie into an [`AuthContext`] request
//! extension. It never rejects: guards downstream decide what a missing
//! session means for the route.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::models::auth::AuthContext;
use crate::server::AppState;

/// Extract the raw session token, preferring the `Authorization` header.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Session middleware
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers(), &state.config.session.cookie_name) {
        match state
            .jwt_service
            .verify_token(&token)
            .and_then(AuthContext::try_from)
        {
            Ok(auth_context) => {
                request.extensions_mut().insert(auth_context);
            }
            Err(err) => {
                debug!(error = %err, path = %request.uri().path(), "Ignoring invalid session token");
            }
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=cookie-token"));
        assert_eq!(session_token(&headers, "session").as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_cookie_token_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=xyz; lang=en"),
        );
        assert_eq!(session_token(&headers, "session").as_deref(), Some("xyz"));
        assert_eq!(session_token(&headers, "other"), None);
    }

    #[test]
    fn test_malformed_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(session_token(&headers, "session"), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(session_token(&headers, "session"), None);
    }
}
