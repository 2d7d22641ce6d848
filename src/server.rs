//! Web server implementation with Axum

use crate::authz::MessagingPolicy;
use crate::config::Config;
use crate::error::{AppError, RequestId};
use crate::handlers;
use crate::middleware::{rate_limit_middleware, session_middleware, RateLimiter};
use crate::models::auth::JwtService;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: sqlx::PgPool,
    pub jwt_service: Arc<JwtService>,
    pub rate_limiters: RateLimiters,
    pub messaging_policy: MessagingPolicy,
}

/// The process-wide limiter instances
#[derive(Clone)]
pub struct RateLimiters {
    pub auth: Arc<RateLimiter>,
    pub search: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn all(&self) -> Vec<Arc<RateLimiter>> {
        vec![self.auth.clone(), self.search.clone()]
    }
}

// Ensure AppState satisfies the bounds required by Axum's State extractor
const _: fn() = || {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
};

impl AppState {
    pub fn new(config: Config, db_pool: sqlx::PgPool) -> Result<Self, AppError> {
        let jwt_service = JwtService::new(
            &config.jwt.secret,
            config.jwt.issuer.clone(),
            config.jwt.expiration as i64,
        )?;

        let sweep_probability = config.rate_limit.sweep_probability;
        let rate_limiters = RateLimiters {
            auth: Arc::new(RateLimiter::with_sweep_probability(
                "auth",
                config.rate_limit.auth.to_limiter_config(),
                sweep_probability,
            )),
            search: Arc::new(RateLimiter::with_sweep_probability(
                "search",
                config.rate_limit.search.to_limiter_config(),
                sweep_probability,
            )),
        };

        if !config.features.rate_limiting {
            warn!("Rate limiting is disabled");
        }

        Ok(AppState {
            messaging_policy: MessagingPolicy::from(config.messaging),
            config: Arc::new(config),
            db_pool,
            jwt_service: Arc::new(jwt_service),
            rate_limiters,
        })
    }
}

/// Application router
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.server.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
    .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(&state))
        .merge(page_routes())
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit))
        .layer(TimeoutLayer::new(state.config.server.request_timeout()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Attach a limiter to every route already on `router`
fn rate_limited(
    router: Router<AppState>,
    limiter: &Arc<RateLimiter>,
    enabled: bool,
) -> Router<AppState> {
    if enabled {
        router.route_layer(middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit_middleware,
        ))
    } else {
        router
    }
}

/// API routes
fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state))
        .nest("/jobs", job_routes(state))
        .nest("/companies", company_routes())
        .nest("/applications", application_routes())
        .nest("/connections", connection_routes())
        .nest("/conversations", conversation_routes())
        .nest("/admin", admin_routes())
}

/// Authentication routes; sign-in and sign-up sit behind the auth limiter
fn auth_routes(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    rate_limited(
        limited,
        &state.rate_limiters.auth,
        state.config.features.rate_limiting,
    )
    .route("/logout", post(handlers::auth::logout))
    .route("/me", get(handlers::auth::me))
}

/// Job routes; search sits behind the search limiter
fn job_routes(state: &AppState) -> Router<AppState> {
    let limited = Router::new().route("/search", get(handlers::job::search_jobs));

    rate_limited(
        limited,
        &state.rate_limiters.search,
        state.config.features.rate_limiting,
    )
    .route("/:id", get(handlers::job::get_job))
    .route("/:id/applicants", get(handlers::job::list_applicants))
    .route("/:id/applications", post(handlers::application::apply))
}

fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::company::create_company))
        .route("/:id", get(handlers::company::get_company).put(handlers::company::update_company))
        .route("/:id/jobs", post(handlers::job::create_job))
}

fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::application::list_my_applications))
        .route("/:id/status", patch(handlers::application::update_status))
}

fn connection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::connection::list_connections).post(handlers::connection::send_request),
        )
        .route("/:id", patch(handlers::connection::respond_to_request))
}

fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::message::list_conversations))
        .route(
            "/:id/messages",
            get(handlers::message::get_messages).post(handlers::message::send_message),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route("/users/:id/role", patch(handlers::admin::change_role))
        .route("/users/:id/status", patch(handlers::admin::set_user_status))
        .route("/logs", get(handlers::admin::list_logs))
}

/// Dashboard pages; these redirect instead of returning 401/403
fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::page::dashboard))
        .route("/dashboard/admin", get(handlers::page::admin_dashboard))
        .route("/dashboard/hr", get(handlers::page::hr_dashboard))
        .route("/dashboard/user", get(handlers::page::user_dashboard))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "up",
        Err(err) => {
            warn!(error = %err, "Database health probe failed");
            "down"
        }
    };

    Json(serde_json::json!({
        "status": "healthy",
        "database": database,
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Not found handler
async fn not_found_handler() -> impl IntoResponse {
    let status = StatusCode::NOT_FOUND;
    let body = Json(serde_json::json!({
        "success": false,
        "error": "Endpoint not found",
        "code": "NOT_FOUND",
        "timestamp": chrono::Utc::now(),
    }));
    (status, body)
}

/// Request ID middleware
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| uuid::Uuid::parse_str(value).ok())
        .map(RequestId)
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Logging middleware
async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let start_time = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start_time.elapsed();
    let status = response.status();

    match status.as_u16() {
        200..=399 => {
            info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Request completed"
            );
        }
        400..=499 => {
            warn!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Client error"
            );
        }
        _ => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Server error"
            );
        }
    }

    response
}
