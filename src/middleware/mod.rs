//! Middleware for the job board backend

pub mod rate_limit;
pub mod session;

pub use rate_limit::{
    client_identifier, cleanup_task, rate_limit_middleware, RateLimitConfig, RateLimitDecision,
    RateLimiter,
};
pub use session::session_middleware;
