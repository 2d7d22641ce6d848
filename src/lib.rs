//! Job board backend
//!
//! This crate provides the API behind the job board, including:
//! - RESTful API with Axum
//! - PostgreSQL persistence with SQLx
//! - JWT sessions carried by bearer header or cookie
//! - Fixed-window rate limiting for sign-in and search
//! - Role and ownership authorization for pages and API routes
//!
//! # Example
//!
//! ```rust,no_run
//! use jobboard_backend::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let pool = sqlx::PgPool::connect(&config.database.url).await?;
//!     let app = server::create_router(server::AppState::new(config, pool)?);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod authz;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::UserRole;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
