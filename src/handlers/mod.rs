//! API request handlers

use axum::{extract::rejection::JsonRejection, Json};
use validator::Validate;

use crate::error::AppError;

pub mod admin;
pub mod application;
pub mod auth;
pub mod company;
pub mod connection;
pub mod job;
pub mod message;
pub mod page;

/// JSON body whose rejection is turned into an [`AppError`]
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Unwrap and validate a JSON body
pub(crate) fn validated<T: Validate>(body: JsonBody<T>) -> Result<T, AppError> {
    let Json(payload) = body?;
    payload.validate()?;
    Ok(payload)
}
