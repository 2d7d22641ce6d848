//! Domain models for the job board backend

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod admin_log;
pub mod application;
pub mod auth;
pub mod company;
pub mod connection;
pub mod conversation;
pub mod job;
pub mod user;

/// Platform role carried by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Hr,
    Admin,
    SuperAdmin,
    Moderator,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::User,
        UserRole::Hr,
        UserRole::Admin,
        UserRole::SuperAdmin,
        UserRole::Moderator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Hr => "HR",
            UserRole::Admin => "ADMIN",
            UserRole::SuperAdmin => "SUPER_ADMIN",
            UserRole::Moderator => "MODERATOR",
        }
    }

    /// Roles allowed onto admin-only surfaces
    pub fn has_admin_access(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin | UserRole::Moderator)
    }

    /// Roles that override resource ownership checks
    pub fn bypasses_ownership(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 100) // Max 100 per page
    }

    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(params.limit())) as u32;

        Self {
            data,
            pagination: PaginationInfo {
                page: params.page(),
                limit: params.limit(),
                total,
                total_pages,
                has_next: params.page() < total_pages,
                has_prev: params.page() > 1,
            },
        }
    }
}

/// Pagination information
#[derive(Debug, Clone, Serialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}
