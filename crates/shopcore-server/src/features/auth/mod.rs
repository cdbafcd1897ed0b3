//! Auth feature: registration, login, logout

pub mod commands;
pub mod routes;

pub use routes::auth_routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

/// A user account as exposed on reads.
///
/// The password hash is deliberately absent: credential reads project only
/// these columns, so the hash never crosses the response boundary.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
