//! Login user command
//!
//! The credential lookup is the one read that projects the password hash;
//! everything after the verification step sees only the public columns.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{verify_password, PasswordError};
use crate::features::shared::validation::validate_required;

/// Command to log a user in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserCommand {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response from a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginUserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Errors that can occur when logging in
#[derive(Debug, thiserror::Error)]
pub enum LoginUserError {
    #[error("All fields are required")]
    FieldsRequired,

    /// No account for the given email
    #[error("Invalid email or password")]
    UnknownEmail,

    /// Account exists but the password does not match
    #[error("Invalid email or password")]
    WrongPassword,

    #[error(transparent)]
    Hash(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<LoginUserResponse, LoginUserError>> for LoginUserCommand {}

impl crate::cqrs::middleware::Command for LoginUserCommand {}

impl LoginUserCommand {
    /// Validates the command parameters
    pub fn validate(&self) -> Result<(), LoginUserError> {
        if validate_required(&self.email).is_err() || validate_required(&self.password).is_err() {
            return Err(LoginUserError::FieldsRequired);
        }
        Ok(())
    }
}

/// Handler function for logging users in
#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
pub async fn handle(
    pool: PgPool,
    command: LoginUserCommand,
) -> Result<LoginUserResponse, LoginUserError> {
    command.validate()?;

    let record = sqlx::query_as::<_, CredentialRecord>(
        r#"
        SELECT id, username, email, password_hash
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&command.email)
    .fetch_optional(&pool)
    .await?
    .ok_or(LoginUserError::UnknownEmail)?;

    if !verify_password(&command.password, &record.password_hash)? {
        tracing::debug!(email = %command.email, "Password mismatch");
        return Err(LoginUserError::WrongPassword);
    }

    tracing::info!(user_id = %record.id, "User logged in");

    Ok(LoginUserResponse {
        id: record.id,
        username: record.username,
        email: record.email,
    })
}

// Credential projection including the stored hash; never serialized
#[derive(Debug, sqlx::FromRow)]
struct CredentialRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
}
