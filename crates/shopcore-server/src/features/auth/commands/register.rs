//! Register user command
//!
//! Creates a new user account. The password is argon2-hashed before the
//! insert; email uniqueness is enforced by the store and surfaced as a
//! duplicate error.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::password::{hash_password, PasswordError};
use crate::features::auth::UserAccount;
use crate::features::shared::validation::{validate_email, validate_required};

/// Minimum password length, matching the account schema rule
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Command to register a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserCommand {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Response from registering a user
pub type RegisterUserResponse = UserAccount;

/// Errors that can occur when registering a user
#[derive(Debug, thiserror::Error)]
pub enum RegisterUserError {
    #[error("All fields are required")]
    FieldsRequired,

    #[error("Please enter a valid email address.")]
    EmailInvalid,

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters.")]
    PasswordTooShort,

    #[error("User already exists")]
    EmailTaken,

    #[error(transparent)]
    Hash(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<RegisterUserResponse, RegisterUserError>> for RegisterUserCommand {}

impl crate::cqrs::middleware::Command for RegisterUserCommand {}

impl RegisterUserCommand {
    /// Validates the command parameters
    pub fn validate(&self) -> Result<(), RegisterUserError> {
        if validate_required(&self.username).is_err()
            || validate_required(&self.email).is_err()
            || validate_required(&self.password).is_err()
        {
            return Err(RegisterUserError::FieldsRequired);
        }
        if validate_email(&self.email).is_err() {
            return Err(RegisterUserError::EmailInvalid);
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(RegisterUserError::PasswordTooShort);
        }
        Ok(())
    }
}

/// Handler function for registering users
#[tracing::instrument(skip(pool, command), fields(email = %command.email))]
pub async fn handle(
    pool: PgPool,
    command: RegisterUserCommand,
) -> Result<RegisterUserResponse, RegisterUserError> {
    command.validate()?;

    let password_hash = hash_password(&command.password)?;

    let user = sqlx::query_as::<_, UserAccount>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, role, created_at
        "#,
    )
    .bind(&command.username)
    .bind(&command.email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return RegisterUserError::EmailTaken;
            }
        }
        RegisterUserError::Database(e)
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, "User registered");

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(username: &str, email: &str, password: &str) -> RegisterUserCommand {
        RegisterUserCommand {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command("a", "a@x.com", "secret1").validate().is_ok());
    }

    #[test]
    fn test_validation_missing_fields() {
        assert!(matches!(
            command("", "a@x.com", "secret1").validate(),
            Err(RegisterUserError::FieldsRequired)
        ));
        assert!(matches!(
            command("a", "", "secret1").validate(),
            Err(RegisterUserError::FieldsRequired)
        ));
        assert!(matches!(
            command("a", "a@x.com", "").validate(),
            Err(RegisterUserError::FieldsRequired)
        ));
    }

    #[test]
    fn test_validation_invalid_email() {
        assert!(matches!(
            command("a", "not-an-email", "secret1").validate(),
            Err(RegisterUserError::EmailInvalid)
        ));
    }

    #[test]
    fn test_validation_short_password() {
        assert!(matches!(
            command("a", "a@x.com", "short").validate(),
            Err(RegisterUserError::PasswordTooShort)
        ));
    }

    #[test]
    fn test_missing_body_fields_deserialize_to_empty() {
        let command: RegisterUserCommand = serde_json::from_str("{}").expect("deserialize");
        assert!(matches!(
            command.validate(),
            Err(RegisterUserError::FieldsRequired)
        ));
    }
}
