//! Auth API routes
//!
//! Wires the auth commands to Axum HTTP handlers:
//!
//! - `POST /api/v1/auth/register` - Create an account, issue a session token
//! - `POST /api/v1/auth/login` - Verify credentials, issue a session token
//! - `POST /api/v1/auth/logout` - Clear the session cookie
//!
//! The session token is returned both in the response body and as an
//! http-only, same-site-strict cookie.

use crate::api::response::{is_development, ErrorResponse};
use crate::auth::{TokenError, TOKEN_COOKIE};
use crate::features::FeatureState;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::commands::{
    login, register, LoginUserCommand, LoginUserError, RegisterUserCommand, RegisterUserError,
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the auth router with all routes configured
pub fn auth_routes() -> Router<FeatureState> {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/logout", post(logout_user))
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new user
///
/// # Response
///
/// - `201 Created` - Account created, token in body and cookie
/// - `400 Bad Request` - Missing fields or existing email
#[tracing::instrument(skip(state, command), fields(email = %command.email))]
async fn register_user(
    State(state): State<FeatureState>,
    Json(command): Json<RegisterUserCommand>,
) -> Result<Response, AuthApiError> {
    let user = register::handle(state.db.clone(), command).await?;

    let token = state.tokens.sign(user.id)?;
    let cookie = session_cookie(&token, state.tokens.ttl_secs())?;

    tracing::info!(user_id = %user.id, "User registered via API");

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": token,
            "user": user.username,
        })),
    )
        .into_response())
}

/// Log a user in
///
/// # Response
///
/// - `201 Created` - Token in body and cookie
/// - `404 Not Found` - Unknown email
/// - `401 Unauthorized` - Wrong password
#[tracing::instrument(skip(state, command), fields(email = %command.email))]
async fn login_user(
    State(state): State<FeatureState>,
    Json(command): Json<LoginUserCommand>,
) -> Result<Response, AuthApiError> {
    let user = login::handle(state.db.clone(), command).await?;

    let token = state.tokens.sign(user.id)?;
    let cookie = session_cookie(&token, state.tokens.ttl_secs())?;

    tracing::info!(user_id = %user.id, "User logged in via API");

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({
            "success": true,
            "message": "User login successfully",
            "token": token,
            "user": {
                "username": user.username,
                "email": user.email,
                "id": user.id,
            },
        })),
    )
        .into_response())
}

/// Log out: overwrite the session cookie with an expired one
async fn logout_user() -> Result<Response, AuthApiError> {
    let cookie = session_cookie("", 0)?;

    Ok((
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response())
}

/// Build the session cookie header value.
///
/// Http-only and same-site-strict; `Secure` is added outside development.
fn session_cookie(token: &str, max_age: i64) -> Result<HeaderValue, AuthApiError> {
    let secure_flag = if is_development() { "" } else { " Secure;" };
    let cookie = format!(
        "{}={}; HttpOnly;{} SameSite=Strict; Path=/; Max-Age={}",
        TOKEN_COOKIE, token, secure_flag, max_age
    );
    HeaderValue::from_str(&cookie).map_err(|e| AuthApiError::Cookie(e.to_string()))
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for auth API endpoints
#[derive(Debug)]
enum AuthApiError {
    Register(RegisterUserError),
    Login(LoginUserError),
    Token(TokenError),
    Cookie(String),
}

impl From<RegisterUserError> for AuthApiError {
    fn from(err: RegisterUserError) -> Self {
        Self::Register(err)
    }
}

impl From<LoginUserError> for AuthApiError {
    fn from(err: LoginUserError) -> Self {
        Self::Login(err)
    }
}

impl From<TokenError> for AuthApiError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        match self {
            // Register errors
            AuthApiError::Register(RegisterUserError::FieldsRequired)
            | AuthApiError::Register(RegisterUserError::EmailInvalid)
            | AuthApiError::Register(RegisterUserError::PasswordTooShort) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            AuthApiError::Register(RegisterUserError::EmailTaken) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            AuthApiError::Register(RegisterUserError::Hash(_))
            | AuthApiError::Register(RegisterUserError::Database(_)) => {
                tracing::error!("Internal error during registration: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "Something went wrong!", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Login errors
            AuthApiError::Login(LoginUserError::FieldsRequired) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            AuthApiError::Login(LoginUserError::UnknownEmail) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            AuthApiError::Login(LoginUserError::WrongPassword) => {
                let error = ErrorResponse::new("UNAUTHORIZED", self.to_string());
                (StatusCode::UNAUTHORIZED, Json(error)).into_response()
            },
            AuthApiError::Login(LoginUserError::Hash(_))
            | AuthApiError::Login(LoginUserError::Database(_)) => {
                tracing::error!("Internal error during login: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "Something went wrong!", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },

            // Token / cookie errors
            AuthApiError::Token(_) | AuthApiError::Cookie(_) => {
                tracing::error!("Failed to issue session token: {}", self);
                let error =
                    ErrorResponse::internal("INTERNAL_ERROR", "Something went wrong!", &self);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for AuthApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(e) => write!(f, "{}", e),
            Self::Login(e) => write!(f, "{}", e),
            Self::Token(e) => write!(f, "{}", e),
            Self::Cookie(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthApiError::Register(RegisterUserError::FieldsRequired);
        assert!(err.to_string().contains("All fields are required"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc.def.ghi", 604_800).expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("token=abc.def.ghi;"));
        assert!(value.contains("HttpOnly;"));
        assert!(value.contains("SameSite=Strict;"));
        assert!(value.contains("Max-Age=604800"));
    }

    #[test]
    fn test_logout_cookie_is_cleared() {
        let cookie = session_cookie("", 0).expect("cookie");
        let value = cookie.to_str().expect("ascii");
        assert!(value.starts_with("token=;"));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn test_routes_structure() {
        let router = auth_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }
}
