//! Auth gate for protected routes
//!
//! Verifies a bearer token (header, cookie fallback) and attaches the
//! decoded claims to the request before the inner handler runs. Missing or
//! invalid tokens short-circuit with a 401 envelope.

use crate::api::response::ErrorResponse;
use crate::auth::{TokenError, TokenIssuer, TOKEN_COOKIE};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Extract the session token from the Authorization header or cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.to_string()))
        .or_else(|| {
            headers
                .get("cookie")
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        let (name, value) = cookie.trim().split_once('=')?;
                        (name == TOKEN_COOKIE && !value.is_empty())
                            .then(|| value.to_string())
                    })
                })
        })
}

/// Reject the request with a 401 envelope
fn unauthorized(message: impl Into<String>) -> Response {
    let error = ErrorResponse::new("UNAUTHORIZED", message);
    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Require a valid session token; insert the claims into request extensions
pub async fn require_auth(
    State(tokens): State<TokenIssuer>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_token(request.headers()) {
        Some(t) => t,
        None => {
            tracing::debug!("No session token in Authorization header or cookie");
            return Err(unauthorized("Not authorized, no token"));
        },
    };

    let claims = match tokens.verify(&token) {
        Ok(c) => c,
        Err(e @ TokenError::Expired) => {
            tracing::debug!("Session token expired");
            return Err(unauthorized(e.to_string()));
        },
        Err(e) => {
            tracing::debug!(error = %e, "Session token verification failed");
            return Err(unauthorized("Not authorized, invalid token"));
        },
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
