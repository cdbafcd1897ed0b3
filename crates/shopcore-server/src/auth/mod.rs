//! Session tokens and password hashing

pub mod password;
pub mod token;

pub use token::{Claims, TokenError, TokenIssuer};

/// Name of the session cookie carrying the token
pub const TOKEN_COOKIE: &str = "token";
