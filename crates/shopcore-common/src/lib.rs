//! Shopcore Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the shopcore workspace:
//!
//! - **Logging**: centralized tracing configuration and initialization
//! - **Checksums**: content digests for uploaded media
//! - **Error Handling**: error types shared by the utilities above

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
