//! CQRS marker traits
//!
//! Commands are write operations; queries are reads. The markers let
//! middleware and tests distinguish the two sides without inspecting the
//! concrete request type.

/// Marker for write operations
pub trait Command {}

/// Marker for read operations
pub trait Query {}
