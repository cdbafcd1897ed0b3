//! Product queries (read operations)

pub mod get;
pub mod list;

pub use get::{GetProductError, GetProductQuery};
pub use list::{ListProductsError, ListProductsQuery, ListProductsResponse, QuerySpec};
