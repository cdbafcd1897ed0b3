//! List products query
//!
//! Turns the raw listing parameters into a normalized query spec and
//! composes the filter, sort, and pagination into dynamic SQL.
//!
//! The normalization never rejects input: unparseable numbers fall back to
//! their defaults, unknown sort fields are skipped, and an absent sort
//! defaults to newest-first. Sort tokens map onto a fixed column whitelist,
//! which is also what keeps user input out of the ORDER BY clause.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::features::products::Product;
use crate::features::shared::pagination::PaginationMetadata;

/// Default page number
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size. There is no upper cap on `limit`.
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw listing parameters as they arrive on the query string.
///
/// Everything is optional and lenient; see [`QuerySpec::from_params`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListProductsQuery {
    /// Free-text match against name, description, or category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Exact category match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Inclusive lower price bound
    #[serde(rename = "minPrice", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    /// Inclusive upper price bound
    #[serde(rename = "maxPrice", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    /// Comma-separated sort fields; a leading `-` sorts descending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Page number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

/// Whitelisted sort fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Price,
    Category,
    Stock,
    CreatedAt,
}

impl SortField {
    /// Map a request token onto a sort field; unknown tokens yield `None`
    fn parse(token: &str) -> Option<Self> {
        match token {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "category" => Some(Self::Category),
            "stock" => Some(Self::Stock),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    /// The backing column
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Category => "category",
            Self::Stock => "stock",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => " ASC",
            Self::Desc => " DESC",
        }
    }
}

/// Normalized filter/sort/pagination spec, built fresh per list request
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Sort keys in priority order; never empty
    pub sort: Vec<(SortField, SortDirection)>,
    pub page: i64,
    pub limit: i64,
}

impl QuerySpec {
    /// Normalize raw parameters. Degrades silently to defaults; never fails.
    pub fn from_params(params: &ListProductsQuery) -> Self {
        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let category = params
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let min_price = parse_price(params.min_price.as_deref());
        let max_price = parse_price(params.max_price.as_deref());

        Self {
            search,
            category,
            min_price,
            max_price,
            sort: parse_sort(params.sort.as_deref()),
            page: parse_positive(params.page.as_deref(), DEFAULT_PAGE),
            limit: parse_positive(params.limit.as_deref(), DEFAULT_LIMIT),
        }
    }

    /// SQL OFFSET for the requested page
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Append the WHERE clause shared by the page and count statements
    fn push_filters(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE 1=1");

        if let Some(ref search) = self.search {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR category ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(ref category) = self.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }

        if let Some(min_price) = self.min_price {
            builder.push(" AND price >= ").push_bind(min_price);
        }

        if let Some(max_price) = self.max_price {
            builder.push(" AND price <= ").push_bind(max_price);
        }
    }

    /// Append the ORDER BY clause. Columns come from the whitelist only.
    fn push_order(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" ORDER BY ");
        for (i, (field, direction)) in self.sort.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(field.column());
            builder.push(direction.sql());
        }
    }
}

/// Lenient positive-integer parse with a fallback default
fn parse_positive(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Lenient price-bound parse; non-numeric bounds are dropped
fn parse_price(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Parse the comma-separated sort string.
///
/// Tokens apply left to right (the first token is the primary key); a
/// leading `-` flips the field to descending; unknown fields are skipped.
/// An absent or empty sort defaults to newest-first.
fn parse_sort(value: Option<&str>) -> Vec<(SortField, SortDirection)> {
    let keys: Vec<_> = value
        .unwrap_or_default()
        .split(',')
        .filter_map(|token| {
            let token = token.trim();
            let (name, direction) = match token.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (token, SortDirection::Asc),
            };
            SortField::parse(name).map(|field| (field, direction))
        })
        .collect();

    if keys.is_empty() {
        vec![(SortField::CreatedAt, SortDirection::Desc)]
    } else {
        keys
    }
}

/// Response for the list query
#[derive(Debug, Clone, Serialize)]
pub struct ListProductsResponse {
    pub products: Vec<Product>,
    pub pagination: PaginationMetadata,
}

/// Errors that can occur when listing products.
///
/// The spec construction itself never fails; only execution can.
#[derive(Debug, thiserror::Error)]
pub enum ListProductsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListProductsResponse, ListProductsError>> for ListProductsQuery {}

impl crate::cqrs::middleware::Query for ListProductsQuery {}

/// Handler function for listing products
#[tracing::instrument(skip(pool, query))]
pub async fn handle(
    pool: PgPool,
    query: ListProductsQuery,
) -> Result<ListProductsResponse, ListProductsError> {
    let spec = QuerySpec::from_params(&query);

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "SELECT id, name, description, price, category, stock, images, \
         created_at, updated_at FROM products",
    );
    spec.push_filters(&mut builder);
    spec.push_order(&mut builder);
    builder.push(" LIMIT ").push_bind(spec.limit);
    builder.push(" OFFSET ").push_bind(spec.offset());

    let products = builder
        .build_query_as::<Product>()
        .fetch_all(&pool)
        .await?;

    let mut count_builder: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products");
    spec.push_filters(&mut count_builder);

    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&pool)
        .await?;

    tracing::debug!(
        total,
        page = spec.page,
        limit = spec.limit,
        returned = products.len(),
        "Products listed"
    );

    Ok(ListProductsResponse {
        products,
        pagination: PaginationMetadata::new(spec.page, spec.limit, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListProductsQuery {
        ListProductsQuery::default()
    }

    #[test]
    fn test_defaults() {
        let spec = QuerySpec::from_params(&params());
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 10);
        assert_eq!(spec.offset(), 0);
        assert_eq!(spec.sort, vec![(SortField::CreatedAt, SortDirection::Desc)]);
        assert!(spec.search.is_none());
        assert!(spec.category.is_none());
        assert!(spec.min_price.is_none());
        assert!(spec.max_price.is_none());
    }

    #[test]
    fn test_offset_math() {
        let mut query = params();
        query.page = Some("2".to_string());
        query.limit = Some("5".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.offset(), 5);

        query.page = Some("7".to_string());
        query.limit = Some("25".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.offset(), 150);
    }

    #[test]
    fn test_non_numeric_page_and_limit_fall_back() {
        let mut query = params();
        query.page = Some("abc".to_string());
        query.limit = Some("-3".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 10);
    }

    #[test]
    fn test_limit_is_uncapped() {
        let mut query = params();
        query.limit = Some("100000".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.limit, 100_000);
    }

    #[test]
    fn test_sort_primary_key_is_first_token() {
        let mut query = params();
        query.sort = Some("-price,name".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(
            spec.sort,
            vec![
                (SortField::Price, SortDirection::Desc),
                (SortField::Name, SortDirection::Asc),
            ]
        );
    }

    #[test]
    fn test_sort_unknown_tokens_are_skipped() {
        let mut query = params();
        query.sort = Some("nonsense,-price".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.sort, vec![(SortField::Price, SortDirection::Desc)]);
    }

    #[test]
    fn test_sort_all_unknown_falls_back_to_default() {
        let mut query = params();
        query.sort = Some("foo,bar".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.sort, vec![(SortField::CreatedAt, SortDirection::Desc)]);
    }

    #[test]
    fn test_sort_accepts_both_created_at_spellings() {
        for token in ["createdAt", "created_at"] {
            let mut query = params();
            query.sort = Some(token.to_string());
            let spec = QuerySpec::from_params(&query);
            assert_eq!(spec.sort, vec![(SortField::CreatedAt, SortDirection::Asc)]);
        }
    }

    #[test]
    fn test_price_bounds_parse_leniently() {
        let mut query = params();
        query.min_price = Some("10".to_string());
        query.max_price = Some("cheap".to_string());
        let spec = QuerySpec::from_params(&query);
        assert_eq!(spec.min_price, Some(10.0));
        assert_eq!(spec.max_price, None);
    }

    #[test]
    fn test_blank_search_and_category_are_dropped() {
        let mut query = params();
        query.search = Some("   ".to_string());
        query.category = Some(String::new());
        let spec = QuerySpec::from_params(&query);
        assert!(spec.search.is_none());
        assert!(spec.category.is_none());
    }

    #[test]
    fn test_page_sql_contains_filters_and_order() {
        let mut query = params();
        query.search = Some("desk".to_string());
        query.category = Some("furniture".to_string());
        query.min_price = Some("10".to_string());
        query.max_price = Some("50".to_string());
        query.sort = Some("-price,name".to_string());
        let spec = QuerySpec::from_params(&query);

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT id FROM products");
        spec.push_filters(&mut builder);
        spec.push_order(&mut builder);
        let sql = builder.sql().to_string();

        assert!(sql.contains("name ILIKE"));
        assert!(sql.contains("description ILIKE"));
        assert!(sql.contains("category ILIKE"));
        assert!(sql.contains("category = "));
        assert!(sql.contains("price >= "));
        assert!(sql.contains("price <= "));
        assert!(sql.contains("ORDER BY price DESC, name ASC"));
    }

    #[test]
    fn test_order_clause_never_embeds_user_input() {
        let mut query = params();
        query.sort = Some("price; DROP TABLE products".to_string());
        let spec = QuerySpec::from_params(&query);
        // The malicious token is not a whitelisted field, so the default wins
        assert_eq!(spec.sort, vec![(SortField::CreatedAt, SortDirection::Desc)]);
    }
}
