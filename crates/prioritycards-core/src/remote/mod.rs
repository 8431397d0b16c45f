//! Remote CRUD service contract.
//!
//! The hosted backend is treated as an opaque row store exposing four
//! operations per table. Everything above this layer depends only on the
//! [`RemoteService`] trait plus one assumption: `insert` and `update` return
//! the full persisted row, including server-assigned `id` and `created_at`.
//!
//! Two implementations ship with the crate:
//! - [`RestClient`]: PostgREST over HTTP.
//! - [`InMemoryRemote`]: process-local tables, for tests and local runs.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RemoteError;

pub use memory::InMemoryRemote;
pub use rest::RestClient;

/// One table row as a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Column equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether `row` satisfies this filter.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

/// Sort order for `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

/// Parameters for `select`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

/// The four-operation CRUD contract of the hosted backend.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// All rows of `table` matching every filter in `query`, in its order.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, RemoteError>;

    /// Create a row and return it as persisted.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError>;

    /// Apply `patch` to every row matching `filters`; returns the updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Row)
        -> Result<Vec<Row>, RemoteError>;

    /// Delete every row matching `filters`. Matching nothing is not an error.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_exact_value_only() {
        let mut row = Row::new();
        row.insert("id".into(), json!("a"));
        row.insert("n".into(), json!(1));
        assert!(Filter::eq("id", "a").matches(&row));
        assert!(!Filter::eq("id", "b").matches(&row));
        assert!(!Filter::eq("n", "1").matches(&row));
        assert!(!Filter::eq("missing", "a").matches(&row));
    }

    #[test]
    fn query_builder_accumulates_filters() {
        let q = Query::new()
            .eq("username", "alice")
            .eq("password_hash", "x")
            .order(Order::desc("created_at"));
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.order, Some(Order::desc("created_at")));
    }
}
