//! In-memory remote service.
//!
//! Behaves like the hosted backend for the subset of features the client
//! uses: server-assigned `id` and `created_at`, equality filters, ordering,
//! and return-the-persisted-row semantics. Failures can be injected with
//! [`InMemoryRemote::fail_next`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use super::{Filter, Query, RemoteService, Row};
use crate::error::RemoteError;

#[derive(Default)]
struct Tables {
    rows: HashMap<String, Vec<Row>>,
    last_created_at: Option<DateTime<Utc>>,
    fail_next: Option<String>,
    calls: usize,
}

impl Tables {
    /// Strictly increasing so rows inserted back to back still order.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn begin_call(&mut self) -> Result<(), RemoteError> {
        self.calls += 1;
        match self.fail_next.take() {
            Some(message) => Err(RemoteError::Unavailable(message)),
            None => Ok(()),
        }
    }
}

/// Process-local table store implementing [`RemoteService`].
#[derive(Default)]
pub struct InMemoryRemote {
    inner: Mutex<Tables>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload rows verbatim (no id or timestamp assignment).
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.lock();
        tables
            .rows
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Make the next call fail with [`RemoteError::Unavailable`].
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Snapshot of a table in storage order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    /// Number of calls received, failed ones included.
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Poisoned only by a panicking caller; the tables are never half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Nulls/missing sort after present values, like Postgres ASC.
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RemoteService for InMemoryRemote {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, RemoteError> {
        let mut tables = self.lock();
        tables.begin_call()?;
        let mut rows: Vec<Row> = tables
            .rows
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(ref order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, RemoteError> {
        let mut tables = self.lock();
        tables.begin_call()?;

        if !row.contains_key("id") {
            row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            let ts = tables.next_created_at();
            row.insert(
                "created_at".into(),
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, false)),
            );
        }

        let rows = tables.rows.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(RemoteError::Constraint(format!(
                "duplicate key value violates unique constraint \"{table}_pkey\""
            )));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, RemoteError> {
        let mut tables = self.lock();
        tables.begin_call()?;
        let mut updated = Vec::new();
        if let Some(rows) = tables.rows.get_mut(table) {
            for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError> {
        let mut tables = self.lock();
        tables.begin_call()?;
        if let Some(rows) = tables.rows.get_mut(table) {
            rows.retain(|row| !matches_all(row, filters));
        }
        Ok(())
    }
}
