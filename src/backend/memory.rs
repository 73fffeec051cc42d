//! In-memory tables for exercising screens without a network
//!
//! Understands the same filters, ordering, and paging as the REST client.
//! Tables can be switched into a failing mode to test error paths.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::error::{BackendError, BackendResult};
use super::query::{Filter, QueryResponse, SelectQuery};
use super::QueryService;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    failing: Mutex<HashSet<String>>,
    selects: Mutex<Vec<SelectQuery>>,
    next_id: Mutex<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: seed a table
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), rows);
        self
    }

    /// Make every operation on `table` fail
    pub fn fail(&self, table: &str) {
        self.failing.lock().unwrap().insert(table.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Every select issued so far
    pub fn selects(&self) -> Vec<SelectQuery> {
        self.selects.lock().unwrap().clone()
    }

    fn check(&self, table: &str) -> BackendResult<()> {
        if self.failing.lock().unwrap().contains(table) {
            Err(BackendError::Api {
                status: 503,
                code: String::new(),
                message: format!("{} is down", table),
            })
        } else {
            Ok(())
        }
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).map(as_text);
    match (filter, cell) {
        (Filter::Eq { value, .. }, Some(cell)) => &cell == value,
        (Filter::In { values, .. }, Some(cell)) => values.contains(&cell),
        (_, None) => false,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl QueryService for MemoryBackend {
    async fn select(&self, query: &SelectQuery) -> BackendResult<QueryResponse> {
        self.selects.lock().unwrap().push(query.clone());
        self.check(&query.table)?;

        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .collect();

        rows.sort_by(|a, b| {
            for key in &query.order {
                let ord = compare(a.get(&key.column), b.get(&key.column));
                let ord = if key.ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let total = rows.len() as u64;
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();

        Ok(QueryResponse {
            rows,
            count: query.count_exact.then_some(total),
        })
    }

    async fn insert(&self, table: &str, row: Value) -> BackendResult<()> {
        self.check(table)?;

        let mut row = match row {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        if !row.contains_key("id") {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            row.insert("id".to_string(), Value::String(format!("gen-{}", *next)));
        }

        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(Value::Object(row));
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> BackendResult<()> {
        self.check(table)?;

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        for row in rows.iter_mut() {
            if !filters.iter().all(|f| matches(row, f)) {
                continue;
            }
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &patch) {
                for (k, v) in changes {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filter_order_page() {
        let backend = MemoryBackend::new().with_rows(
            "t",
            vec![
                json!({"id": 1, "name": "c", "active": true}),
                json!({"id": 2, "name": "a", "active": false}),
                json!({"id": 3, "name": "b", "active": true}),
            ],
        );

        let response = backend
            .select(
                &SelectQuery::table("t")
                    .eq("active", true)
                    .order("name", true)
                    .count_exact(),
            )
            .await
            .unwrap();
        let names: Vec<&str> = response.rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(response.count, Some(2));

        let page = backend
            .select(&SelectQuery::table("t").order("id", false).range(1, 1))
            .await
            .unwrap();
        assert_eq!(page.rows, vec![json!({"id": 2, "name": "a", "active": false})]);
    }

    #[tokio::test]
    async fn test_insert_update() {
        let backend = MemoryBackend::new();
        backend.insert("t", json!({"k": "v"})).await.unwrap();
        backend
            .update("t", &[Filter::eq("k", "v")], json!({"k": "w"}))
            .await
            .unwrap();

        let rows = backend.rows("t");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["k"], "w");
        assert_eq!(rows[0]["id"], "gen-1");
    }

    #[tokio::test]
    async fn test_failing_table() {
        let backend = MemoryBackend::new();
        backend.fail("t");
        assert!(backend.select(&SelectQuery::table("t")).await.is_err());
        assert!(backend.insert("t", json!({})).await.is_err());
    }
}
