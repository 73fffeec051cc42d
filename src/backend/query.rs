//! Select query builder
//!
//! Describes a read against one table and renders it as PostgREST query
//! parameters:
//!
//! ```text
//! select=*  nrp=eq.1001  user_id=in.(1,2)  order=nama.asc  offset=10  limit=10
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{BackendError, BackendResult};

/// A row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Filter::Eq {
            column: column.into(),
            value: value.to_string(),
        }
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } => column,
        }
    }

    /// Render as a `(column, operator.value)` query pair
    pub fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq { column, value } => (column.clone(), format!("eq.{}", value)),
            Filter::In { column, values } => {
                let list: Vec<String> = values.iter().map(|v| quote_list_item(v)).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
        }
    }
}

/// Quote an `in.(...)` item when it contains reserved characters
fn quote_list_item(value: &str) -> String {
    let reserved = value
        .chars()
        .any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\' | ' '));
    if reserved {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A read against one table
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub count_exact: bool,
}

impl SelectQuery {
    /// Select all columns from `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            offset: None,
            limit: None,
            count_exact: false,
        }
    }

    /// Builder method: choose columns (PostgREST select syntax, embedding allowed)
    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Builder method: `column = value`
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Builder method: `column IN (values)`
    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.filters.push(Filter::in_list(column, values));
        self
    }

    /// Builder method: add a sort key
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Builder method: inclusive row range, as in `range(0, 9)` for the first ten
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    /// Builder method: cap the number of rows
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builder method: ask for the total row count
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Render as query pairs, in a stable order
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];

        params.extend(self.filters.iter().map(Filter::to_param));

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }

        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

/// Rows returned by a select, with the total count when requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub rows: Vec<Value>,
    pub count: Option<u64>,
}

impl QueryResponse {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows, count: None }
    }

    /// Decode every row into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> BackendResult<Vec<T>> {
        self.rows
            .iter()
            .map(|row| serde_json::from_value(row.clone()).map_err(BackendError::from))
            .collect()
    }

    /// Decode the first row, if any
    pub fn first<T: DeserializeOwned>(&self) -> BackendResult<Option<T>> {
        self.rows
            .first()
            .map(|row| serde_json::from_value(row.clone()))
            .transpose()
            .map_err(BackendError::from)
    }
}

/// Parse the total out of a `Content-Range` header such as `0-9/42` or `*/0`
pub fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_dashboard_page_params() {
        let query = SelectQuery::table("custom_users")
            .range(10, 19)
            .order("nama", true)
            .count_exact();

        let params = query.to_params();
        assert_eq!(param(&params, "select"), Some("*"));
        assert_eq!(param(&params, "order"), Some("nama.asc"));
        assert_eq!(param(&params, "offset"), Some("10"));
        assert_eq!(param(&params, "limit"), Some("10"));
        assert!(query.count_exact);
    }

    #[test]
    fn test_filters() {
        let query = SelectQuery::table("user_session")
            .eq("username", "1001")
            .eq("is_active", true)
            .in_list("user_id", ["a", "b c", "d,e"])
            .order("login_time", false);

        let params = query.to_params();
        assert_eq!(param(&params, "username"), Some("eq.1001"));
        assert_eq!(param(&params, "is_active"), Some("eq.true"));
        assert_eq!(param(&params, "user_id"), Some(r#"in.(a,"b c","d,e")"#));
        assert_eq!(param(&params, "order"), Some("login_time.desc"));
    }

    #[test]
    fn test_multiple_order_keys() {
        let params = SelectQuery::table("t")
            .order("a", true)
            .order("b", false)
            .to_params();
        assert_eq!(param(&params, "order"), Some("a.asc,b.desc"));
    }

    #[test]
    fn test_content_range() {
        assert_eq!(parse_content_range("0-9/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_decode_rows() {
        #[derive(Deserialize)]
        struct Row {
            id: i64,
        }

        let response = QueryResponse::new(vec![json!({"id": 1}), json!({"id": 2})]);
        let rows: Vec<Row> = response.decode().unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let first: Option<Row> = response.first().unwrap();
        assert_eq!(first.map(|r| r.id), Some(1));

        let empty: Option<Row> = QueryResponse::default().first().unwrap();
        assert!(empty.is_none());

        let bad = QueryResponse::new(vec![json!({"id": "x"})]);
        assert!(bad.decode::<Row>().is_err());
    }
}
