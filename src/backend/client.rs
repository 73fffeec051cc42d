//! Tables API REST Client
//!
//! HTTP client for a hosted PostgREST endpoint (`<url>/rest/v1/<table>`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::error::{BackendError, BackendResult};
use super::query::{parse_content_range, Filter, QueryResponse, SelectQuery};
use super::QueryService;

/// Longest request timeout accepted from config (one day)
pub const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project base URL (e.g., "https://xyz.supabase.co")
    pub base_url: String,
    /// Project API key
    pub api_key: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            request_timeout_ms: 30_000,
        }
    }
}

impl From<&crate::config::BackendConfig> for ClientConfig {
    fn from(config: &crate::config::BackendConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            api_key: config.api_key.clone(),
            request_timeout_ms: config
                .request_timeout_secs
                .saturating_mul(1000)
                .min(MAX_TIMEOUT_MS),
        }
    }
}

/// PostgREST client
pub struct PostgrestClient {
    client: Client,
    config: ClientConfig,
}

impl PostgrestClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> BackendResult<Self> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let key = HeaderValue::from_str(&config.api_key)
                .map_err(|e| BackendError::Config(format!("api key: {}", e)))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| BackendError::Config(format!("api key: {}", e)))?;
            headers.insert("apikey", key);
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(BackendError::Request)?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// URL of a table endpoint
    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(table)
        )
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(BackendError::from_transport)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(BackendError::from_response(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl QueryService for PostgrestClient {
    async fn select(&self, query: &SelectQuery) -> BackendResult<QueryResponse> {
        let mut request = self
            .client
            .get(self.table_url(&query.table))
            .query(&query.to_params());
        if query.count_exact {
            request = request.header("Prefer", "count=exact");
        }

        tracing::debug!(table = %query.table, "select");
        let response = self.send(request).await?;

        let count = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let body = response.text().await.map_err(BackendError::from_transport)?;
        let rows: Vec<Value> = serde_json::from_str(&body)?;

        Ok(QueryResponse {
            rows,
            count: if query.count_exact { count } else { None },
        })
    }

    async fn insert(&self, table: &str, row: Value) -> BackendResult<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&row);

        tracing::debug!(table = %table, "insert");
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> BackendResult<()> {
        if filters.is_empty() {
            // PostgREST would patch every row
            return Err(BackendError::Config(format!(
                "refusing unfiltered update of {}",
                table
            )));
        }

        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&params)
            .header("Prefer", "return=minimal")
            .json(&patch);

        tracing::debug!(table = %table, "update");
        self.send(request).await?;
        Ok(())
    }
}
