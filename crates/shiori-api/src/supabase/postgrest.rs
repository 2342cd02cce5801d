use std::fmt::Display;
use std::future::Future;

use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;

/// A `select` against one table, in PostgREST terms.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: &'static str,
    pub select: String,
    /// `(column, "eq.value")` pairs.
    pub filters: Vec<(String, String)>,
    /// `(column, ascending)`.
    pub order: Option<(String, bool)>,
    pub limit: Option<u32>,
}

impl TableQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.split_whitespace().collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in the order PostgREST documents them.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.filters.iter().cloned());
        if let Some((column, ascending)) = &self.order {
            let dir = if *ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Row source for the relational adapter.
pub trait TableSource: Send + Sync {
    fn select(&self, query: &TableQuery)
        -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;
}

/// Supabase REST (PostgREST) client authenticated with the anon key.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    http: Client,
    base: Url,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(project_url: &str, anon_key: &str) -> Result<Self, ApiError> {
        let base = Url::parse(project_url.trim())?;
        if base.cannot_be_a_base() {
            return Err(ApiError::NotConfigured(format!(
                "supabase url is not a base URL: {project_url}"
            )));
        }
        Ok(Self {
            http: Client::new(),
            base,
            anon_key: anon_key.trim().to_string(),
        })
    }

    pub fn table_url(&self, query: &TableQuery) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::NotConfigured("supabase url is not a base URL".into()))?
            .pop_if_empty()
            .extend(["rest", "v1", query.table]);
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        Ok(url)
    }
}

/// `message` of a PostgREST error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

impl TableSource for PostgrestClient {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, ApiError> {
        let url = self.table_url(query)?;
        tracing::debug!(table = query.table, select = %query.select, "Supabase query");

        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(table = query.table, status = status_code, "Supabase query failed");
            return Err(ApiError::Query {
                status: status_code,
                message: error_message(&body).unwrap_or(body),
            });
        }

        resp.json::<Vec<Value>>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}
