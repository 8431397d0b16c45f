//! PostgREST client for the hosted backend.
//!
//! Requests go to `{base}/rest/v1/{table}` with the project API key sent both
//! as `apikey` and as a bearer token. Filters use PostgREST's `col=eq.value`
//! syntax; writes ask for `Prefer: return=representation` so the persisted
//! row comes back in the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{Filter, Query, RemoteService, Row};
use crate::error::RemoteError;
use crate::storage::BackendSettings;

const REST_PATH: &str = "rest/v1/";

/// HTTP implementation of [`RemoteService`].
pub struct RestClient {
    base_url: Url,
    api_key: String,
    http_client: Client,
}

impl RestClient {
    /// Create a client for the project at `base_url`.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(base_url, api_key, None)
    }

    /// Like [`RestClient::new`], with an overall per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            http_client: builder.build()?,
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self, RemoteError> {
        Self::with_timeout(
            &settings.url,
            settings.anon_key.clone(),
            settings.request_timeout,
        )
    }

    fn table_url(&self, table: &str) -> Result<Url, RemoteError> {
        Ok(self.base_url.join(REST_PATH)?.join(table)?)
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder, RemoteError> {
        let url = self.table_url(table)?;
        tracing::debug!(method = method.as_str(), url = url.as_str(), "remote request");
        Ok(self
            .http_client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json"))
    }
}

/// Render a filter as a PostgREST query pair.
fn filter_param(filter: &Filter) -> (String, String) {
    let rendered = match &filter.value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    };
    (filter.column.clone(), rendered)
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(filter_param).collect()
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Map a non-success response to a [`RemoteError`].
fn error_from_response(status: u16, body: &str) -> RemoteError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(m), Some(d)) => format!("{m} ({d})"),
        (Some(m), None) => m,
        (None, _) if body.trim().is_empty() => format!("HTTP {status}"),
        (None, _) => body.trim().to_string(),
    };

    match parsed.code.as_deref() {
        Some("PGRST116") => RemoteError::NotFound,
        Some(code) if code.starts_with("23") => RemoteError::Constraint(message),
        _ => match status {
            404 | 406 => RemoteError::NotFound,
            409 => RemoteError::Constraint(message),
            _ => RemoteError::Http { status, message },
        },
    }
}

async fn read_rows(resp: Response) -> Result<Vec<Row>, RemoteError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(error_from_response(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(RemoteError::InvalidResponse(format!(
                    "expected a row object, got {other}"
                ))),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        other => Err(RemoteError::InvalidResponse(format!(
            "expected rows, got {other}"
        ))),
    }
}

#[async_trait]
impl RemoteService for RestClient {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, RemoteError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filter_params(&query.filters));
        if let Some(ref order) = query.order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }

        let resp = self.request(Method::GET, table)?.query(&params).send().await?;
        read_rows(resp).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, RemoteError> {
        let resp = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        read_rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::InvalidResponse("insert returned no row".into()))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, RemoteError> {
        let resp = self
            .request(Method::PATCH, table)?
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(&patch)
            .send()
            .await?;
        read_rows(resp).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), RemoteError> {
        let resp = self
            .request(Method::DELETE, table)?
            .query(&filter_params(filters))
            .send()
            .await?;
        read_rows(resp).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_url_keeps_base_path() {
        let client = RestClient::new("https://example.test/project", "key").unwrap();
        assert_eq!(
            client.table_url("cards").unwrap().as_str(),
            "https://example.test/project/rest/v1/cards"
        );
        let client = RestClient::new("https://example.test", "key").unwrap();
        assert_eq!(
            client.table_url("auth_users").unwrap().as_str(),
            "https://example.test/rest/v1/auth_users"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            RestClient::new("not a url", "key"),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[test]
    fn filter_param_renders_postgrest_syntax() {
        assert_eq!(
            filter_param(&Filter::eq("id", "abc")),
            ("id".to_string(), "eq.abc".to_string())
        );
        assert_eq!(
            filter_param(&Filter::eq("reach", 42)),
            ("reach".to_string(), "eq.42".to_string())
        );
        assert_eq!(
            filter_param(&Filter::eq("owner", json!(null))),
            ("owner".to_string(), "is.null".to_string())
        );
    }

    #[test]
    fn error_mapping_follows_postgrest_codes() {
        let not_found = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert!(error_from_response(406, not_found).is_not_found());

        let unique = r#"{"code":"23505","message":"duplicate key value","details":"Key (id)=(x) already exists."}"#;
        match error_from_response(409, unique) {
            RemoteError::Constraint(msg) => assert!(msg.contains("duplicate key value")),
            other => panic!("unexpected {other:?}"),
        }

        match error_from_response(500, "boom") {
            RemoteError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
