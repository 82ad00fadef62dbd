use crate::core::{ConfigProvider, Operator, Record, RecordStore, SelectQuery, SessionProvider, Table};
use crate::utils::error::{HsseError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// REST client for the hosted data API and its auth endpoint.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl BackendClient {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let base_url = Url::parse(config.backend_url()).map_err(|e| HsseError::InvalidConfigValueError {
            field: "backend.url".to_string(),
            value: config.backend_url().to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key().to_string(),
            access_token: config.access_token().map(str::to_string),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HsseError::InvalidConfigValueError {
                field: "backend.url".to_string(),
                value: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    fn table_url(&self, table: Table) -> Result<Url> {
        self.endpoint(&["rest", "v1", table.as_str()])
    }

    fn id_filter(ids: &[String]) -> (String, String) {
        match ids {
            [id] => ("id".to_string(), format!("eq.{}", id)),
            _ => ("id".to_string(), format!("in.({})", ids.join(","))),
        }
    }

    async fn check(table: Table, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("{} response status: {}", table, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .filter(|m| !m.is_empty())
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        Err(HsseError::StoreError {
            table: table.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RecordStore for BackendClient {
    async fn insert(&self, table: Table, row: serde_json::Value) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(table)?)
            .header("Prefer", "return=minimal")
            .json(&[row]);
        let response = self.authorized(request).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn select(&self, table: Table, query: &SelectQuery) -> Result<Vec<Record>> {
        let mut params = vec![("select".to_string(), query.columns.replace(' ', ""))];
        params.extend(
            query
                .filters
                .iter()
                .map(|f| (f.column().to_string(), f.to_query_value())),
        );
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        let request = self.client.get(self.table_url(table)?).query(&params);
        let response = self.authorized(request).send().await?;
        let records: Vec<Record> = Self::check(table, response).await?.json().await?;
        tracing::debug!("Fetched {} rows from {}", records.len(), table);
        Ok(records)
    }

    async fn update(&self, table: Table, id: &str, patch: serde_json::Value) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(table)?)
            .query(&[Self::id_filter(&[id.to_string()])])
            .header("Prefer", "return=minimal")
            .json(&patch);
        let response = self.authorized(request).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = self
            .client
            .delete(self.table_url(table)?)
            .query(&[Self::id_filter(ids)]);
        let response = self.authorized(request).send().await?;
        Self::check(table, response).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for BackendClient {
    async fn current_operator(&self) -> Result<Operator> {
        if self.access_token.is_none() {
            return Err(HsseError::SessionError {
                message: "no access token configured".to_string(),
            });
        }

        let request = self.client.get(self.endpoint(&["auth", "v1", "user"])?);
        let response = self.authorized(request).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(HsseError::SessionError {
                message: format!("session rejected ({})", status),
            });
        }
        if !status.is_success() {
            return Err(HsseError::SessionError {
                message: format!("session lookup failed ({})", status),
            });
        }

        Ok(response.json::<Operator>().await?)
    }
}
