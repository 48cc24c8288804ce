//! HTTP client for the record store

use super::error::StoreError;
use super::models::{expect_record, expect_records, now_timestamp, parse_body, Envelope, Record};
use super::tables::Table;
use super::traits::RecordStore;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Record store reached over HTTP.
///
/// Tables are addressed as `{base_url}/{table}` and records as
/// `{base_url}/{table}/{id}`. Cheaply cloneable (shares the reqwest client).
#[derive(Clone)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRecordStore {
    /// Create a client for the store at `base_url`.
    ///
    /// `token` is sent as a bearer token when present; obtaining it is the
    /// job of the session layer, not of this client.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.name())
    }

    fn record_url(&self, table: Table, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            table.name(),
            urlencoding::encode(id)
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send a request and unwrap the response payload
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Prefer the envelope's message over the raw body
            let message = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|env| env.error_message())
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    } else {
                        body.clone()
                    }
                });
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        parse_body(&body)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn create(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        if super::models::record_id(&record).is_none() {
            record.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        let now = now_timestamp();
        record
            .entry("createdAt")
            .or_insert_with(|| Value::String(now.clone()));
        record
            .entry("updatedAt")
            .or_insert_with(|| Value::String(now));

        let url = self.table_url(table);
        debug!(url = %url, "Creating record");
        let data = self.send(self.client.post(&url).json(&record)).await?;

        match data {
            // Some deployments only acknowledge; the sent record is then authoritative
            Value::Null | Value::Bool(_) => Ok(record),
            other => expect_record(other),
        }
    }

    async fn list(&self, table: Table) -> Result<Vec<Record>, StoreError> {
        let url = self.table_url(table);
        debug!(url = %url, "Listing records");
        let data = self.send(self.client.get(&url)).await?;
        expect_records(data)
    }

    async fn get_by_id(&self, table: Table, id: &str) -> Result<Record, StoreError> {
        let url = self.record_url(table, id);
        debug!(url = %url, "Fetching record");
        match self.send(self.client.get(&url)).await {
            Ok(Value::Null) | Err(StoreError::Status { status: 404, .. }) => {
                Err(StoreError::NotFound {
                    table: table.name().to_string(),
                    id: id.to_string(),
                })
            }
            Ok(data) => expect_record(data),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, table: Table, id: &str, fields: Record) -> Result<Record, StoreError> {
        let url = self.record_url(table, id);
        debug!(url = %url, fields = fields.len(), "Updating record");
        let data = self.send(self.client.put(&url).json(&fields)).await?;

        match data {
            Value::Null | Value::Bool(_) => {
                let mut confirmed = fields;
                confirmed.insert("id".into(), Value::String(id.to_string()));
                Ok(confirmed)
            }
            other => expect_record(other),
        }
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let url = self.record_url(table, id);
        debug!(url = %url, "Deleting record");
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}
