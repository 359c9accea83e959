use chrono::NaiveDateTime;
use reqwest::{RequestBuilder, Url};
use serde_json::Value;

use crate::config::{StoreConfig, StoreCredentials};
use crate::error::StoreError;
use crate::schema::MarketRow;
use crate::util;

use super::{VolumeStore, CONFLICT_COLUMNS, SELECT_COLUMNS};

/// Supabase / PostgREST gateway for the `hourly_volume` table.
///
/// WRITE:
///   POST /rest/v1/{table}?on_conflict=exchange,market,datetime_kst
///   Prefer: resolution=merge-duplicates,return=representation
///
/// READ:
///   GET /rest/v1/{table}?select=...&datetime_kst=gte.{ts}
///       &order=datetime_kst.asc,exchange.asc,market.asc
///       &offset={o}&limit={n}
///
/// The explicit order keeps offset pages disjoint.
pub struct PostgrestStore {
    http: reqwest::Client,
    endpoint: String,
    service_key: String,
    page_size: usize,
}

impl PostgrestStore {
    pub fn new(http: reqwest::Client, credentials: StoreCredentials, config: &StoreConfig) -> Self {
        Self {
            http,
            endpoint: format!("{}/rest/v1/{}", credentials.url, config.table),
            service_key: credentials.service_key,
            page_size: config.page_size,
        }
    }

    fn url(&self, params: &[(&str, String)]) -> Result<Url, StoreError> {
        Url::parse_with_params(&self.endpoint, params)
            .map_err(|e| StoreError::Http(format!("invalid url {}: {e}", self.endpoint)))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Status check; non-2xx bodies are kept for the log line.
    async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait::async_trait]
impl VolumeStore for PostgrestStore {

    fn name(&self) -> &'static str {
        "supabase"
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn write_batch(&self, rows: &[MarketRow]) -> Result<usize, StoreError> {
        let url = self.url(&[("on_conflict", CONFLICT_COLUMNS.to_string())])?;

        let resp = self
            .authorized(self.http.post(url))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows)
            .send()
            .await?;

        let saved: Vec<Value> = Self::checked(resp).await?.json().await?;
        Ok(saved.len())
    }

    async fn read_page(
        &self,
        threshold: NaiveDateTime,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<MarketRow>, StoreError> {
        let url = self.url(&[
            ("select", SELECT_COLUMNS.to_string()),
            ("datetime_kst", format!("gte.{}", threshold.format(util::KST_BOUND_FORMAT))),
            ("order", "datetime_kst.asc,exchange.asc,market.asc".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ])?;

        let resp = self.authorized(self.http.get(url)).send().await?;
        Ok(Self::checked(resp).await?.json().await?)
    }
}
