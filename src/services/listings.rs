use crate::models::{ListingRecord, SearchCriteria};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading from the listing store
#[derive(Debug, Error)]
pub enum ListingStoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Table names in the listing store
#[derive(Debug, Clone)]
pub struct ListingTables {
    pub listings: String,
    pub criteria: String,
    /// Value of the `status` column for listings open to matching
    pub active_status: String,
}

/// REST client for the marketplace datastore
///
/// Talks to a PostgREST-style endpoint: every table is exposed at
/// `{base_url}/{table}` and filtered with `column=op.value` query pairs.
/// Handles:
/// - Fetching a listing or a saved search by id
/// - Listing the active candidate pool
pub struct ListingStoreClient {
    base_url: String,
    api_key: String,
    client: Client,
    tables: ListingTables,
}

impl ListingStoreClient {
    /// Create a new listing store client
    pub fn new(
        base_url: String,
        api_key: String,
        tables: ListingTables,
        timeout: Duration,
    ) -> Result<Self, ListingStoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            tables,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), table)
    }

    /// GET a table with the given filters and return the raw rows
    async fn fetch_rows(&self, table: &str, filters: &[(String, String)]) -> Result<Vec<Value>, ListingStoreError> {
        let query = std::iter::once("select=*".to_string())
            .chain(
                filters
                    .iter()
                    .map(|(column, condition)| format!("{}={}", column, urlencoding::encode(condition))),
            )
            .collect::<Vec<_>>()
            .join("&");

        let url = format!("{}?{}", self.table_url(table), query);

        tracing::debug!("Querying listing store: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ListingStoreError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ListingStoreError::NotFound(format!("table {}", table)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Listing store query on {} failed: {} - {}", table, status, body);
            return Err(ListingStoreError::ApiError(format!("Query on {} failed: {}", table, status)));
        }

        let json: Value = response.json().await?;

        match json {
            Value::Array(rows) => Ok(rows),
            _ => Err(ListingStoreError::InvalidResponse("Expected an array of rows".into())),
        }
    }

    /// Fetch exactly one row by id
    async fn fetch_one<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<T, ListingStoreError> {
        let rows = self
            .fetch_rows(table, &[("id".to_string(), format!("eq.{}", id))])
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ListingStoreError::NotFound(format!("{} {}", table, id)))?;

        serde_json::from_value(row)
            .map_err(|e| ListingStoreError::InvalidResponse(format!("Failed to parse {} {}: {}", table, id, e)))
    }

    /// Fetch a listing by id
    pub async fn get_listing(&self, id: &str) -> Result<ListingRecord, ListingStoreError> {
        self.fetch_one(&self.tables.listings, id).await
    }

    /// Fetch saved search criteria by id
    pub async fn get_criteria(&self, id: &str) -> Result<SearchCriteria, ListingStoreError> {
        self.fetch_one(&self.tables.criteria, id).await
    }

    /// List active listings, optionally excluding one id
    ///
    /// Rows that fail to deserialize are skipped rather than failing the batch.
    pub async fn list_candidates(
        &self,
        exclude_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ListingRecord>, ListingStoreError> {
        let mut filters = vec![
            ("status".to_string(), format!("eq.{}", self.tables.active_status)),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(id) = exclude_id {
            filters.push(("id".to_string(), format!("neq.{}", id)));
        }

        let rows = self.fetch_rows(&self.tables.listings, &filters).await?;
        let total = rows.len();

        let listings: Vec<ListingRecord> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .filter(|listing: &ListingRecord| {
                exclude_id.is_none() || listing.id.as_deref() != exclude_id
            })
            .collect();

        if listings.len() < total {
            tracing::warn!("Skipped {} malformed listing rows", total - listings.len());
        }
        tracing::debug!("Fetched {} candidate listings", listings.len());

        Ok(listings)
    }
}
