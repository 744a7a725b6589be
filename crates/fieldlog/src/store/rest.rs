//! Hosted record table behind a PostgREST API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, info};
use url::Url;

use super::{check_status, RecordStore};
use crate::error::{Error, Result};
use crate::media::Photo;
use crate::record::{NewRecord, Record, RecordId};

/// PostgREST store for one table.
///
/// Requests carry the project key both as `apikey` and as a bearer token.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    endpoint: Url,
    headers: HeaderMap,
}

impl RestStore {
    /// Create a store for `table` under the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the key contains characters
    /// not allowed in a header.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: &str,
        table: &str,
    ) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/rest/v1/{}",
            base_url.trim_end_matches('/'),
            table
        ))?;

        let key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::config("store.api_key contains invalid characters"))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| Error::config("store.api_key contains invalid characters"))?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            client,
            endpoint,
            headers,
        })
    }

    /// The table URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RecordStore for RestStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn list(&self) -> Result<Vec<Record>> {
        debug!("GET {}", self.endpoint);
        let response = self
            .client
            .get(self.endpoint.clone())
            .headers(self.headers.clone())
            .query(&[("select", "*")])
            .send()
            .await?;
        let records: Vec<Record> = check_status("list", response).await?.json().await?;
        debug!("Fetched {} records", records.len());
        Ok(records)
    }

    async fn create(&self, record: &NewRecord, _photo: Option<&Photo>) -> Result<Record> {
        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;
        let rows: Vec<Record> = check_status("create", response).await?.json().await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::unexpected_response("create", "no row returned"))?;
        info!("Created record {}", created.id);
        Ok(created)
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        debug!("DELETE {} id={}", self.endpoint, id);
        let response = self
            .client
            .delete(self.endpoint.clone())
            .headers(self.headers.clone())
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        check_status("delete", response).await?;
        info!("Deleted record {}", id);
        Ok(())
    }
}
