//! Inserts through a bespoke multipart endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::{check_status, RecordStore};
use crate::error::{Error, Result};
use crate::media::Photo;
use crate::record::{NewRecord, Record, RecordId};

/// Store whose inserts go to a `POST /sendData`-style endpoint.
///
/// The endpoint takes every field as a text part plus an optional `image`
/// file part. It usually answers with the inserted row (or an array holding
/// it); when it only acknowledges the insert, the row is read back from
/// `table`. Listing and deletion are delegated to `table`.
#[derive(Debug, Clone)]
pub struct FormEndpointStore {
    client: reqwest::Client,
    endpoint: Url,
    table: Arc<dyn RecordStore>,
}

impl FormEndpointStore {
    /// Create a form endpoint store.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not a valid URL.
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        table: Arc<dyn RecordStore>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            table,
        })
    }

    /// Build the multipart body for a record.
    ///
    /// A media reference already present in `record.image` is sent as a text
    /// part when no photo is attached inline.
    ///
    /// # Errors
    ///
    /// Returns an error if the photo part cannot be built.
    pub fn form(record: &NewRecord, photo: Option<&Photo>) -> Result<Form> {
        let mut form = Form::new()
            .text("name", record.name.clone())
            .text("email", record.email.clone())
            .text("designation", record.designation.clone())
            .text("description", record.description.clone())
            .text("latitude", record.latitude.to_string())
            .text("longitude", record.longitude.to_string());

        if let Some(photo) = photo {
            form = form.part("image", photo.to_part()?);
        } else if let Some(image) = &record.image {
            form = form.text("image", image.clone());
        }
        Ok(form)
    }

    /// Find the newest row in the table holding `record`'s fields.
    async fn read_back(&self, record: &NewRecord) -> Result<Record> {
        self.table
            .list()
            .await?
            .into_iter()
            .filter(|stored| is_submitted(stored, record))
            .max_by_key(|stored| stored.created_at)
            .ok_or_else(|| {
                Error::unexpected_response(
                    "create",
                    "submission accepted but the row was neither echoed nor found in the table",
                )
            })
    }
}

/// Coordinates read back from the table match within this many degrees.
const COORDINATE_TOLERANCE: f64 = 1e-6;

/// Pull the inserted row out of the endpoint's reply.
///
/// Returns `Ok(None)` when the reply is only an acknowledgement such as
/// `{"message": "Data saved"}`. An object carrying an `id` is taken as a row.
fn parse_created(body: Value) -> Result<Option<Record>> {
    let row = match body {
        Value::Array(rows) => match rows.into_iter().next() {
            Some(row) => row,
            None => return Ok(None),
        },
        Value::Object(mut object) => match object.remove("data") {
            Some(data @ (Value::Object(_) | Value::Array(_))) => return parse_created(data),
            _ if object.contains_key("id") => Value::Object(object),
            _ => return Ok(None),
        },
        _ => return Ok(None),
    };
    serde_json::from_value(row)
        .map(Some)
        .map_err(|e| Error::unexpected_response("create", format!("malformed row: {e}")))
}

/// Whether a stored row holds the submitted fields.
fn is_submitted(stored: &Record, record: &NewRecord) -> bool {
    stored.name == record.name
        && stored.email == record.email
        && stored.designation == record.designation
        && stored.description == record.description
        && (stored.latitude - record.latitude).abs() < COORDINATE_TOLERANCE
        && (stored.longitude - record.longitude).abs() < COORDINATE_TOLERANCE
}

#[async_trait]
impl RecordStore for FormEndpointStore {
    fn name(&self) -> &'static str {
        "form"
    }

    fn accepts_inline_photo(&self) -> bool {
        true
    }

    async fn list(&self) -> Result<Vec<Record>> {
        self.table.list().await
    }

    async fn create(&self, record: &NewRecord, photo: Option<&Photo>) -> Result<Record> {
        debug!(
            "POST {} (multipart, photo: {})",
            self.endpoint,
            photo.is_some()
        );
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(Self::form(record, photo)?)
            .send()
            .await?;
        let text = check_status("create", response).await?.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        let created = match parse_created(body)? {
            Some(created) => created,
            None => {
                warn!("Form endpoint did not echo the row, reading it back from the table");
                self.read_back(record).await?
            }
        };
        info!("Created record {} via form endpoint", created.id);
        Ok(created)
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        self.table.delete(id).await
    }
}
