//! Record listing.
//!
//! A [`Listing`] owns the local copy of the record set. It is filled by one
//! fetch, filtered in memory on every query change, and shrunk in place when
//! a delete succeeds. It is never re-queried to apply a filter.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::{resolve_image_url, MediaStore};
use crate::record::{Record, RecordId};
use crate::store::RecordStore;

/// A record with its image resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedRecord {
    /// The stored record.
    #[serde(flatten)]
    pub record: Record,
    /// Displayable image URL, if the record has an image.
    pub image_url: Option<String>,
}

impl ListedRecord {
    /// Resolve `record.image` against `cdn_base`.
    #[must_use]
    pub fn new(record: Record, cdn_base: &str) -> Self {
        let image_url = resolve_image_url(record.image.as_deref(), cdn_base);
        Self { record, image_url }
    }
}

/// Answers a yes/no question before a destructive action.
pub trait Confirm {
    /// Return `true` to proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// What a delete request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Confirmation was declined; nothing was sent.
    Cancelled,
    /// The store accepted the delete.
    Deleted,
}

/// Local copy of the record set plus the active query.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    records: Vec<ListedRecord>,
    query: String,
    cdn_base: String,
}

impl Listing {
    /// An empty listing resolving images against `cdn_base`.
    #[must_use]
    pub fn new(cdn_base: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            query: String::new(),
            cdn_base: cdn_base.into(),
        }
    }

    /// A listing holding `records`.
    #[must_use]
    pub fn from_records(records: Vec<Record>, cdn_base: impl Into<String>) -> Self {
        let mut listing = Self::new(cdn_base);
        listing.replace(records);
        listing
    }

    fn replace(&mut self, records: Vec<Record>) {
        self.records = records
            .into_iter()
            .map(|record| ListedRecord::new(record, &self.cdn_base))
            .collect();
    }

    /// Fetch the full record set, replacing the local copy.
    ///
    /// On failure the local copy is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the store failure.
    pub async fn refresh(&mut self, store: &dyn RecordStore) -> Result<usize> {
        let records = store.list().await?;
        debug!("Fetched {} records from {} store", records.len(), store.name());
        self.replace(records);
        Ok(self.records.len())
    }

    /// Set the filter query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// The active filter query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Every record in the local copy, unfiltered.
    #[must_use]
    pub fn records(&self) -> &[ListedRecord] {
        &self.records
    }

    /// Records matching the active query, in fetch order.
    #[must_use]
    pub fn visible(&self) -> Vec<&ListedRecord> {
        self.records
            .iter()
            .filter(|listed| matches_query(&listed.record, &self.query))
            .collect()
    }

    /// Delete a record after confirmation.
    ///
    /// The record leaves the local copy only once the store accepts the
    /// delete. Deleting an id the store no longer has is not an error.
    ///
    /// # Errors
    ///
    /// Returns the store failure; the local copy is unchanged.
    pub async fn delete(
        &mut self,
        store: &dyn RecordStore,
        id: &RecordId,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome> {
        if !confirm.confirm(&format!("Delete record {id}?")) {
            debug!("Delete of {} cancelled", id);
            return Ok(DeleteOutcome::Cancelled);
        }

        store.delete(id).await?;
        self.records.retain(|listed| &listed.record.id != id);
        info!("Removed record {} from listing", id);
        Ok(DeleteOutcome::Deleted)
    }

    /// Check every resolved image URL, returning those that failed.
    ///
    /// Failures are logged as warnings and never abort the listing.
    pub async fn broken_images(&self, media: &dyn MediaStore) -> Vec<RecordId> {
        let mut broken = Vec::new();
        for listed in &self.records {
            let Some(url) = &listed.image_url else {
                continue;
            };
            if let Err(e) = media.probe(url).await {
                warn!("Image for record {} not available: {}", listed.record.id, e);
                broken.push(listed.record.id.clone());
            }
        }
        broken
    }
}

/// Case-insensitive substring match on name or designation.
///
/// The empty query matches everything.
#[must_use]
pub fn matches_query(record: &Record, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    record.name.to_lowercase().contains(&query)
        || record.designation.to_lowercase().contains(&query)
}

/// Render a creation time as a long date, e.g. `January 5, 2024`.
#[must_use]
pub fn format_date(created_at: DateTime<Utc>) -> String {
    created_at.format("%B %-d, %Y").to_string()
}
