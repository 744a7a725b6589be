//! Record capture.
//!
//! A [`RecordDraft`] holds what the user typed plus an optional photo.
//! [`CaptureFlow::submit`] validates it, places the photo, and issues a
//! single create against the record store.

use std::sync::Arc;

use tracing::{debug, info};

use crate::device::{locate, LocationProvider};
use crate::error::Result;
use crate::media::{MediaStore, Photo};
use crate::record::{Coordinates, NewRecord, Record};
use crate::store::RecordStore;
use crate::validation::{require, require_email, ValidationError};

/// Unvalidated input for a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    /// Name of the person submitting.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Job title or role.
    pub designation: String,
    /// Free-text observation.
    pub description: String,
    /// Optional photo.
    pub photo: Option<Photo>,
}

impl RecordDraft {
    /// Check the text fields, stopping at the first failure.
    ///
    /// Fields are checked in form order: name, email, designation,
    /// description.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] for the first invalid field.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        require(&self.name, ValidationError::MissingName)?;
        require_email(&self.email)?;
        require(&self.designation, ValidationError::MissingDesignation)?;
        require(&self.description, ValidationError::MissingDescription)?;
        Ok(())
    }

    /// Build the create payload. Field text is sent as entered.
    #[must_use]
    pub fn to_new_record(&self, position: Coordinates, image: Option<String>) -> NewRecord {
        NewRecord {
            name: self.name.clone(),
            email: self.email.clone(),
            designation: self.designation.clone(),
            description: self.description.clone(),
            latitude: position.latitude,
            longitude: position.longitude,
            image,
        }
    }
}

/// Submits drafts to a record store.
#[derive(Debug, Clone)]
pub struct CaptureFlow {
    store: Arc<dyn RecordStore>,
    media: Arc<dyn MediaStore>,
    placeholder: Coordinates,
}

impl CaptureFlow {
    /// Create a capture flow.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        media: Arc<dyn MediaStore>,
        placeholder: Coordinates,
    ) -> Self {
        Self {
            store,
            media,
            placeholder,
        }
    }

    /// The position shown before a fix arrives.
    #[must_use]
    pub fn placeholder(&self) -> Coordinates {
        self.placeholder
    }

    /// Resolve the position for a submission, falling back to the placeholder.
    pub async fn locate(&self, provider: &dyn LocationProvider) -> Coordinates {
        locate(provider, self.placeholder).await
    }

    /// Validate and create a record.
    ///
    /// Nothing is sent when validation fails. Stores that accept inline
    /// photos receive the photo with the create; otherwise the photo is
    /// uploaded first and its reference stored in `image`. There is no
    /// retry: a failed upload or create abandons the submission.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the media or store failure.
    pub async fn submit(&self, draft: &RecordDraft, position: Coordinates) -> Result<Record> {
        draft.validate()?;

        let inline = self.store.accepts_inline_photo();
        let image = match (&draft.photo, inline) {
            (Some(photo), false) => {
                debug!("Uploading photo to {} media", self.media.name());
                Some(self.media.upload(photo).await?)
            }
            _ => None,
        };
        let photo = draft.photo.as_ref().filter(|_| inline);

        let record = draft.to_new_record(position, image);
        let created = self.store.create(&record, photo).await?;
        info!(
            "Submitted record {} to {} store",
            created.id,
            self.store.name()
        );
        Ok(created)
    }
}
