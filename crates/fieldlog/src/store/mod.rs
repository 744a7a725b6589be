//! Record stores.
//!
//! Every backend implements [`RecordStore`]: select-all, a single create
//! operation, and delete-by-id. Three backends exist:
//!
//! - [`RestStore`]: the hosted `user_details` table behind a PostgREST API.
//! - [`FormEndpointStore`]: inserts through a bespoke multipart endpoint,
//!   with reads and deletes delegated to another store.
//! - [`LocalStore`]: an `SQLite` database on disk.

mod form;
mod local;
mod rest;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{Config, MediaBackend, StoreBackend};
use crate::error::{Error, Result};
use crate::media::{CloudinaryMedia, LocalMedia, MediaStore, Photo};
use crate::record::{NewRecord, Record, RecordId};

pub use form::FormEndpointStore;
pub use local::LocalStore;
pub use rest::RestStore;

/// User agent sent with every request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A table of submitted records.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether [`create`](Self::create) accepts the photo inline.
    ///
    /// Stores that don't need the photo uploaded to the media store first,
    /// and its reference placed in [`NewRecord::image`].
    fn accepts_inline_photo(&self) -> bool {
        false
    }

    /// Fetch every record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the request or is unreachable.
    async fn list(&self) -> Result<Vec<Record>>;

    /// Insert a record and return it with its store-assigned id and
    /// timestamp.
    ///
    /// `photo` is only passed to stores that
    /// [accept inline photos](Self::accepts_inline_photo).
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the insert or is unreachable.
    async fn create(&self, record: &NewRecord, photo: Option<&Photo>) -> Result<Record>;

    /// Delete the record with `id`. Deleting a missing id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the request or is unreachable.
    async fn delete(&self, id: &RecordId) -> Result<()>;
}

/// Build the shared HTTP client.
///
/// No timeout is set; transport defaults apply.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// Open the record store selected by `config`.
///
/// # Errors
///
/// Returns an error if required settings are missing or the local database
/// cannot be opened.
pub fn open_store(config: &Config, client: &reqwest::Client) -> Result<Arc<dyn RecordStore>> {
    debug!("Opening {:?} record store", config.store.backend);
    match config.store.backend {
        StoreBackend::Local => Ok(Arc::new(LocalStore::open(config.database_path())?)),
        StoreBackend::Rest => Ok(Arc::new(rest_store(config, client)?)),
        StoreBackend::Form => {
            let endpoint = required(config.store.form_endpoint.as_deref(), "store.form_endpoint")?;
            let table = Arc::new(rest_store(config, client)?);
            Ok(Arc::new(FormEndpointStore::new(
                client.clone(),
                endpoint,
                table,
            )?))
        }
    }
}

/// Open the media store selected by `config`.
///
/// # Errors
///
/// Returns an error if required settings are missing or the media directory
/// cannot be created.
pub fn open_media(config: &Config, client: &reqwest::Client) -> Result<Arc<dyn MediaStore>> {
    debug!("Opening {:?} media store", config.media.backend);
    match config.media.backend {
        MediaBackend::Local => Ok(Arc::new(LocalMedia::open(config.media_dir())?)),
        MediaBackend::Cloudinary => Ok(Arc::new(CloudinaryMedia::new(
            client.clone(),
            &config.media.api_base,
            required(config.media.cloud_name.as_deref(), "media.cloud_name")?,
            required(config.media.upload_preset.as_deref(), "media.upload_preset")?,
            config.media.cdn_base.clone(),
        )?)),
    }
}

fn rest_store(config: &Config, client: &reqwest::Client) -> Result<RestStore> {
    RestStore::new(
        client.clone(),
        required(config.store.url.as_deref(), "store.url")?,
        required(config.store.api_key.as_deref(), "store.api_key")?,
        &config.store.table,
    )
}

fn required<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::config(format!("{key} is required")))
}

/// Turn a non-success response into [`Error::StoreRejected`].
pub(crate) async fn check_status(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("no reason").to_string()
    } else {
        body
    };
    Err(Error::store_rejected(operation, status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_local_store_and_media() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.database_path = Some(dir.path().join("records.db"));
        config.media.media_dir = Some(dir.path().join("media"));

        let client = http_client().unwrap();
        let store = open_store(&config, &client).unwrap();
        let media = open_media(&config, &client).unwrap();

        assert_eq!(store.name(), "local");
        assert!(!store.accepts_inline_photo());
        assert_eq!(media.name(), "local");
        assert!(dir.path().join("media").is_dir());
    }

    #[test]
    fn test_open_rest_store_requires_url() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Rest;

        let client = http_client().unwrap();
        let err = open_store(&config, &client).unwrap_err();
        assert!(err.to_string().contains("store.url"));
    }

    #[test]
    fn test_open_form_store() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Form;
        config.store.url = Some("https://project.supabase.co".to_string());
        config.store.api_key = Some("anon".to_string());
        config.store.form_endpoint = Some("http://127.0.0.1:3000/sendData".to_string());

        let client = http_client().unwrap();
        let store = open_store(&config, &client).unwrap();
        assert_eq!(store.name(), "form");
        assert!(store.accepts_inline_photo());
    }

    #[test]
    fn test_open_cloudinary_media() {
        let mut config = Config::default();
        config.media.backend = MediaBackend::Cloudinary;
        config.media.cloud_name = Some("demo".to_string());
        config.media.upload_preset = Some("unsigned".to_string());

        let client = http_client().unwrap();
        let media = open_media(&config, &client).unwrap();
        assert_eq!(media.name(), "cloudinary");
        assert_eq!(
            media.base_url(),
            "https://res.cloudinary.com/demo/image/upload"
        );
    }
}
