//! Photo handling and the media store.
//!
//! A [`Photo`] is a picked image file. A [`MediaStore`] turns it into a
//! reference that is saved in a record's `image` column, and resolves such
//! references back into displayable URLs.
//!
//! References are either absolute `http(s)` URLs, which are shown as-is, or
//! path fragments that get the store's base URL prepended exactly once.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Extension assumed for files without one.
const DEFAULT_EXTENSION: &str = "jpg";

/// A picked photo, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Where the photo was picked from.
    pub source: PathBuf,
    /// Lowercase file extension.
    pub extension: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl Photo {
    /// Read a photo from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Error::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded photo {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(path, bytes))
    }

    /// Wrap bytes already in memory.
    #[must_use]
    pub fn from_bytes(source: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let source = source.into();
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
            .to_ascii_lowercase();
        Self {
            source,
            extension,
            bytes,
        }
    }

    /// Name the photo is uploaded under.
    #[must_use]
    pub fn upload_name(&self) -> String {
        format!("image.{}", self.extension)
    }

    /// MIME type derived from the extension.
    #[must_use]
    pub fn mime_type(&self) -> String {
        match self.extension.as_str() {
            "jpg" => "image/jpeg".to_string(),
            "svg" => "image/svg+xml".to_string(),
            other => format!("image/{other}"),
        }
    }

    /// Build a multipart file part for this photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME type is rejected by the HTTP client.
    pub fn to_part(&self) -> Result<Part> {
        Ok(Part::bytes(self.bytes.clone())
            .file_name(self.upload_name())
            .mime_str(&self.mime_type())?)
    }
}

/// Whether `reference` is already an absolute `http`/`https` URL.
#[must_use]
pub fn is_absolute_url(reference: &str) -> bool {
    Url::parse(reference).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Resolve an `image` column value into a displayable URL.
///
/// Blank or missing references have no URL. Absolute URLs pass through
/// unchanged. Fragments are joined to `base` with a single `/`, and a
/// fragment that already starts with `base` is not prefixed again.
#[must_use]
pub fn resolve_image_url(image: Option<&str>, base: &str) -> Option<String> {
    let image = image.map(str::trim).filter(|image| !image.is_empty())?;
    if is_absolute_url(image) {
        return Some(image.to_string());
    }

    let base = base.trim_end_matches('/');
    if let Some(rest) = image.strip_prefix(base) {
        if rest.is_empty() || rest.starts_with('/') {
            return Some(image.to_string());
        }
    }
    Some(format!("{base}/{}", image.trim_start_matches('/')))
}

/// Image hosting used for record photos.
#[async_trait]
pub trait MediaStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Base URL that path fragments are resolved against.
    fn base_url(&self) -> &str;

    /// Upload a photo and return the reference to store in the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    async fn upload(&self, photo: &Photo) -> Result<String>;

    /// Check that a resolved image URL can be loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageUnavailable`] if the image cannot be loaded.
    async fn probe(&self, url: &str) -> Result<()>;

    /// Resolve a record's `image` value against this store's base URL.
    fn resolve(&self, image: Option<&str>) -> Option<String> {
        resolve_image_url(image, self.base_url())
    }
}

/// Cloudinary upload response; only the fields used here.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    #[serde(default)]
    secure_url: Option<String>,
}

/// Cloudinary error envelope.
#[derive(Debug, Deserialize)]
struct UploadErrorResponse {
    error: UploadErrorBody,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

/// Unsigned uploads to a Cloudinary cloud.
///
/// The stored reference is the upload's `public_id`; display URLs are
/// `https://res.cloudinary.com/<cloud>/image/upload/<public_id>`.
#[derive(Debug, Clone)]
pub struct CloudinaryMedia {
    client: reqwest::Client,
    upload_url: Url,
    upload_preset: String,
    cdn_base: String,
}

impl CloudinaryMedia {
    /// Create a Cloudinary media store.
    ///
    /// `cdn_base` overrides the default delivery base for the cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload URL cannot be built.
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        cloud_name: &str,
        upload_preset: impl Into<String>,
        cdn_base: Option<String>,
    ) -> Result<Self> {
        let upload_url = Url::parse(&format!(
            "{}/{cloud_name}/image/upload",
            api_base.trim_end_matches('/')
        ))?;
        let cdn_base = cdn_base
            .unwrap_or_else(|| format!("https://res.cloudinary.com/{cloud_name}/image/upload"));
        Ok(Self {
            client,
            upload_url,
            upload_preset: upload_preset.into(),
            cdn_base: cdn_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MediaStore for CloudinaryMedia {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    fn base_url(&self) -> &str {
        &self.cdn_base
    }

    async fn upload(&self, photo: &Photo) -> Result<String> {
        let form = Form::new()
            .part("file", photo.to_part()?)
            .text("upload_preset", self.upload_preset.clone());

        debug!("Uploading {} to {}", photo.upload_name(), self.upload_url);
        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<UploadErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            return Err(Error::media_upload(status.as_u16(), message));
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(
            "Uploaded photo as {} ({})",
            uploaded.public_id,
            uploaded.secure_url.as_deref().unwrap_or("no url")
        );
        Ok(uploaded.public_id)
    }

    async fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Error::image_unavailable(url, e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::image_unavailable(url, response.status().to_string()))
        }
    }
}

/// Content-addressed photo directory.
///
/// Photos are written as `<blake3 hex>.<ext>`, so uploading the same bytes
/// twice yields the same reference and a single file.
#[derive(Debug, Clone)]
pub struct LocalMedia {
    dir: PathBuf,
    base: String,
}

impl LocalMedia {
    /// Open (and create if needed) a media directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or is not a
    /// valid file URL base.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        let dir = dir.canonicalize()?;
        let base = Url::from_directory_path(&dir)
            .map_err(|()| Error::internal(format!("{} is not an absolute path", dir.display())))?
            .to_string();
        Ok(Self {
            dir,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Directory holding the photos.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name a photo is stored under.
    #[must_use]
    pub fn content_name(photo: &Photo) -> String {
        format!("{}.{}", blake3::hash(&photo.bytes).to_hex(), photo.extension)
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        Url::parse(url).ok()?.to_file_path().ok()
    }
}

#[async_trait]
impl MediaStore for LocalMedia {
    fn name(&self) -> &'static str {
        "local"
    }

    fn base_url(&self) -> &str {
        &self.base
    }

    async fn upload(&self, photo: &Photo) -> Result<String> {
        let name = Self::content_name(photo);
        let path = self.dir.join(&name);
        if tokio::fs::try_exists(&path).await? {
            debug!("Photo {} already stored", name);
        } else {
            tokio::fs::write(&path, &photo.bytes).await?;
            info!("Stored photo {}", path.display());
        }
        Ok(name)
    }

    async fn probe(&self, url: &str) -> Result<()> {
        let Some(path) = self.path_for_url(url) else {
            return Err(Error::image_unavailable(url, "not a local file URL"));
        };
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(Error::image_unavailable(url, "not a file")),
            Err(e) => Err(Error::image_unavailable(url, e.to_string())),
        }
    }
}
