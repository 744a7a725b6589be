//! Report upload.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::store::check_status;
use crate::validation::{require, require_email, ValidationError};

/// MIME type sent for report files.
pub const PDF_MIME: &str = "application/pdf";

/// A picked report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    /// Where the file was picked from.
    pub path: PathBuf,
    /// File name sent with the upload.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// Read a report file from disk.
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
        Ok(Self::from_bytes(path, bytes))
    }

    /// Wrap bytes already in memory.
    #[must_use]
    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map_or_else(|| "report.pdf".to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            path,
            file_name,
            bytes,
        }
    }

    /// Whether the file name has a `.pdf` extension, in any case.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

/// Unvalidated report input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDraft {
    /// Name of the person reporting.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Project the report belongs to.
    pub project: String,
    /// Report date.
    pub date: NaiveDate,
    /// The PDF being uploaded.
    pub file: Option<ReportFile>,
}

impl ReportDraft {
    /// Check the fields in form order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] for the first invalid field.
    pub fn validate(&self) -> std::result::Result<&ReportFile, ValidationError> {
        require(&self.name, ValidationError::MissingName)?;
        require_email(&self.email)?;
        require(&self.project, ValidationError::MissingProject)?;
        let file = self.file.as_ref().ok_or(ValidationError::MissingFile)?;
        if !file.is_pdf() {
            return Err(ValidationError::NotPdf {
                file_name: file.file_name.clone(),
            });
        }
        Ok(file)
    }

    /// The date as sent on the wire.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    fn form(&self, file: &ReportFile) -> Result<Form> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(PDF_MIME)?;
        Ok(Form::new()
            .text("name", self.name.clone())
            .text("email", self.email.clone())
            .text("project", self.project.clone())
            .text("date", self.date_string())
            .part("file", part))
    }
}

/// Where a report ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportReceipt {
    /// Sent to the report endpoint.
    Uploaded,
    /// No endpoint configured; the report was only logged.
    Logged,
}

/// Sends reports to an optional endpoint.
#[derive(Debug, Clone)]
pub struct ReportUploader {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl ReportUploader {
    /// Create an uploader. With no endpoint, reports are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not a valid URL.
    pub fn new(client: reqwest::Client, endpoint: Option<&str>) -> Result<Self> {
        let endpoint = endpoint.map(Url::parse).transpose()?;
        Ok(Self { client, endpoint })
    }

    /// Validate and submit a report.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the endpoint failure.
    pub async fn submit(&self, draft: &ReportDraft) -> Result<ReportReceipt> {
        let file = draft.validate()?;

        let Some(endpoint) = &self.endpoint else {
            info!(
                name = %draft.name,
                email = %draft.email,
                project = %draft.project,
                date = %draft.date_string(),
                file = %file.file_name,
                bytes = file.bytes.len(),
                "Report received (no endpoint configured)"
            );
            return Ok(ReportReceipt::Logged);
        };

        debug!("POST {} (report {})", endpoint, file.file_name);
        let response = self
            .client
            .post(endpoint.clone())
            .multipart(draft.form(file)?)
            .send()
            .await?;
        check_status("report", response).await?;
        info!("Uploaded report {}", file.file_name);
        Ok(ReportReceipt::Uploaded)
    }
}
