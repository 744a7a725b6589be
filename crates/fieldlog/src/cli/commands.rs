//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::capture::RecordDraft;
use crate::error::Result;
use crate::media::Photo;
use crate::record::Coordinates;

/// Submit command arguments.
#[derive(Debug, Args)]
pub struct SubmitCommand {
    /// Name of the person submitting
    #[arg(long, default_value_t)]
    pub name: String,

    /// Contact email
    #[arg(long, default_value_t)]
    pub email: String,

    /// Job title or role
    #[arg(long, default_value_t)]
    pub designation: String,

    /// What was observed
    #[arg(long, default_value_t)]
    pub description: String,

    /// Photo to attach
    #[arg(short, long, value_name = "PATH")]
    pub photo: Option<PathBuf>,

    /// Latitude of the device fix
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the device fix
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl SubmitCommand {
    /// The device fix given on the command line, if any.
    #[must_use]
    pub fn fix(&self) -> Option<Coordinates> {
        self.lat
            .zip(self.lon)
            .map(|(latitude, longitude)| Coordinates::new(latitude, longitude))
    }

    /// The text fields as a draft, without a photo.
    #[must_use]
    pub fn draft(&self) -> RecordDraft {
        RecordDraft {
            name: self.name.clone(),
            email: self.email.clone(),
            designation: self.designation.clone(),
            description: self.description.clone(),
            photo: None,
        }
    }

    /// The full draft, photo included.
    ///
    /// The text fields are checked before the photo is read, so a bad form
    /// is reported as such even when the photo path is also wrong.
    ///
    /// # Errors
    ///
    /// Returns a validation error for the first bad field, or an error if
    /// the photo cannot be read.
    pub async fn load_draft(&self) -> Result<RecordDraft> {
        let mut draft = self.draft();
        draft.validate()?;
        if let Some(path) = &self.photo {
            draft.photo = Some(Photo::load(path).await?);
        }
        Ok(draft)
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Filter by name or designation (case-insensitive)
    #[arg(default_value = "")]
    pub query: String,

    /// Check that each image can be loaded
    #[arg(long)]
    pub check_images: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the record to delete
    pub id: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Name of the person reporting
    #[arg(long, default_value_t)]
    pub name: String,

    /// Contact email
    #[arg(long, default_value_t)]
    pub email: String,

    /// Project the report belongs to
    #[arg(long, default_value_t)]
    pub project: String,

    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// PDF file to upload
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
