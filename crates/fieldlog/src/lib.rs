//! `fieldlog` - Field data collection client
//!
//! This library provides record capture, listing and report upload against a
//! hosted record table and image CDN, with a local `SQLite` store for offline
//! use.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod listing;
pub mod logging;
pub mod media;
pub mod record;
pub mod report;
pub mod store;
pub mod validation;

pub use capture::{CaptureFlow, RecordDraft};
pub use config::Config;
pub use device::{FixedLocation, LocationProvider};
pub use error::{Error, Result};
pub use listing::{Confirm, DeleteOutcome, Listing};
pub use logging::init_logging;
pub use media::{MediaStore, Photo};
pub use record::{Coordinates, NewRecord, Record, RecordId};
pub use report::{ReportDraft, ReportUploader};
pub use store::{RecordStore, open_media, open_store};
pub use validation::ValidationError;
