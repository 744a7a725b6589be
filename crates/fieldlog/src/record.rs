//! Core record types for fieldlog.
//!
//! This module defines the data structures exchanged with the record store:
//! stored [`Record`]s, the [`NewRecord`] payload used to create them, and the
//! [`Coordinates`] attached to each one.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder latitude used until the device reports a fix.
pub const PLACEHOLDER_LATITUDE: f64 = 37.788_25;

/// Placeholder longitude used until the device reports a fix.
pub const PLACEHOLDER_LONGITUDE: f64 = -122.4324;

/// Opaque identifier assigned by the record store.
///
/// Stores may hand out integers or strings; both are held as text and
/// compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(id) => Self(id.to_string()),
            RawId::Text(id) => Self(id),
        })
    }
}

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90 to 90.
    pub latitude: f64,
    /// Longitude, -180 to 180.
    pub longitude: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// The coordinate shown before any device fix is available.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_LATITUDE, PLACEHOLDER_LONGITUDE)
    }

    /// Whether both components are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl Default for Coordinates {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// A record as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier.
    pub id: RecordId,

    /// Name of the person submitting.
    pub name: String,

    /// Contact email.
    pub email: String,

    /// Job title or role.
    pub designation: String,

    /// Free-text observation.
    pub description: String,

    /// Latitude in decimal degrees.
    #[serde(deserialize_with = "de_degrees")]
    pub latitude: f64,

    /// Longitude in decimal degrees.
    #[serde(deserialize_with = "de_degrees")]
    pub longitude: f64,

    /// Absolute image URL, media path fragment, or nothing.
    #[serde(default)]
    pub image: Option<String>,

    /// Store-assigned creation time.
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// The record's position.
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Payload for creating a record.
///
/// Built from a validated draft; `image` already holds the media reference
/// when a photo was uploaded ahead of the insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    /// Name of the person submitting.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Job title or role.
    pub designation: String,
    /// Free-text observation.
    pub description: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Media reference for the attached photo.
    pub image: Option<String>,
}

/// Layouts accepted for timestamps without an offset, read as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a store timestamp.
///
/// Accepts RFC 3339, the space-separated form with a short offset that
/// Postgres prints (`2024-03-05 10:15:30.12+00`), and offset-less
/// timestamps, which are taken as UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(timestamp) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(timestamp.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {text:?}")))
}

/// Accept degrees as a JSON number or a numeric string.
///
/// Multipart endpoints store every field as text, so rows written through
/// them come back with quoted coordinates.
fn de_degrees<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDegrees {
        Number(f64),
        Text(String),
    }

    match RawDegrees::deserialize(deserializer)? {
        RawDegrees::Number(value) => Ok(value),
        RawDegrees::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
