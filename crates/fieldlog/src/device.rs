//! Device location.
//!
//! The position attached to a record comes from a [`LocationProvider`].
//! When permission is refused or no fix can be produced, [`locate`] falls
//! back to a placeholder coordinate and logs a warning.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::Coordinates;

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The user allowed access.
    Granted,
    /// The user refused access.
    Denied,
}

/// Source of single-shot position fixes.
#[async_trait]
pub trait LocationProvider: Send + Sync + std::fmt::Debug {
    /// Ask for foreground location permission.
    async fn request_permission(&self) -> Permission;

    /// Take one position fix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFix`] if no position is available.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Provider reporting a fixed position, or none at all.
///
/// The CLI builds one from `--lat`/`--lon` or the `capture` config section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixedLocation {
    fix: Option<Coordinates>,
}

impl FixedLocation {
    /// A provider that always reports `fix`.
    #[must_use]
    pub fn new(fix: Coordinates) -> Self {
        Self { fix: Some(fix) }
    }

    /// A provider with no fix; permission is refused.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { fix: None }
    }

    /// A provider from an optional fix.
    #[must_use]
    pub fn from_option(fix: Option<Coordinates>) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Permission {
        if self.fix.is_some() {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn current_position(&self) -> Result<Coordinates> {
        match self.fix {
            Some(fix) if fix.is_valid() => Ok(fix),
            Some(fix) => Err(Error::NoFix(format!(
                "out of range ({}, {})",
                fix.latitude, fix.longitude
            ))),
            None => Err(Error::NoFix("no position reported".to_string())),
        }
    }
}

/// Request permission, then take one fix.
///
/// # Errors
///
/// Returns [`Error::PermissionDenied`] if permission is refused, or the
/// provider's error if no fix is produced.
pub async fn try_locate(provider: &dyn LocationProvider) -> Result<Coordinates> {
    if provider.request_permission().await == Permission::Denied {
        return Err(Error::PermissionDenied {
            permission: "location".to_string(),
        });
    }
    let fix = provider.current_position().await?;
    debug!("Position fix ({}, {})", fix.latitude, fix.longitude);
    Ok(fix)
}

/// Determine the position for a new record.
///
/// Never fails: a refused permission or failed fix yields `placeholder`.
pub async fn locate(provider: &dyn LocationProvider, placeholder: Coordinates) -> Coordinates {
    match try_locate(provider).await {
        Ok(fix) => fix,
        Err(e) => {
            warn!("{}, using placeholder position", e);
            placeholder
        }
    }
}
