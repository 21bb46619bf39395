//! Process-wide license state and product information.

use crate::error::{Error, Result};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Product name reported by [`about`].
pub const PRODUCT: &str = "folio";
/// Product family reported by [`about`].
pub const FAMILY: &str = "folio document engine";
/// Release date of this version.
pub const RELEASE_DATE: &str = "2026-09-30";

lazy_static! {
    static ref LICENSE: RwLock<Option<License>> = RwLock::new(None);
}

static EVALUATION_WARNED: AtomicBool = AtomicBool::new(false);

/// Contents of a license file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub licensee: String,
    pub product: String,
    /// Last valid day, `YYYY-MM-DD`
    pub expires: String,
}

impl License {
    /// Parse and check a license file's contents.
    pub fn from_json(json: &str) -> Result<Self> {
        let license: License = serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("malformed license file: {}", e)))?;
        license.validate()?;
        Ok(license)
    }

    fn validate(&self) -> Result<()> {
        if self.product != PRODUCT {
            return Err(Error::InvalidArgument(format!(
                "license is for '{}', not '{}'",
                self.product, PRODUCT
            )));
        }
        let expires = NaiveDate::parse_from_str(&self.expires, "%Y-%m-%d").map_err(|e| {
            Error::InvalidArgument(format!("license expiry '{}': {}", self.expires, e))
        })?;
        if expires < Utc::now().date_naive() {
            return Err(Error::InvalidArgument(format!(
                "license expired on {}",
                self.expires
            )));
        }
        Ok(())
    }
}

/// Product and license information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product: String,
    pub family: String,
    pub version: String,
    #[serde(rename = "releasedate")]
    pub release_date: String,
    pub producer: String,
    #[serde(rename = "islicensed")]
    pub is_licensed: bool,
}

/// Activate a license file for the whole process.
///
/// A failed activation leaves the previous license state in place.
pub fn set_license<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let license = License::from_json(&json)?;
    log::info!(
        "license for {} activated (expires {})",
        license.licensee,
        license.expires
    );
    *LICENSE.write() = Some(license);
    Ok(())
}

/// Whether a valid license is active.
pub fn is_licensed() -> bool {
    LICENSE.read().is_some()
}

/// Producer string written into saved documents.
pub fn producer() -> String {
    let base = format!("{} {}", PRODUCT, env!("CARGO_PKG_VERSION"));
    if is_licensed() {
        base
    } else {
        if !EVALUATION_WARNED.swap(true, Ordering::Relaxed) {
            log::warn!("no license set: output is marked as evaluation");
        }
        format!("{} (evaluation)", base)
    }
}

/// Product information.
pub fn about() -> ProductInfo {
    ProductInfo {
        product: PRODUCT.to_string(),
        family: FAMILY.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        release_date: RELEASE_DATE.to_string(),
        producer: producer(),
        is_licensed: is_licensed(),
    }
}
