//! Detail-page link discovered on the listing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A municipality administration entry on the listing.
///
/// `url` is absolute and identifies the entry; two links with the same URL
/// are the same municipality whatever their display text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MunicipalityLink {
    /// Anchor text as shown on the listing
    pub display_text: String,

    /// Absolute detail-page URL
    pub url: String,
}

impl MunicipalityLink {
    pub fn new(display_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            url: url.into(),
        }
    }

    /// Load a saved link set from a JSON file.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save a link set as pretty JSON.
    pub fn save_all(links: &[Self], path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(links)?;
        fs::write(path, json)?;
        Ok(())
    }
}
