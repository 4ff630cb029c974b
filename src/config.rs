//! Browse generation settings

use crate::core::normalize::{ClipPreset, ClipRanges};
use crate::core::tiling::MAX_ZOOM;
use crate::types::{BrowseError, BrowseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one browse run. Every field has a default so a config
/// file only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Named clip range configuration
    pub clip_preset: ClipPreset,
    /// Explicit clip ranges, taking precedence over `clip_preset`
    pub clip_ranges: Option<ClipRanges>,
    /// Warp the composite to WGS84 lon/lat at the browse pixel size
    pub warp: bool,
    /// Zoom level of the tiles produced
    pub zoom: u8,
    /// Keep downloaded sources and the full composite after tiling
    pub keep_intermediates: bool,
    /// Write the GIBS imagery metadata sidecar
    pub write_metadata: bool,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            clip_preset: ClipPreset::Standard,
            clip_ranges: None,
            warp: true,
            zoom: MAX_ZOOM,
            keep_intermediates: false,
            write_metadata: true,
        }
    }
}

impl BrowseConfig {
    /// Load settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> BrowseResult<Self> {
        log::debug!("Loading browse config from {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| BrowseError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BrowseResult<()> {
        if self.zoom > MAX_ZOOM {
            return Err(BrowseError::InvalidZoom { zoom: self.zoom, max: MAX_ZOOM });
        }
        Ok(())
    }

    /// Effective clip ranges
    pub fn clip_ranges(&self) -> ClipRanges {
        self.clip_ranges.unwrap_or_else(|| self.clip_preset.ranges())
    }
}
