use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Interleaved browse composite (rows x cols x 4)
pub type CompositeImage = Array3<u8>;

/// Number of bands in a browse composite: co-pol, cross-pol, co-pol, mask
pub const COMPOSITE_BANDS: usize = 4;

/// Polarization channels of a dual-pol Sentinel-1 RTC product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl Polarization {
    /// True for the like-polarized channels (VV, HH)
    pub fn is_co_pol(&self) -> bool {
        matches!(self, Polarization::VV | Polarization::HH)
    }

    /// Match the polarization encoded in an RTC asset name, e.g. `..._VV.tif`
    pub fn from_asset_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".tif")?;
        [Polarization::VV, Polarization::VH, Polarization::HV, Polarization::HH]
            .into_iter()
            .find(|pol| stem.ends_with(&pol.to_string()))
    }
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform from an upper-left corner and a square pixel size
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_size: f64) -> Self {
        Self {
            top_left_x,
            pixel_width: pixel_size,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_size,
        }
    }

    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Extent covered by a `width` x `height` grid, in the transform's CRS units.
    ///
    /// Rotation terms are always zero for RTC products and are ignored.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let x0 = self.top_left_x;
        let x1 = self.top_left_x + self.pixel_width * width as f64;
        let y0 = self.top_left_y;
        let y1 = self.top_left_y + self.pixel_height * height as f64;
        BoundingBox {
            min_lon: x0.min(x1),
            max_lon: x0.max(x1),
            min_lat: y0.min(y1),
            max_lat: y0.max(y1),
        }
    }

    /// Compare two transforms allowing for float noise in the stored values
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// Cell of the global WGS1984Quad tile matrix set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl std::fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}y{}z{}", self.x, self.y, self.z)
    }
}

/// Error types for browse generation
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Warp failed: {0}")]
    Warp(String),

    #[error("Invalid zoom level {zoom}: must be between 0 and {max}")]
    InvalidZoom { zoom: u8, max: u8 },

    #[error("Input rasters do not share a grid: {0}")]
    GridMismatch(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Granule {0} not found")]
    GranuleNotFound(String),

    #[error("No {polarization} asset found for granule {granule}")]
    MissingAsset {
        granule: String,
        polarization: &'static str,
    },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Upload failed for {}: {reason}", path.display())]
    Upload { path: PathBuf, reason: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for browse operations
pub type BrowseResult<T> = Result<T, BrowseError>;
