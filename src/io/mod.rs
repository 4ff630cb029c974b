//! I/O modules for rasters, granule assets and product upload

pub mod raster;
pub mod granule;
pub mod upload;

pub use raster::Raster;
pub use granule::{CmrResolver, Downloader, GranuleAssets, GranuleResolver};
pub use upload::{S3Uploader, Uploader};
