//! s1browse: browse imagery for Sentinel-1 RTC backscatter
//!
//! Turns a dual-polarization OPERA RTC-S1 granule into a 4-band byte
//! composite (co-pol, cross-pol, co-pol, validity mask) and cuts it into
//! WGS1984Quad tiles for GIBS.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;
pub mod cli;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, BrowseError, BrowseResult, CompositeImage, GeoTransform, Polarization,
    TileCoordinate,
};
pub use config::BrowseConfig;
pub use crate::core::{
    composite, filter_nonempty, normalize, BrowseCompositor, ClipPreset, TileGenerator,
};
pub use pipeline::{create_browse_and_upload, create_browse_tiles, ProcessingContext};
