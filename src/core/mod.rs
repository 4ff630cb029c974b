//! Core browse processing modules

pub mod normalize;
pub mod composite;
pub mod tiling;
pub mod filter;
pub mod metadata;

// Re-export main types
pub use normalize::{
    nan_percentile, normalize, normalize_with_range, ClipPreset, ClipRange, ClipRanges,
};
pub use composite::{composite, browse_filename, BrowseCompositor, BROWSE_PIXEL_SIZE};
pub use tiling::{tile_filename, TileGenerator, Wgs1984Quad, MAX_ZOOM, TILE_MATRIX_SET};
pub use filter::{filter_nonempty, has_valid_data};
pub use metadata::{create_metadata_xml, ImageryMetadata};
