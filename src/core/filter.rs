use crate::types::BrowseResult;
use gdal::Dataset;
use std::path::{Path, PathBuf};

/// True when the last band (validity mask) has at least one non-zero sample
pub fn has_valid_data<P: AsRef<Path>>(path: P) -> BrowseResult<bool> {
    let dataset = Dataset::open(path.as_ref())?;
    let (width, height) = dataset.raster_size();
    let mask_band = dataset.rasterband(dataset.raster_count())?;

    // Scan row by row so large tiles are never held in memory at once
    for row in 0..height {
        let line = mask_band.read_as::<u8>((0, row as isize), (width, 1), (width, 1), None)?;
        if line.data.iter().any(|&v| v != 0) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Keep only the tiles with valid data, in their original order.
///
/// Paths are returned unchanged and no file is touched; removing the
/// rejected files is up to the caller.
pub fn filter_nonempty<P: AsRef<Path>>(tile_paths: &[P]) -> BrowseResult<Vec<PathBuf>> {
    let mut kept = Vec::with_capacity(tile_paths.len());
    for path in tile_paths {
        if has_valid_data(path)? {
            kept.push(path.as_ref().to_path_buf());
        } else {
            log::debug!("Discarding empty tile {}", path.as_ref().display());
        }
    }
    log::info!("{} of {} tiles contain valid data", kept.len(), tile_paths.len());
    Ok(kept)
}
