use crate::config::BrowseConfig;
use crate::core::normalize::{normalize_with_range, ClipRanges};
use crate::io::raster::{warp_to_geographic, write_composite, Raster, BROWSE_CREATION_OPTIONS};
use crate::types::{BrowseError, BrowseResult, CompositeImage, COMPOSITE_BANDS};
use ndarray::{stack, ArrayView2, Axis, Zip};
use std::path::{Path, PathBuf};

/// Browse ground sample distance in degrees (GIBS level 11 grid)
pub const BROWSE_PIXEL_SIZE: f64 = 2.74658203125e-4;

/// Suffix appended to the co-pol stem to name the browse image
pub const BROWSE_SUFFIX: &str = "_rgb.tif";

/// Build the `[rows, cols, 4]` browse composite:
/// co-pol, cross-pol, co-pol, validity mask.
pub fn composite(
    co_pol: ArrayView2<'_, f32>,
    cross_pol: ArrayView2<'_, f32>,
    ranges: &ClipRanges,
) -> BrowseResult<CompositeImage> {
    if co_pol.dim() != cross_pol.dim() {
        return Err(BrowseError::GridMismatch(format!(
            "co-pol is {:?} but cross-pol is {:?}",
            co_pol.dim(),
            cross_pol.dim()
        )));
    }

    let co = normalize_with_range(&co_pol, ranges.co_pol);
    let cross = normalize_with_range(&cross_pol, ranges.cross_pol);
    let mask = Zip::from(&co_pol)
        .and(&cross_pol)
        .map_collect(|co, cross| if co.is_nan() || cross.is_nan() { 0u8 } else { 255u8 });

    stack(Axis(2), &[co.view(), cross.view(), co.view(), mask.view()])
        .map_err(|e| BrowseError::InvalidFormat(format!("Failed to stack browse bands: {}", e)))
}

/// Name of the browse image for a co-pol asset: the stem without its
/// polarization suffix (e.g. `_VV`) followed by `_rgb.tif`.
pub fn browse_filename(co_pol_path: &Path) -> BrowseResult<String> {
    let stem = co_pol_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            BrowseError::InvalidFormat(format!("No file stem in {}", co_pol_path.display()))
        })?;

    let keep = stem.chars().count().saturating_sub(3);
    let base: String = stem.chars().take(keep).collect();
    Ok(format!("{}{}", base, BROWSE_SUFFIX))
}

/// Writes browse composites from co-pol/cross-pol RTC rasters
pub struct BrowseCompositor {
    ranges: ClipRanges,
    warp: bool,
    pixel_size: f64,
}

impl BrowseCompositor {
    pub fn new(config: &BrowseConfig) -> Self {
        Self {
            ranges: config.clip_ranges(),
            warp: config.warp,
            pixel_size: BROWSE_PIXEL_SIZE,
        }
    }

    /// Composite two single-band rasters into a browse GeoTIFF in `working_dir`.
    ///
    /// Inputs are never modified or removed. With warping enabled the
    /// intermediate un-warped file is removed once the warp succeeds.
    pub fn create_browse_image(
        &self,
        co_pol_path: &Path,
        cross_pol_path: &Path,
        working_dir: &Path,
    ) -> BrowseResult<PathBuf> {
        log::info!("Creating browse image from {}", co_pol_path.display());
        log::debug!("Cross-pol: {}", cross_pol_path.display());

        let co_pol = Raster::<f32>::read_band(co_pol_path, 1)?;
        let cross_pol = Raster::<f32>::read_band(cross_pol_path, 1)?;
        co_pol.ensure_same_grid(&cross_pol)?;

        let browse = composite(co_pol.bands[0].view(), cross_pol.bands[0].view(), &self.ranges)?;
        debug_assert_eq!(browse.dim().2, COMPOSITE_BANDS);

        let browse_path = working_dir.join(browse_filename(co_pol_path)?);

        if !self.warp {
            write_composite(
                &browse_path,
                &browse,
                &co_pol.geo_transform,
                &co_pol.projection,
                &BROWSE_CREATION_OPTIONS,
            )?;
            return Ok(browse_path);
        }

        let tmp_path = working_dir.join(format!(
            "{}.tmp.tif",
            browse_path.file_stem().and_then(|s| s.to_str()).unwrap_or("browse")
        ));
        write_composite(&tmp_path, &browse, &co_pol.geo_transform, &co_pol.projection, &[])?;
        warp_to_geographic(&tmp_path, &browse_path, self.pixel_size)?;
        std::fs::remove_file(&tmp_path)?;

        log::info!("Browse image written: {}", browse_path.display());
        Ok(browse_path)
    }
}
