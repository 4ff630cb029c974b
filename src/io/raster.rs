use crate::types::{BoundingBox, BrowseError, BrowseResult, CompositeImage, GeoTransform};
use gdal::raster::{Buffer, ColorInterpretation, GdalType, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, Axis};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;

/// PROJ definition of the browse target CRS
pub const WGS84_LONGLAT: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

/// Creation options shared by every browse GeoTIFF
pub const BROWSE_CREATION_OPTIONS: [RasterCreationOption<'static>; 2] = [
    RasterCreationOption { key: "COMPRESS", value: "LZW" },
    RasterCreationOption { key: "TILED", value: "YES" },
];

/// A georeferenced raster held fully in memory
#[derive(Debug, Clone)]
pub struct Raster<T> {
    pub bands: Vec<Array2<T>>,
    pub geo_transform: GeoTransform,
    /// CRS as WKT, empty when the source carries none
    pub projection: String,
}

impl<T: GdalType + Copy> Raster<T> {
    /// Read every band of a raster file
    pub fn read<P: AsRef<Path>>(path: P) -> BrowseResult<Self> {
        let dataset = Dataset::open(path.as_ref())?;
        let count = dataset.raster_count() as usize;
        let bands = (1..=count)
            .map(|index| read_band_data(&dataset, index))
            .collect::<BrowseResult<Vec<_>>>()?;
        log::debug!("Read {} band(s) from {}", count, path.as_ref().display());
        Self::from_dataset(&dataset, bands)
    }

    /// Read a single band (1-based) of a raster file
    pub fn read_band<P: AsRef<Path>>(path: P, index: usize) -> BrowseResult<Self> {
        let dataset = Dataset::open(path.as_ref())?;
        let band = read_band_data(&dataset, index)?;
        Self::from_dataset(&dataset, vec![band])
    }

    fn from_dataset(dataset: &Dataset, bands: Vec<Array2<T>>) -> BrowseResult<Self> {
        Ok(Self {
            bands,
            geo_transform: GeoTransform::from_gdal(&dataset.geo_transform()?),
            projection: dataset.projection(),
        })
    }
}

impl<T> Raster<T> {
    /// Raster dimensions as (width, height)
    pub fn size(&self) -> (usize, usize) {
        self.bands
            .first()
            .map(|band| (band.ncols(), band.nrows()))
            .unwrap_or((0, 0))
    }

    pub fn bounds(&self) -> BoundingBox {
        let (width, height) = self.size();
        self.geo_transform.bounds(width, height)
    }

    /// Fail unless `other` covers the same pixel grid in the same CRS
    pub fn ensure_same_grid<U>(&self, other: &Raster<U>) -> BrowseResult<()> {
        if self.size() != other.size() {
            return Err(BrowseError::GridMismatch(format!(
                "raster sizes differ: {:?} vs {:?}",
                self.size(),
                other.size()
            )));
        }

        let tolerance = self.geo_transform.pixel_width.abs() * 1e-6;
        if !self.geo_transform.approx_eq(&other.geo_transform, tolerance) {
            return Err(BrowseError::GridMismatch(format!(
                "geotransforms differ: {:?} vs {:?}",
                self.geo_transform, other.geo_transform
            )));
        }

        if !same_crs(&self.projection, &other.projection)? {
            return Err(BrowseError::GridMismatch("coordinate systems differ".to_string()));
        }
        Ok(())
    }
}

fn read_band_data<T: GdalType + Copy>(dataset: &Dataset, index: usize) -> BrowseResult<Array2<T>> {
    let (width, height) = dataset.raster_size();
    let rasterband = dataset.rasterband(index as isize)?;
    let band_data = rasterband.read_as::<T>((0, 0), (width, height), (width, height), None)?;

    Array2::from_shape_vec((height, width), band_data.data)
        .map_err(|e| BrowseError::InvalidFormat(format!("Failed to reshape band {}: {}", index, e)))
}

fn same_crs(a: &str, b: &str) -> BrowseResult<bool> {
    if a == b {
        return Ok(true);
    }
    if a.is_empty() || b.is_empty() {
        return Ok(false);
    }
    let a = SpatialRef::from_wkt(a)?;
    let b = SpatialRef::from_wkt(b)?;
    Ok(a == b)
}

/// Create an empty GeoTIFF of byte bands ready to be filled
pub fn create_byte_dataset<P: AsRef<Path>>(
    path: P,
    size: (usize, usize),
    band_count: usize,
    geo_transform: &GeoTransform,
    spatial_ref: &SpatialRef,
    options: &[RasterCreationOption<'_>],
) -> BrowseResult<Dataset> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (width, height) = size;

    let mut dataset = driver.create_with_band_type_with_options::<u8, _>(
        path.as_ref(),
        width as isize,
        height as isize,
        band_count as isize,
        options,
    )?;
    dataset.set_geo_transform(&geo_transform.to_gdal())?;
    dataset.set_spatial_ref(spatial_ref)?;
    Ok(dataset)
}

/// Write a `[rows, cols, bands]` composite as a multi-band byte GeoTIFF
pub fn write_composite<P: AsRef<Path>>(
    path: P,
    image: &CompositeImage,
    geo_transform: &GeoTransform,
    projection: &str,
    options: &[RasterCreationOption<'_>],
) -> BrowseResult<()> {
    log::info!("Writing {} band composite: {}", image.len_of(Axis(2)), path.as_ref().display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width, bands) = image.dim();

    let mut dataset = driver.create_with_band_type_with_options::<u8, _>(
        path.as_ref(),
        width as isize,
        height as isize,
        bands as isize,
        options,
    )?;
    dataset.set_geo_transform(&geo_transform.to_gdal())?;
    if !projection.is_empty() {
        dataset.set_projection(projection)?;
    }

    for (index, band) in image.axis_iter(Axis(2)).enumerate() {
        let mut rasterband = dataset.rasterband(index as isize + 1)?;
        let flat_data: Vec<u8> = band.iter().copied().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
    }
    Ok(())
}

/// Reproject a raster to WGS84 lon/lat at a fixed pixel size with the GDAL
/// warp utility. The destination is written as a tiled, LZW-compressed GeoTIFF.
pub fn warp_to_geographic<P: AsRef<Path>, Q: AsRef<Path>>(
    src_path: P,
    dst_path: Q,
    pixel_size: f64,
) -> BrowseResult<()> {
    log::info!(
        "Warping {} -> {} at {} deg",
        src_path.as_ref().display(),
        dst_path.as_ref().display(),
        pixel_size
    );

    let resolution = pixel_size.to_string();
    let resolution = resolution.as_str();
    let mut args: Vec<String> =
        ["-t_srs", WGS84_LONGLAT, "-tr", resolution, resolution, "-of", "GTiff"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();
    for option in &BROWSE_CREATION_OPTIONS {
        args.push("-co".to_string());
        args.push(format!("{}={}", option.key, option.value));
    }
    let c_args = args
        .into_iter()
        .map(CString::new)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BrowseError::Warp(e.to_string()))?;
    let mut argv: Vec<*mut c_char> = c_args.iter().map(|arg| arg.as_ptr() as *mut c_char).collect();
    argv.push(std::ptr::null_mut());

    let c_src = path_to_cstring(src_path.as_ref())?;
    let c_dst = path_to_cstring(dst_path.as_ref())?;

    // SAFETY: argv is null terminated and outlives the options object; every
    // handle obtained here is released before returning.
    unsafe {
        let options = gdal_sys::GDALWarpAppOptionsNew(argv.as_mut_ptr(), std::ptr::null_mut());
        if options.is_null() {
            return Err(BrowseError::Warp(last_gdal_error()));
        }

        let src_ds = gdal_sys::GDALOpen(c_src.as_ptr(), gdal_sys::GDALAccess::GA_ReadOnly);
        if src_ds.is_null() {
            gdal_sys::GDALWarpAppOptionsFree(options);
            return Err(BrowseError::Warp(last_gdal_error()));
        }

        let mut sources = [src_ds];
        let mut usage_error: c_int = 0;
        let dst_ds = gdal_sys::GDALWarp(
            c_dst.as_ptr(),
            std::ptr::null_mut(),
            1,
            sources.as_mut_ptr(),
            options,
            &mut usage_error,
        );
        gdal_sys::GDALWarpAppOptionsFree(options);
        gdal_sys::GDALClose(src_ds);

        if dst_ds.is_null() {
            return Err(BrowseError::Warp(last_gdal_error()));
        }
        gdal_sys::GDALClose(dst_ds);
    }
    Ok(())
}

/// Render `src` into the grid of `dst` with nearest-neighbour resampling.
/// Destination pixels not covered by the source keep their initial value.
///
/// A trailing alpha band on either side is treated by GDAL as coverage, not
/// data, so `dst` must not flag one before this call.
pub fn reproject_nearest(src: &Dataset, dst: &Dataset) -> BrowseResult<()> {
    // SAFETY: both handles stay valid for the lifetime of the borrowed datasets.
    let rv = unsafe {
        gdal_sys::GDALReprojectImage(
            src.c_dataset(),
            std::ptr::null(),
            dst.c_dataset(),
            std::ptr::null(),
            gdal_sys::GDALResampleAlg::GRA_NearestNeighbour,
            0.0,
            0.0,
            None,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    };
    if rv != gdal_sys::CPLErr::CE_None {
        return Err(BrowseError::Warp(last_gdal_error()));
    }
    Ok(())
}

/// Flag band `index` (1-based) of a writable dataset as alpha
pub fn set_alpha_band(dataset: &Dataset, index: usize) -> BrowseResult<()> {
    let mut band = dataset.rasterband(index as isize)?;
    band.set_color_interpretation(ColorInterpretation::AlphaBand)?;
    Ok(())
}

fn path_to_cstring(path: &Path) -> BrowseResult<CString> {
    CString::new(path.to_string_lossy().as_bytes())
        .map_err(|e| BrowseError::InvalidFormat(format!("Invalid path {}: {}", path.display(), e)))
}

fn last_gdal_error() -> String {
    // SAFETY: CPLGetLastErrorMsg returns a pointer to a thread-local, null
    // terminated buffer owned by GDAL.
    unsafe {
        let message = gdal_sys::CPLGetLastErrorMsg();
        if message.is_null() {
            return "unknown GDAL error".to_string();
        }
        CStr::from_ptr(message).to_string_lossy().into_owned()
    }
}
