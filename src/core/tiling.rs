use crate::core::filter::filter_nonempty;
use crate::io::raster::{create_byte_dataset, reproject_nearest, set_alpha_band};
use crate::types::{BoundingBox, BrowseError, BrowseResult, GeoTransform, TileCoordinate};
use gdal::raster::RasterCreationOption;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::Dataset;
use std::path::{Path, PathBuf};

/// Deepest zoom level of the browse tile pyramid
pub const MAX_ZOOM: u8 = 11;

/// Tile width in pixels at `MAX_ZOOM`
pub const BASE_TILE_SIZE: usize = 320;

/// Identifier of the tile matrix set, used in tile file names
pub const TILE_MATRIX_SET: &str = "WGS1984Quad";

/// EPSG code of every rendered tile
pub const TILE_EPSG: u32 = 4326;

/// Corner nudge keeping tiles that only touch the footprint edge out
const LL_EPSILON: f64 = 1e-11;

/// Band 4 is left undefined at creation so reprojection copies it like a
/// data band; it is flagged as alpha once the tile is rendered.
pub const TILE_CREATION_OPTIONS: [RasterCreationOption<'static>; 4] = [
    RasterCreationOption { key: "COMPRESS", value: "LZW" },
    RasterCreationOption { key: "TILED", value: "YES" },
    RasterCreationOption { key: "PHOTOMETRIC", value: "RGB" },
    RasterCreationOption { key: "BIGTIFF", value: "IF_SAFER" },
];

/// The global WGS1984Quad tile matrix set.
///
/// Origin at (-180, 90); zoom `z` has `2^(z+1)` columns by `2^z` rows of
/// square tiles `180 / 2^z` degrees wide. Tile pixel dimensions grow as the
/// zoom shrinks so every level shares one ground sample distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs1984Quad;

impl Wgs1984Quad {
    pub fn validate_zoom(zoom: u8) -> BrowseResult<()> {
        if zoom > MAX_ZOOM {
            return Err(BrowseError::InvalidZoom { zoom, max: MAX_ZOOM });
        }
        Ok(())
    }

    /// Matrix dimensions (columns, rows) at a zoom level
    pub fn matrix_size(zoom: u8) -> (u32, u32) {
        (1u32 << (zoom + 1), 1u32 << zoom)
    }

    /// Width of one tile in degrees
    pub fn tile_span(zoom: u8) -> f64 {
        180.0 / f64::from(1u32 << zoom)
    }

    /// Tile width in pixels: `320 * 2^(11 - zoom)`
    pub fn tile_size(zoom: u8) -> usize {
        BASE_TILE_SIZE << (MAX_ZOOM - zoom.min(MAX_ZOOM))
    }

    /// Ground sample distance in degrees, identical at every zoom
    pub fn pixel_size(zoom: u8) -> f64 {
        Self::tile_span(zoom) / Self::tile_size(zoom) as f64
    }

    pub fn tile_bounds(tile: &TileCoordinate) -> BoundingBox {
        let span = Self::tile_span(tile.z);
        let min_lon = -180.0 + f64::from(tile.x) * span;
        let max_lat = 90.0 - f64::from(tile.y) * span;
        BoundingBox {
            min_lon,
            max_lon: min_lon + span,
            min_lat: max_lat - span,
            max_lat,
        }
    }

    pub fn tile_geo_transform(tile: &TileCoordinate) -> GeoTransform {
        let bounds = Self::tile_bounds(tile);
        GeoTransform::north_up(bounds.min_lon, bounds.max_lat, Self::pixel_size(tile.z))
    }

    /// Every tile intersecting a lon/lat bounding box, truncated to the
    /// matrix extent. Ordered by column, then row.
    pub fn tiles(bbox: &BoundingBox, zoom: u8) -> BrowseResult<Vec<TileCoordinate>> {
        Self::validate_zoom(zoom)?;

        let west = bbox.min_lon.max(-180.0);
        let east = bbox.max_lon.min(180.0);
        let south = bbox.min_lat.max(-90.0);
        let north = bbox.max_lat.min(90.0);
        if west >= east || south >= north {
            return Ok(Vec::new());
        }

        let span = Self::tile_span(zoom);
        let (cols, rows) = Self::matrix_size(zoom);
        let column = |lon: f64| (((lon + 180.0) / span).floor().max(0.0) as u32).min(cols - 1);
        let row = |lat: f64| (((90.0 - lat) / span).floor().max(0.0) as u32).min(rows - 1);

        let (min_x, max_x) = (column(west + LL_EPSILON), column(east - LL_EPSILON));
        let (min_y, max_y) = (row(north - LL_EPSILON), row(south + LL_EPSILON));

        Ok((min_x..=max_x)
            .flat_map(|x| (min_y..=max_y).map(move |y| TileCoordinate { x, y, z: zoom }))
            .collect())
    }
}

/// Lon/lat footprint of a raster dataset
pub fn geographic_footprint(dataset: &Dataset) -> BrowseResult<BoundingBox> {
    let (width, height) = dataset.raster_size();
    let bounds = GeoTransform::from_gdal(&dataset.geo_transform()?).bounds(width, height);

    let source = dataset.spatial_ref()?;
    if source.is_geographic() {
        return Ok(bounds);
    }

    // A PROJ string keeps the traditional lon/lat axis order
    let target = SpatialRef::from_proj4(crate::io::raster::WGS84_LONGLAT)?;
    let transform = CoordTransform::new(&source, &target)?;
    let corners = [bounds.min_lon, bounds.min_lat, bounds.max_lon, bounds.max_lat];
    let [min_lon, min_lat, max_lon, max_lat] = transform.transform_bounds(&corners, 21)?;
    Ok(BoundingBox { min_lon, max_lon, min_lat, max_lat })
}

/// Name of a tile file: `{base}_WGS1984Quad_x{x}y{y}z{z}.tif`
pub fn tile_filename(base_name: &str, tile: &TileCoordinate) -> String {
    format!("{}_{}_{}.tif", base_name, TILE_MATRIX_SET, tile)
}

/// Cuts browse composites into WGS1984Quad tiles
pub struct TileGenerator {
    output_dir: PathBuf,
}

impl TileGenerator {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Render every tile covering the composite at `zoom` and return the
    /// ones holding valid data. Rejected tiles are removed from disk.
    pub fn tile_image(&self, composite_path: &Path, zoom: u8) -> BrowseResult<Vec<PathBuf>> {
        Wgs1984Quad::validate_zoom(zoom)?;
        log::info!("Tiling {} at zoom {}", composite_path.display(), zoom);

        let source = Dataset::open(composite_path)?;
        let footprint = geographic_footprint(&source)?;
        log::debug!("Footprint: {:?}", footprint);

        let tiles = Wgs1984Quad::tiles(&footprint, zoom)?;
        log::info!(
            "{} candidate tiles of {} px",
            tiles.len(),
            Wgs1984Quad::tile_size(zoom)
        );

        let base_name = composite_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                BrowseError::InvalidFormat(format!("No file stem in {}", composite_path.display()))
            })?;

        let mut rendered = Vec::with_capacity(tiles.len());
        for tile in &tiles {
            rendered.push(self.render_tile(&source, base_name, tile)?);
        }

        let kept = filter_nonempty(&rendered)?;
        for path in rendered.iter().filter(|path| !kept.contains(path)) {
            std::fs::remove_file(path)?;
        }
        Ok(kept)
    }

    fn render_tile(
        &self,
        source: &Dataset,
        base_name: &str,
        tile: &TileCoordinate,
    ) -> BrowseResult<PathBuf> {
        let path = self.output_dir.join(tile_filename(base_name, tile));
        log::debug!("Rendering tile {} -> {}", tile, path.display());

        let size = Wgs1984Quad::tile_size(tile.z);
        let band_count = source.raster_count() as usize;
        let destination = create_byte_dataset(
            &path,
            (size, size),
            band_count,
            &Wgs1984Quad::tile_geo_transform(tile),
            &SpatialRef::from_epsg(TILE_EPSG)?,
            &TILE_CREATION_OPTIONS,
        )?;
        reproject_nearest(source, &destination)?;
        set_alpha_band(&destination, band_count)?;
        Ok(path)
    }
}
