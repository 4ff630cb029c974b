use chrono::{TimeZone, Utc};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{DriverManager, Metadata};
use ndarray::Array2;
use s1browse::core::{create_metadata_xml, filter_nonempty, MAX_ZOOM};
use s1browse::{create_browse_tiles, BrowseConfig, BrowseError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_rtc_band(path: &Path, value: f32, with_times: bool) {
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let (width, height) = (120usize, 90usize);
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, width as isize, height as isize, 1)
        .unwrap();
    dataset
        .set_geo_transform(&[399_960.0, 30.0, 0.0, 4_200_000.0, 0.0, -30.0])
        .unwrap();
    dataset.set_spatial_ref(&SpatialRef::from_epsg(32611).unwrap()).unwrap();
    if with_times {
        dataset
            .set_metadata_item("ZERO_DOPPLER_START_TIME", "2024-01-13T02:08:16.123456Z", "")
            .unwrap();
        dataset
            .set_metadata_item("ZERO_DOPPLER_END_TIME", "2024-01-13T02:08:19.987654", "")
            .unwrap();
    }

    let data = Array2::from_shape_fn((height, width), |(r, c)| {
        if r < 10 {
            f32::NAN
        } else {
            value * (c as f32 + 1.0) / width as f32
        }
    });
    let mut band = dataset.rasterband(1).unwrap();
    let buffer = Buffer::new((width, height), data.iter().copied().collect());
    band.write((0, 0), (width, height), &buffer).unwrap();
}

fn write_granule(dir: &Path, with_times: bool) -> (PathBuf, PathBuf) {
    let co_path = dir.join("OPERA_L2_RTC-S1_PIPELINE_VV.tif");
    let cross_path = dir.join("OPERA_L2_RTC-S1_PIPELINE_VH.tif");
    write_rtc_band(&co_path, 0.12, with_times);
    write_rtc_band(&cross_path, 0.02, with_times);
    (co_path, cross_path)
}

#[test]
fn test_create_browse_tiles_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let temp_dir = TempDir::new().unwrap();
    let (co_path, cross_path) = write_granule(temp_dir.path(), true);

    let config = BrowseConfig::default();
    let outputs = create_browse_tiles(&co_path, &cross_path, temp_dir.path(), &config).unwrap();

    assert!(!outputs.tiles.is_empty());
    for tile in &outputs.tiles {
        let name = tile.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("OPERA_L2_RTC-S1_PIPELINE_rgb_WGS1984Quad_x"));
        assert!(name.ends_with(&format!("z{}.tif", MAX_ZOOM)));
    }
    assert_eq!(filter_nonempty(&outputs.tiles).unwrap(), outputs.tiles);

    // Caller inputs stay, the full composite does not
    assert!(co_path.exists() && cross_path.exists());
    assert!(!temp_dir.path().join("OPERA_L2_RTC-S1_PIPELINE_rgb.tif").exists());

    let metadata = outputs.metadata.unwrap();
    assert_eq!(metadata, temp_dir.path().join("OPERA_L2_RTC-S1_PIPELINE_rgb.xml"));
    let xml = std::fs::read_to_string(metadata).unwrap();
    assert!(xml.contains("<ProviderProductId>OPERA_L2_RTC-S1_PIPELINE_rgb</ProviderProductId>"));
    assert!(xml.contains("<DataDay>20240113</DataDay>"));
}

#[test]
fn test_keep_intermediates_keeps_composite() {
    let temp_dir = TempDir::new().unwrap();
    let (co_path, cross_path) = write_granule(temp_dir.path(), false);

    let config = BrowseConfig {
        keep_intermediates: true,
        write_metadata: false,
        zoom: 10,
        ..BrowseConfig::default()
    };
    let outputs = create_browse_tiles(&co_path, &cross_path, temp_dir.path(), &config).unwrap();

    assert!(outputs.metadata.is_none());
    assert!(!outputs.tiles.is_empty());
    assert!(temp_dir.path().join("OPERA_L2_RTC-S1_PIPELINE_rgb.tif").exists());
}

#[test]
fn test_invalid_zoom_rejected_before_processing() {
    let temp_dir = TempDir::new().unwrap();
    let config = BrowseConfig { zoom: 12, ..BrowseConfig::default() };
    let missing = temp_dir.path().join("missing_VV.tif");

    let result = create_browse_tiles(&missing, &missing, temp_dir.path(), &config);
    assert!(matches!(result, Err(BrowseError::InvalidZoom { zoom: 12, .. })));
}

#[test]
fn test_metadata_xml_from_source() {
    let temp_dir = TempDir::new().unwrap();
    let (co_path, _) = write_granule(temp_dir.path(), true);
    let browse_path = temp_dir.path().join("browse.tif");
    let produced = Utc.with_ymd_and_hms(2024, 6, 14, 6, 4, 32).unwrap();

    let metadata_path = create_metadata_xml(&co_path, &browse_path, produced).unwrap();
    assert_eq!(metadata_path, temp_dir.path().join("browse.xml"));

    let xml = std::fs::read_to_string(&metadata_path).unwrap();
    assert!(xml.contains("<ProviderProductId>browse</ProviderProductId>"));
    assert!(xml.contains("<ProductionDateTime>2024-06-14T06:04:32Z</ProductionDateTime>"));
    assert!(xml.contains("<DataStartDateTime>2024-01-13T02:08:16Z</DataStartDateTime>"));
    assert!(xml.contains("<DataEndDateTime>2024-01-13T02:08:19Z</DataEndDateTime>"));
}

#[test]
fn test_metadata_requires_acquisition_times() {
    let temp_dir = TempDir::new().unwrap();
    let (co_path, _) = write_granule(temp_dir.path(), false);

    let result = create_metadata_xml(&co_path, &temp_dir.path().join("browse.tif"), Utc::now());
    assert!(matches!(result, Err(BrowseError::Metadata(_))));
}
