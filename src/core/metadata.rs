//! GIBS imagery metadata sidecar for browse products

use crate::types::{BrowseError, BrowseResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use gdal::{Dataset, Metadata};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::{Path, PathBuf};

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
const GEORSS_NAMESPACE: &str = "http://www.georss.org/georss/10";
const START_TIME_KEY: &str = "ZERO_DOPPLER_START_TIME";
const END_TIME_KEY: &str = "ZERO_DOPPLER_END_TIME";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Contents of an `ImageryMetadata` document
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryMetadata {
    pub provider_product_id: String,
    pub production_time: DateTime<Utc>,
    pub data_start: NaiveDateTime,
    pub data_end: NaiveDateTime,
}

impl ImageryMetadata {
    pub fn to_xml(&self) -> BrowseResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        let root = BytesStart::new("ImageryMetadata")
            .with_attributes([("xmlns", ATOM_NAMESPACE), ("xmlns:georss", GEORSS_NAMESPACE)]);
        writer.write_event(Event::Start(root)).map_err(xml_error)?;

        let fields = [
            ("ProviderProductId", self.provider_product_id.clone()),
            ("ProductionDateTime", self.production_time.format(DATETIME_FORMAT).to_string()),
            ("DataStartDateTime", self.data_start.format(DATETIME_FORMAT).to_string()),
            ("DataEndDateTime", self.data_end.format(DATETIME_FORMAT).to_string()),
            ("DataDay", self.data_start.format("%Y%m%d").to_string()),
        ];
        for (tag, value) in &fields {
            writer.write_event(Event::Start(BytesStart::new(*tag))).map_err(xml_error)?;
            writer.write_event(Event::Text(BytesText::new(value))).map_err(xml_error)?;
            writer.write_event(Event::End(BytesEnd::new(*tag))).map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("ImageryMetadata")))
            .map_err(xml_error)?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| BrowseError::Metadata(format!("Non UTF-8 XML output: {}", e)))?;
        xml.push('\n');
        Ok(xml)
    }
}

fn xml_error(e: quick_xml::Error) -> BrowseError {
    BrowseError::Metadata(format!("Failed to write XML: {}", e))
}

/// Parse an RTC acquisition timestamp, with or without fractional seconds
/// and a trailing `Z`.
pub fn parse_acquisition_time(value: &str) -> BrowseResult<NaiveDateTime> {
    let trimmed = value.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| BrowseError::Metadata(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Gather the metadata fields from the co-pol source
pub fn read_imagery_metadata(
    co_pol_path: &Path,
    browse_path: &Path,
    production_time: DateTime<Utc>,
) -> BrowseResult<ImageryMetadata> {
    let dataset = Dataset::open(co_pol_path)?;
    let item = |key: &str| {
        dataset
            .metadata_item(key, "")
            .ok_or_else(|| {
                BrowseError::Metadata(format!("{} missing from {}", key, co_pol_path.display()))
            })
    };

    let provider_product_id = browse_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BrowseError::Metadata(format!("No file stem in {}", browse_path.display())))?
        .to_string();

    Ok(ImageryMetadata {
        provider_product_id,
        production_time,
        data_start: parse_acquisition_time(&item(START_TIME_KEY)?)?,
        data_end: parse_acquisition_time(&item(END_TIME_KEY)?)?,
    })
}

/// Write `<browse stem>.xml` next to the browse image
pub fn create_metadata_xml(
    co_pol_path: &Path,
    browse_path: &Path,
    production_time: DateTime<Utc>,
) -> BrowseResult<PathBuf> {
    let metadata = read_imagery_metadata(co_pol_path, browse_path, production_time)?;
    let metadata_path = browse_path.with_extension("xml");
    std::fs::write(&metadata_path, metadata.to_xml()?)?;
    log::info!("Imagery metadata written: {}", metadata_path.display());
    Ok(metadata_path)
}
