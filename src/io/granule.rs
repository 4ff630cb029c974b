use crate::types::{BrowseError, BrowseResult, Polarization};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CMR collection holding the OPERA RTC-S1 granules
pub const RTC_COLLECTION: &str = "OPERA_L2_RTC-S1_V1";

/// Default CMR search endpoint
pub const CMR_GRANULE_SEARCH_URL: &str = "https://cmr.earthdata.nasa.gov/search/granules.umm_json";

/// Download URLs for the two polarizations of one granule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleAssets {
    pub granule: String,
    pub co_pol_url: String,
    pub cross_pol_url: String,
}

impl GranuleAssets {
    /// Pick the co-pol and cross-pol GeoTIFFs out of a granule's links
    pub fn from_links<S: AsRef<str>>(granule: &str, links: &[S]) -> BrowseResult<Self> {
        let mut co_pol_url = None;
        let mut cross_pol_url = None;

        for link in links.iter().map(AsRef::as_ref) {
            match Polarization::from_asset_name(link) {
                Some(pol) if pol.is_co_pol() => {
                    co_pol_url = co_pol_url.or_else(|| Some(link.to_string()))
                }
                Some(_) => cross_pol_url = cross_pol_url.or_else(|| Some(link.to_string())),
                None => {}
            }
        }

        Ok(Self {
            granule: granule.to_string(),
            co_pol_url: co_pol_url.ok_or_else(|| BrowseError::MissingAsset {
                granule: granule.to_string(),
                polarization: "co-pol",
            })?,
            cross_pol_url: cross_pol_url.ok_or_else(|| BrowseError::MissingAsset {
                granule: granule.to_string(),
                polarization: "cross-pol",
            })?,
        })
    }
}

/// Resolves a granule identifier to its polarization assets
pub trait GranuleResolver {
    fn resolve(&self, granule: &str) -> BrowseResult<GranuleAssets>;
}

#[derive(Debug, Deserialize)]
struct CmrResponse {
    items: Vec<CmrItem>,
}

#[derive(Debug, Deserialize)]
struct CmrItem {
    umm: CmrUmm,
}

#[derive(Debug, Deserialize)]
struct CmrUmm {
    #[serde(rename = "RelatedUrls", default)]
    related_urls: Vec<CmrRelatedUrl>,
}

#[derive(Debug, Deserialize)]
struct CmrRelatedUrl {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Type", default)]
    url_type: String,
}

/// Granule lookup through the NASA CMR search API
pub struct CmrResolver {
    client: reqwest::blocking::Client,
    search_url: String,
    collection: String,
}

impl CmrResolver {
    pub fn new() -> BrowseResult<Self> {
        Self::with_endpoint(CMR_GRANULE_SEARCH_URL, RTC_COLLECTION)
    }

    pub fn with_endpoint(search_url: &str, collection: &str) -> BrowseResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BrowseError::Download {
                url: search_url.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            search_url: search_url.to_string(),
            collection: collection.to_string(),
        })
    }

    fn parse_links(body: &str) -> BrowseResult<Option<Vec<String>>> {
        let response: CmrResponse = serde_json::from_str(body)
            .map_err(|e| BrowseError::InvalidFormat(format!("Unexpected CMR response: {}", e)))?;

        Ok(response.items.into_iter().next().map(|item| {
            item.umm
                .related_urls
                .into_iter()
                .filter(|related| related.url_type == "GET DATA")
                .map(|related| related.url)
                .collect()
        }))
    }
}

impl GranuleResolver for CmrResolver {
    fn resolve(&self, granule: &str) -> BrowseResult<GranuleAssets> {
        log::info!("Searching {} for granule {}", self.collection, granule);

        let download_error = |reason: String| BrowseError::Download {
            url: self.search_url.clone(),
            reason,
        };
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("short_name", self.collection.as_str()), ("granule_ur", granule)])
            .send()
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!("CMR search failed: {}", response.status())));
        }
        let body = response.text().map_err(|e| download_error(e.to_string()))?;

        let links = Self::parse_links(&body)?.ok_or_else(|| {
            BrowseError::GranuleNotFound(format!("{} in collection {}", granule, self.collection))
        })?;
        log::debug!("Granule links: {:?}", links);

        GranuleAssets::from_links(granule, &links)
    }
}

/// Authenticated HTTP downloads into a working directory
pub struct Downloader {
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl Downloader {
    /// `token` is an Earthdata Login bearer token
    pub fn new(token: Option<String>) -> BrowseResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| BrowseError::Download {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client, token })
    }

    /// Uses `EARTHDATA_TOKEN` from the environment when set
    pub fn from_env() -> BrowseResult<Self> {
        Self::new(std::env::var("EARTHDATA_TOKEN").ok())
    }

    /// Download `url` to `working_dir/<last path segment>`
    pub fn download(&self, url: &str, working_dir: &Path) -> BrowseResult<PathBuf> {
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BrowseError::Download {
                url: url.to_string(),
                reason: "URL has no file name".to_string(),
            })?;
        let output_path = working_dir.join(filename);
        log::info!("Downloading {} -> {}", url, output_path.display());

        let download_error = |reason: String| BrowseError::Download {
            url: url.to_string(),
            reason,
        };
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request.send().map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }

        let mut file = std::fs::File::create(&output_path)?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|e| download_error(e.to_string()))?;
        file.flush()?;

        log::debug!("Downloaded {} bytes", bytes);
        Ok(output_path)
    }

    /// Fetch both polarizations, returning (co-pol, cross-pol) paths
    pub fn download_assets(
        &self,
        assets: &GranuleAssets,
        working_dir: &Path,
    ) -> BrowseResult<(PathBuf, PathBuf)> {
        let co_pol_path = self.download(&assets.co_pol_url, working_dir)?;
        let cross_pol_path = self.download(&assets.cross_pol_url, working_dir)?;
        Ok((co_pol_path, cross_pol_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANULE: &str = "OPERA_L2_RTC-S1_T035-073251-IW2_20240113T020816Z_20240113T113128Z_S1A_30_v1.0";

    #[test]
    fn test_assets_from_links() {
        let links = [
            format!("https://example.com/{0}/{0}_VH.tif", GRANULE),
            format!("https://example.com/{0}/{0}_mask.tif", GRANULE),
            format!("https://example.com/{0}/{0}_VV.tif", GRANULE),
            format!("https://example.com/{0}/{0}.h5", GRANULE),
        ];
        let assets = GranuleAssets::from_links(GRANULE, &links).unwrap();
        assert!(assets.co_pol_url.ends_with("_VV.tif"));
        assert!(assets.cross_pol_url.ends_with("_VH.tif"));
    }

    #[test]
    fn test_missing_polarization() {
        let links = [format!("https://example.com/{0}_VV.tif", GRANULE)];
        match GranuleAssets::from_links(GRANULE, &links) {
            Err(BrowseError::MissingAsset { polarization, .. }) => {
                assert_eq!(polarization, "cross-pol")
            }
            other => panic!("expected missing cross-pol, got {:?}", other),
        }

        let links = ["https://example.com/granule_HV.tif"];
        assert!(matches!(
            GranuleAssets::from_links("granule", &links),
            Err(BrowseError::MissingAsset { polarization: "co-pol", .. })
        ));
    }

    #[test]
    fn test_parse_cmr_response() {
        let body = r#"{
            "hits": 1,
            "items": [{
                "meta": {"concept-id": "G123"},
                "umm": {
                    "RelatedUrls": [
                        {"URL": "https://data.example/granule_VV.tif", "Type": "GET DATA"},
                        {"URL": "https://data.example/granule_VH.tif", "Type": "GET DATA"},
                        {"URL": "s3://bucket/granule_VV.tif", "Type": "GET DATA VIA DIRECT ACCESS"},
                        {"URL": "https://data.example/granule_BROWSE.png", "Type": "GET RELATED VISUALIZATION"}
                    ]
                }
            }]
        }"#;
        let links = CmrResolver::parse_links(body).unwrap().unwrap();
        assert_eq!(
            links,
            vec!["https://data.example/granule_VV.tif", "https://data.example/granule_VH.tif"]
        );

        let empty = CmrResolver::parse_links(r#"{"hits": 0, "items": []}"#).unwrap();
        assert!(empty.is_none());
    }
}
