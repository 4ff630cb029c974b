//! Command-line interface for creating browse tiles of one RTC granule

use crate::config::BrowseConfig;
use crate::core::normalize::ClipPreset;
use crate::io::granule::{CmrResolver, Downloader};
use crate::io::upload::{S3Uploader, Uploader};
use crate::pipeline::{create_browse_and_upload, BrowseOutputs, ProcessingContext};
use crate::types::BrowseResult;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Clip range preset selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetArg {
    Standard,
    Gibs,
}

impl From<PresetArg> for ClipPreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Standard => ClipPreset::Standard,
            PresetArg::Gibs => ClipPreset::Gibs,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "s1browse")]
#[command(author, version, about = "Create GIBS browse tiles for an OPERA RTC-S1 granule")]
pub struct Cli {
    /// OPERA RTC-S1 granule to create browse tiles for
    #[arg(value_name = "GRANULE")]
    pub granule: String,

    /// S3 bucket for uploading the final products
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long, default_value = "")]
    pub bucket_prefix: String,

    /// Working directory for downloads and products (the current directory by default)
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Keep downloaded sources and the full composite
    #[arg(long)]
    pub keep_intermediates: bool,

    /// Tile zoom level (0-11)
    #[arg(long)]
    pub zoom: Option<u8>,

    /// Clip range preset
    #[arg(long, value_enum)]
    pub clip_preset: Option<PresetArg>,

    /// Composite in the source grid instead of warping to WGS84
    #[arg(long)]
    pub no_warp: bool,

    /// JSON settings file; command-line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Settings from the config file (or defaults) with flags applied
    pub fn browse_config(&self) -> BrowseResult<BrowseConfig> {
        let mut config = match &self.config {
            Some(path) => BrowseConfig::from_json_file(path)?,
            None => BrowseConfig::default(),
        };
        if let Some(zoom) = self.zoom {
            config.zoom = zoom;
        }
        if let Some(preset) = self.clip_preset {
            config.clip_preset = preset.into();
            config.clip_ranges = None;
        }
        if self.no_warp {
            config.warp = false;
        }
        if self.keep_intermediates {
            config.keep_intermediates = true;
        }
        config.validate()?;
        Ok(config)
    }

    /// Directory that receives downloads and products
    pub fn working_dir(&self) -> BrowseResult<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// Build the context and process the granule
    pub fn run(&self) -> BrowseResult<BrowseOutputs> {
        let config = self.browse_config()?;

        let uploader = match &self.bucket {
            Some(bucket) => {
                let s3 = S3Uploader::new(bucket, &self.bucket_prefix)?;
                Some(Box::new(s3) as Box<dyn Uploader>)
            }
            None => None,
        };

        let working_dir = self.working_dir()?;
        std::fs::create_dir_all(&working_dir)?;

        let ctx = ProcessingContext {
            resolver: Box::new(CmrResolver::new()?),
            downloader: Downloader::from_env()?,
            uploader,
            working_dir,
            config,
        };
        create_browse_and_upload(&self.granule, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "s1browse",
            "OPERA_L2_RTC-S1_T035-073251-IW2_20240113T020816Z_20240113T113128Z_S1A_30_v1.0",
            "--bucket",
            "browse-bucket",
            "--bucket-prefix",
            "rtc",
            "--zoom",
            "8",
            "--clip-preset",
            "gibs",
            "--no-warp",
        ]);
        assert_eq!(cli.bucket.as_deref(), Some("browse-bucket"));
        assert_eq!(cli.bucket_prefix, "rtc");

        let config = cli.browse_config().unwrap();
        assert_eq!(config.zoom, 8);
        assert_eq!(config.clip_preset, ClipPreset::Gibs);
        assert!(!config.warp);
        assert!(!config.keep_intermediates);
    }

    #[test]
    fn test_invalid_zoom_flag() {
        let cli = Cli::parse_from(["s1browse", "granule", "--zoom", "12"]);
        assert!(cli.browse_config().is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["s1browse", "granule"]);
        assert_eq!(cli.browse_config().unwrap(), BrowseConfig::default());
        assert!(cli.bucket.is_none());
    }

    #[test]
    fn test_working_dir_defaults_to_current_dir() {
        let cli = Cli::parse_from(["s1browse", "granule"]);
        assert_eq!(cli.working_dir().unwrap(), std::env::current_dir().unwrap());

        let cli = Cli::parse_from(["s1browse", "granule", "--working-dir", "/data/browse"]);
        assert_eq!(cli.working_dir().unwrap(), PathBuf::from("/data/browse"));
    }
}
