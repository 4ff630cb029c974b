//! End-to-end browse generation for one granule

use crate::config::BrowseConfig;
use crate::core::composite::BrowseCompositor;
use crate::core::metadata::create_metadata_xml;
use crate::core::tiling::TileGenerator;
use crate::io::granule::{Downloader, GranuleResolver};
use crate::io::upload::Uploader;
use crate::types::BrowseResult;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Everything a run needs, passed in explicitly
pub struct ProcessingContext {
    pub resolver: Box<dyn GranuleResolver>,
    pub downloader: Downloader,
    pub uploader: Option<Box<dyn Uploader>>,
    pub working_dir: PathBuf,
    pub config: BrowseConfig,
}

/// Products of a browse run that were kept on disk
#[derive(Debug, Clone, Default)]
pub struct BrowseOutputs {
    pub tiles: Vec<PathBuf>,
    pub metadata: Option<PathBuf>,
}

/// Composite, tile and describe a pair of local co-pol/cross-pol rasters.
///
/// Inputs are left in place. The full composite is removed after tiling
/// unless `keep_intermediates` is set.
pub fn create_browse_tiles(
    co_pol_path: &Path,
    cross_pol_path: &Path,
    working_dir: &Path,
    config: &BrowseConfig,
) -> BrowseResult<BrowseOutputs> {
    config.validate()?;

    let browse_path = BrowseCompositor::new(config).create_browse_image(
        co_pol_path,
        cross_pol_path,
        working_dir,
    )?;

    let metadata = if config.write_metadata {
        Some(create_metadata_xml(co_pol_path, &browse_path, Utc::now())?)
    } else {
        None
    };

    let tiles = TileGenerator::new(working_dir).tile_image(&browse_path, config.zoom)?;

    if !config.keep_intermediates {
        remove_files(&[browse_path])?;
    }
    Ok(BrowseOutputs { tiles, metadata })
}

/// Resolve, download, build tiles and upload them for one granule.
pub fn create_browse_and_upload(
    granule: &str,
    ctx: &ProcessingContext,
) -> BrowseResult<BrowseOutputs> {
    log::info!("Processing granule {}", granule);
    ctx.config.validate()?;

    let assets = ctx.resolver.resolve(granule)?;
    let (co_pol_path, cross_pol_path) = ctx.downloader.download_assets(&assets, &ctx.working_dir)?;

    let outputs =
        create_browse_tiles(&co_pol_path, &cross_pol_path, &ctx.working_dir, &ctx.config)?;

    if !ctx.config.keep_intermediates {
        remove_files(&[co_pol_path, cross_pol_path])?;
    }

    if let Some(uploader) = &ctx.uploader {
        for path in outputs.tiles.iter().chain(outputs.metadata.iter()) {
            uploader.upload_file(path)?;
        }
    }

    log::info!("Granule {} produced {} tiles", granule, outputs.tiles.len());
    Ok(outputs)
}

fn remove_files(paths: &[PathBuf]) -> BrowseResult<()> {
    for path in paths {
        log::debug!("Removing {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}
