use geo::prelude::*;

use crate::crop::OsmconvertCropper;
use crate::index::GeojsonCatalog;
use crate::remote::HttpFetcher;
use crate::{
    CacheError, Cropper, Extract, ExtractIndex, Fetcher, QueryRegion, RemoteCatalog,
};

/// Everything the resolver needs to know about its environment, passed in
/// explicitly. There's no process-wide state.
#[derive(Clone, Debug)]
pub struct Config {
    /// Where the index of extracts already on disk is persisted. `None`
    /// means resolution can't save its results, so every `resolve` will
    /// fail its final step; only useful for tooling that never resolves.
    pub index_path: Option<String>,
    /// The read-only catalog of publicly downloadable extracts.
    pub download_catalog: String,
    /// Where downloaded and cropped payloads land.
    pub extract_dir: String,
    /// Payloads above this many bytes get cropped to the query region's
    /// bounding box before use.
    pub size_threshold_bytes: u64,
    /// The external clip tool to invoke.
    pub osmconvert: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            index_path: Some("data/indices/extracts.geojson".to_string()),
            download_catalog: "data/indices/download_catalog.geojson".to_string(),
            extract_dir: "data/osm".to_string(),
            size_threshold_bytes: 500_000_000,
            osmconvert: "osmconvert".to_string(),
        }
    }
}

/// The policy deciding whether a query region is served by an extract we
/// already have, a download, or a crop of something oversized. Downloads and
/// crops take minutes, so the policy never repeats one that a previous run
/// already completed and recorded.
///
/// `resolve` blocks for as long as its slowest step; there's no timeout,
/// cancellation, or retry.
pub struct Resolver {
    config: Config,
    index: ExtractIndex,
    catalog: RemoteCatalog,
    fetcher: Box<dyn Fetcher>,
    cropper: Box<dyn Cropper>,
}

impl Resolver {
    /// A resolver against the real filesystem, network, and clip tool.
    pub fn new(config: Config) -> Resolver {
        let index = ExtractIndex::new(Box::new(GeojsonCatalog::new(config.index_path.clone())));
        let catalog = RemoteCatalog::new(&config.download_catalog);
        let cropper = OsmconvertCropper {
            binary: config.osmconvert.clone(),
        };
        Resolver {
            config,
            index,
            catalog,
            fetcher: Box::new(HttpFetcher),
            cropper: Box::new(cropper),
        }
    }

    /// Swaps out the I/O seams. Tests use an in-memory index and counting
    /// doubles for the fetcher and cropper.
    pub fn with_parts(
        config: Config,
        index: ExtractIndex,
        catalog: RemoteCatalog,
        fetcher: Box<dyn Fetcher>,
        cropper: Box<dyn Cropper>,
    ) -> Resolver {
        Resolver {
            config,
            index,
            catalog,
            fetcher,
            cropper,
        }
    }

    /// Returns an extract covering `region`: a local one when it's the
    /// tightest cover available, otherwise the smallest covering extract
    /// from the download catalog, freshly downloaded. If the winner's
    /// payload exceeds the size threshold, a crop bounded to the region's
    /// bounding box is derived and returned instead, registered under
    /// `name` (or `{winner}_cropped` when `name` is `None`).
    ///
    /// The index is persisted before returning, so a completed download or
    /// crop survives a crash of whatever runs afterwards.
    pub fn resolve(
        &mut self,
        region: &QueryRegion,
        name: Option<&str>,
    ) -> Result<Extract, CacheError> {
        if region.is_empty() {
            return Err(CacheError::NoCoverageFound);
        }
        self.index.load();
        let local = self.index.find_covering(region);

        let mut winner = match self.catalog.find_online(region) {
            Ok(entry) => {
                // Prefer the local copy unless the public catalog has a
                // strictly tighter extent; equal areas shouldn't cost a
                // download.
                let local_is_tighter = local.as_ref().map_or(false, |local| {
                    local.extent.unsigned_area() <= entry.extent.unsigned_area()
                });
                if local_is_tighter {
                    let local = local.unwrap();
                    info!("Reusing local extract {} at {}", local.name, local.path);
                    local
                } else {
                    let fetched = self.fetcher.fetch(&entry, &self.config.extract_dir)?;
                    self.index.add(fetched.clone());
                    fetched
                }
            }
            Err(CacheError::NoCoverageFound) => match local {
                Some(local) => {
                    info!(
                        "Nothing online covers this region; reusing local extract {}",
                        local.name
                    );
                    local
                }
                None => return Err(CacheError::NoCoverageFound),
            },
            Err(err) => return Err(err),
        };

        let size = extractio::file_size(&winner.path)?;
        if size > self.config.size_threshold_bytes {
            let cropped_name = match name {
                Some(name) => name.to_string(),
                None => format!("{}_cropped", winner.name),
            };
            info!(
                "{} is {} bytes, too big to use directly; cropping to the query region as {}",
                winner.path,
                extractio::prettyprint_usize(size as usize),
                cropped_name
            );
            let cropped =
                self.cropper
                    .crop(&winner, region, &cropped_name, &self.config.extract_dir)?;
            self.index.add(cropped.clone());
            winner = cropped;
        }

        // Persist before returning, so the acquisition is never repeated
        // even if the caller crashes afterwards.
        self.index.save(None)?;
        Ok(winner)
    }
}
