use std::convert::TryFrom;

use geo::prelude::*;
use geo::Polygon;
use geojson::GeoJson;

use crate::{CacheError, Extract, QueryRegion};

/// One publicly downloadable extract from the download catalog.
#[derive(Clone, Debug)]
pub struct RemoteEntry {
    pub id: String,
    pub extent: Polygon<f64>,
    /// Explicit download location; most catalogs omit this and rely on the
    /// Geofabrik layout.
    pub url: Option<String>,
}

impl RemoteEntry {
    pub fn download_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.id))
    }
}

/// The static, externally supplied catalog of what's publicly downloadable:
/// a GeoJSON feature collection with an `id` property and a coverage polygon
/// per feature. Read-only; this system never writes it.
pub struct RemoteCatalog {
    path: String,
}

impl RemoteCatalog {
    pub fn new(path: &str) -> RemoteCatalog {
        RemoteCatalog {
            path: path.to_string(),
        }
    }

    /// The smallest publicly available extract covering the region, by
    /// extent area; ties go to catalog order. Downloads nothing.
    /// `NoCoverageFound` when no entry qualifies.
    pub fn find_online(&self, region: &QueryRegion) -> Result<RemoteEntry, CacheError> {
        let mut best: Option<(RemoteEntry, f64)> = None;
        for entry in self.load()? {
            if !region.covered_by(&entry.extent) {
                continue;
            }
            let area = entry.extent.unsigned_area();
            match best {
                Some((_, smallest)) if area >= smallest => {}
                _ => best = Some((entry, area)),
            }
        }
        best.map(|(entry, _)| entry).ok_or(CacheError::NoCoverageFound)
    }

    fn load(&self) -> Result<Vec<RemoteEntry>, CacheError> {
        let malformed = |message: String| CacheError::MalformedCatalog {
            path: self.path.clone(),
            message,
        };
        let raw = fs_err::read_to_string(&self.path)?;
        let geojson: GeoJson = raw
            .parse()
            .map_err(|err: geojson::Error| malformed(err.to_string()))?;
        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            _ => return Err(malformed("not a FeatureCollection".to_string())),
        };
        let mut entries = Vec::new();
        for feature in collection.features {
            let id = match feature.property("id").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => return Err(malformed("a feature is missing its id".to_string())),
            };
            let url = feature
                .property("url")
                .and_then(|v| v.as_str())
                .map(|url| url.to_string());
            let extent = feature
                .geometry
                .as_ref()
                .and_then(|geometry| Polygon::try_from(geometry.value.clone()).ok())
                .ok_or_else(|| malformed(format!("{} has no polygon extent", id)))?;
            entries.push(RemoteEntry { id, extent, url });
        }
        Ok(entries)
    }
}

/// Acquires a remote entry's payload into the extract directory. Injected
/// into the resolver so it can be tested without network access.
pub trait Fetcher {
    fn fetch(&mut self, entry: &RemoteEntry, extract_dir: &str) -> Result<Extract, CacheError>;
}

/// Downloads over HTTP. This can block for tens of minutes on a big extract;
/// there's no resume and no retry.
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&mut self, entry: &RemoteEntry, extract_dir: &str) -> Result<Extract, CacheError> {
        let extract = Extract::in_dir(&entry.id, extract_dir, entry.extent.clone());
        extractio::download_to_file(entry.download_url(), &extract.path)?;
        Ok(extract)
    }
}
