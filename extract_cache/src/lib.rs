//! A persistent spatial cache of OSM extracts (`.osm.pbf` files) for
//! travel-time accessibility analysis. Given a query region, the resolver
//! reuses a local extract covering it, downloads the smallest covering
//! extract from a Geofabrik-style catalog otherwise, and crops the winner to
//! the region's bounding box when its payload is too large to feed to a
//! routing engine directly.
//!
//! Downloads and crops take minutes, so the whole point is to never repeat
//! one that already succeeded: every acquisition is recorded in a GeoJSON
//! catalog that's persisted before `resolve` returns.

#[macro_use]
extern crate log;

mod configuration;
mod crop;
mod error;
mod index;
mod model;
mod region;
mod remote;
mod resolver;

pub use crate::configuration::load_configuration;
pub use crate::crop::{Cropper, OsmconvertCropper};
pub use crate::error::CacheError;
pub use crate::index::{CatalogStorage, ExtractIndex, GeojsonCatalog, MemoryCatalog};
pub use crate::model::Extract;
pub use crate::region::QueryRegion;
pub use crate::remote::{Fetcher, HttpFetcher, RemoteCatalog, RemoteEntry};
pub use crate::resolver::{Config, Resolver};
