//! A multi-tool for the OSM extract cache: resolve an extract for a region,
//! preview what the download catalog would pick, or inspect the persisted
//! index.

#[macro_use]
extern crate log;

use anyhow::Result;
use structopt::StructOpt;

use extract_cache::{
    load_configuration, ExtractIndex, GeojsonCatalog, QueryRegion, RemoteCatalog, Resolver,
};

#[derive(StructOpt)]
#[structopt(name = "extract-cache", about = "The OSM extract cache multi-tool")]
enum Command {
    /// Finds or acquires an extract covering a region, cropping an oversized
    /// winner down to the region, and prints the path to use.
    Resolve {
        /// The path to a GeoJSON file describing the query region
        #[structopt(long)]
        region: String,
        /// Treat the region path as a GTFS feed (or its stops.txt) and use
        /// the stop locations as the region
        #[structopt(long)]
        gtfs: bool,
        /// The name to register a cropped extract under, if cropping is
        /// triggered
        #[structopt(long)]
        name: Option<String>,
        /// The path to a TOML configuration file
        #[structopt(long, default_value = "extract_cache.toml")]
        config: String,
    },
    /// Prints the URL of the smallest public extract covering a region,
    /// without downloading anything.
    PickRemote {
        /// The path to a GeoJSON file describing the query region
        #[structopt(long)]
        region: String,
        /// Treat the region path as a GTFS feed (or its stops.txt)
        #[structopt(long)]
        gtfs: bool,
        /// The path to a TOML configuration file
        #[structopt(long, default_value = "extract_cache.toml")]
        config: String,
    },
    /// Prints every record in the persisted extract index.
    DumpIndex {
        /// The path to a TOML configuration file
        #[structopt(long, default_value = "extract_cache.toml")]
        config: String,
    },
}

fn main() -> Result<()> {
    extractio::logger::setup();

    match Command::from_args() {
        Command::Resolve {
            region,
            gtfs,
            name,
            config,
        } => {
            let config = load_configuration(&config);
            let region = load_region(&region, gtfs)?;
            let mut resolver = Resolver::new(config);
            let extract = resolver.resolve(&region, name.as_deref())?;
            info!("Resolved to extract {}", extract.name);
            println!("{}", extract.path);
        }
        Command::PickRemote {
            region,
            gtfs,
            config,
        } => {
            let config = load_configuration(&config);
            let region = load_region(&region, gtfs)?;
            let entry = RemoteCatalog::new(&config.download_catalog).find_online(&region)?;
            println!("{}", entry.download_url());
        }
        Command::DumpIndex { config } => {
            let config = load_configuration(&config);
            let mut index = ExtractIndex::new(Box::new(GeojsonCatalog::new(config.index_path)));
            dump_index(&mut index);
        }
    }
    Ok(())
}

fn load_region(path: &str, gtfs: bool) -> Result<QueryRegion> {
    if gtfs {
        QueryRegion::from_gtfs_stops(path)
    } else {
        QueryRegion::from_geojson_file(path)
    }
}

fn dump_index(index: &mut ExtractIndex) {
    use geo::prelude::*;

    for extract in index.extracts() {
        println!(
            "{}\t{}\t{:.4} sq deg",
            extract.name,
            extract.path,
            extract.extent.unsigned_area()
        );
    }
}
