use std::cell::RefCell;
use std::rc::Rc;

use geo::prelude::*;
use geojson::{FeatureCollection, GeoJson};

use crate::{CacheError, Extract, QueryRegion};

/// The durable catalog of extracts already on disk, and the only way to find
/// a locally cached extract covering a query region. One GeoJSON feature
/// collection on disk, a plain list in memory.
///
/// Strictly single-writer: the whole crash-safety story is "load fresh,
/// mutate in memory, save before exit". Two processes sharing a catalog file
/// will lose updates. Nothing is ever evicted.
pub struct ExtractIndex {
    storage: Box<dyn CatalogStorage>,
    extracts: Vec<Extract>,
    loaded: bool,
}

impl ExtractIndex {
    pub fn new(storage: Box<dyn CatalogStorage>) -> ExtractIndex {
        ExtractIndex {
            storage,
            extracts: Vec::new(),
            loaded: false,
        }
    }

    /// Reads the catalog into memory. A missing or malformed catalog file
    /// isn't an error; the cache just starts over empty. Idempotent.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.extracts = match self.storage.load() {
            Ok(extracts) => extracts,
            Err(err) => {
                warn!("Starting from an empty extract catalog: {}", err);
                Vec::new()
            }
        };
        self.loaded = true;
    }

    /// The smallest-area record whose extent fully contains the region. Ties
    /// go to the record added first.
    pub fn find_covering(&mut self, region: &QueryRegion) -> Option<Extract> {
        self.load();
        let mut best: Option<(&Extract, f64)> = None;
        for extract in &self.extracts {
            if !region.covered_by(&extract.extent) {
                continue;
            }
            let area = extract.extent.unsigned_area();
            match best {
                Some((_, smallest)) if area >= smallest => {}
                _ => best = Some((extract, area)),
            }
        }
        best.map(|(extract, _)| extract.clone())
    }

    /// Appends a record. Duplicate names are kept; lookups by name resolve
    /// to the newest record, so a collision behaves as last-write-wins.
    pub fn add(&mut self, extract: Extract) {
        self.load();
        self.extracts.push(extract);
    }

    /// The newest record with this name.
    pub fn get(&mut self, name: &str) -> Option<Extract> {
        self.load();
        self.extracts.iter().rev().find(|x| x.name == name).cloned()
    }

    pub fn extracts(&mut self) -> &[Extract] {
        self.load();
        &self.extracts
    }

    /// Persists the catalog, optionally (re)directing it to a new path.
    /// `MissingDestination` if no path was ever configured and none is given.
    pub fn save(&mut self, destination: Option<&str>) -> Result<(), CacheError> {
        self.load();
        self.storage.save(&self.extracts, destination)
    }
}

/// Where the persisted catalog lives. Injected into `ExtractIndex` so tests
/// can run against an in-memory catalog.
pub trait CatalogStorage {
    /// Reads all records. A catalog that doesn't exist yet is an empty list,
    /// not an error; one that exists but can't be parsed is
    /// `MalformedCatalog`.
    fn load(&mut self) -> Result<Vec<Extract>, CacheError>;
    /// Writes all records, replacing previous contents.
    fn save(&mut self, extracts: &[Extract], destination: Option<&str>)
        -> Result<(), CacheError>;
}

/// A catalog stored as one GeoJSON FeatureCollection (EPSG:4326), with
/// `name` and `path` properties per feature.
pub struct GeojsonCatalog {
    path: Option<String>,
}

impl GeojsonCatalog {
    pub fn new(path: Option<String>) -> GeojsonCatalog {
        GeojsonCatalog { path }
    }
}

impl CatalogStorage for GeojsonCatalog {
    fn load(&mut self) -> Result<Vec<Extract>, CacheError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(Vec::new()),
        };
        let raw = match fs_err::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                info!("No extract catalog at {} yet", path);
                return Ok(Vec::new());
            }
        };
        parse_catalog(&raw, path)
    }

    fn save(
        &mut self,
        extracts: &[Extract],
        destination: Option<&str>,
    ) -> Result<(), CacheError> {
        if let Some(dest) = destination {
            self.path = Some(dest.to_string());
        }
        let path = self.path.as_ref().ok_or(CacheError::MissingDestination)?;
        let collection = FeatureCollection {
            bbox: None,
            features: extracts.iter().map(Extract::to_feature).collect(),
            foreign_members: None,
        };
        extractio::write_file(path, &GeoJson::from(collection).to_string())?;
        Ok(())
    }
}

fn parse_catalog(raw: &str, path: &str) -> Result<Vec<Extract>, CacheError> {
    let malformed = |message: String| CacheError::MalformedCatalog {
        path: path.to_string(),
        message,
    };
    let geojson: GeoJson = raw.parse().map_err(|err: geojson::Error| malformed(err.to_string()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(collection) => collection,
        _ => return Err(malformed("not a FeatureCollection".to_string())),
    };
    let mut extracts = Vec::new();
    for feature in &collection.features {
        match Extract::from_feature(feature) {
            Some(extract) => extracts.push(extract),
            None => {
                return Err(malformed(
                    "a feature is missing its name, path, or polygon extent".to_string(),
                ));
            }
        }
    }
    Ok(extracts)
}

/// Keeps the catalog in memory. Clones share the same backing rows, which
/// lets tests model a catalog surviving a process restart.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    rows: Rc<RefCell<Vec<Extract>>>,
}

impl CatalogStorage for MemoryCatalog {
    fn load(&mut self) -> Result<Vec<Extract>, CacheError> {
        Ok(self.rows.borrow().clone())
    }

    fn save(
        &mut self,
        extracts: &[Extract],
        _destination: Option<&str>,
    ) -> Result<(), CacheError> {
        *self.rows.borrow_mut() = extracts.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn square(name: &str, min: f64, max: f64) -> Extract {
        Extract::new(
            name,
            format!("data/osm/{}.osm.pbf", name),
            Polygon::new(
                LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
                Vec::new(),
            ),
        )
    }

    fn memory_index() -> ExtractIndex {
        ExtractIndex::new(Box::new(MemoryCatalog::default()))
    }

    #[test]
    fn test_empty_index_finds_nothing() {
        let mut index = memory_index();
        assert!(index
            .find_covering(&QueryRegion::from_points(vec![(1.0, 1.0)]))
            .is_none());
    }

    #[test]
    fn test_smallest_covering_extent_wins() {
        let mut index = memory_index();
        index.add(square("huge", 0.0, 100.0));
        index.add(square("small", 0.0, 10.0));
        index.add(square("elsewhere", 50.0, 60.0));

        let region = QueryRegion::from_points(vec![(1.0, 1.0), (9.0, 9.0)]);
        let found = index.find_covering(&region).unwrap();
        assert_eq!(found.name, "small");
        // Coverage invariant: the returned extent must contain the region
        assert!(region.covered_by(&found.extent));
    }

    #[test]
    fn test_ties_go_to_insertion_order() {
        let mut index = memory_index();
        index.add(square("first", 0.0, 10.0));
        index.add(square("second", 0.0, 10.0));
        let found = index
            .find_covering(&QueryRegion::from_points(vec![(5.0, 5.0)]))
            .unwrap();
        assert_eq!(found.name, "first");
    }

    #[test]
    fn test_duplicate_names_are_kept_and_lookup_is_last_write_wins() {
        let mut index = memory_index();
        index.add(square("karlsruhe", 0.0, 10.0));
        index.add(Extract::new(
            "karlsruhe",
            "data/osm/karlsruhe_v2.osm.pbf",
            square("x", 0.0, 10.0).extent,
        ));
        assert_eq!(index.extracts().len(), 2);
        assert_eq!(
            index.get("karlsruhe").unwrap().path,
            "data/osm/karlsruhe_v2.osm.pbf"
        );
    }

    #[test]
    fn test_save_without_any_destination() {
        let mut index = ExtractIndex::new(Box::new(GeojsonCatalog::new(None)));
        index.add(square("a", 0.0, 1.0));
        match index.save(None) {
            Err(CacheError::MissingDestination) => {}
            other => panic!("expected MissingDestination, got {:?}", other),
        }
    }

    #[test]
    fn test_geojson_catalog_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("extract_cache_index_{}.geojson", std::process::id()))
            .display()
            .to_string();
        let _ = fs_err::remove_file(&path);

        let mut index = ExtractIndex::new(Box::new(GeojsonCatalog::new(Some(path.clone()))));
        // Missing file loads as empty
        assert!(index.extracts().is_empty());

        index.add(square("karlsruhe", 8.0, 9.0));
        index.add(square("baden", 7.0, 10.0));
        index.save(None).unwrap();

        let mut restored = ExtractIndex::new(Box::new(GeojsonCatalog::new(Some(path.clone()))));
        assert_eq!(restored.extracts().len(), 2);
        assert_eq!(restored.get("karlsruhe").unwrap().path, "data/osm/karlsruhe.osm.pbf");

        fs_err::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupt_catalog_degrades_to_empty() {
        let path = std::env::temp_dir()
            .join(format!("extract_cache_corrupt_{}.geojson", std::process::id()))
            .display()
            .to_string();
        fs_err::write(&path, "this is not geojson").unwrap();

        let mut index = ExtractIndex::new(Box::new(GeojsonCatalog::new(Some(path.clone()))));
        assert!(index.extracts().is_empty());
        // And the index still works normally afterwards
        index.add(square("a", 0.0, 1.0));
        index.save(None).unwrap();

        fs_err::remove_file(&path).unwrap();
    }
}
