use std::convert::TryFrom;

use geo::Polygon;
use geojson::{Feature, Geometry, Value};

/// One stored OSM extract: where the payload lives and the polygon it's
/// guaranteed to cover, in EPSG:4326. Immutable once created; the index only
/// ever appends records, so a record can be trusted forever for sub-regions
/// of its extent.
#[derive(Clone, Debug, PartialEq)]
pub struct Extract {
    pub name: String,
    /// Local path to the `.osm.pbf` payload.
    pub path: String,
    pub extent: Polygon<f64>,
}

impl Extract {
    pub fn new<N: Into<String>, P: Into<String>>(name: N, path: P, extent: Polygon<f64>) -> Extract {
        Extract {
            name: name.into(),
            path: path.into(),
            extent,
        }
    }

    /// Names the payload after the extract, inside a directory.
    pub fn in_dir(name: &str, dir: &str, extent: Polygon<f64>) -> Extract {
        Extract {
            name: name.to_string(),
            path: format!("{}/{}.osm.pbf", dir, name),
            extent,
        }
    }

    /// Renders the record as one feature of the persisted catalog.
    pub(crate) fn to_feature(&self) -> Feature {
        let mut feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(&self.extent))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        feature.set_property("name", self.name.clone());
        feature.set_property("path", self.path.clone());
        feature
    }

    /// Parses a catalog feature. `None` for features missing a name, a path,
    /// or a polygon extent.
    pub(crate) fn from_feature(feature: &Feature) -> Option<Extract> {
        let name = feature.property("name")?.as_str()?.to_string();
        let path = feature.property("path")?.as_str()?.to_string();
        let geometry = feature.geometry.as_ref()?;
        let extent = Polygon::try_from(geometry.value.clone()).ok()?;
        Some(Extract { name, path, extent })
    }
}
