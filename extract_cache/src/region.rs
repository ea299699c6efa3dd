use std::convert::TryFrom;

use anyhow::{bail, Context, Result};
use geo::prelude::*;
use geo::{Geometry, LineString, Point, Polygon, Rect};
use geojson::GeoJson;
use serde::Deserialize;

/// The geometry a caller needs an extract to cover: any mix of points,
/// polygons, and multipolygons in EPSG:4326. Only two things about it matter
/// to the cache — whether an extent covers all of it, and its combined
/// bounding box.
#[derive(Clone, Debug)]
pub struct QueryRegion {
    geometries: Vec<Geometry<f64>>,
}

impl QueryRegion {
    pub fn new(geometries: Vec<Geometry<f64>>) -> QueryRegion {
        QueryRegion { geometries }
    }

    pub fn from_points(pts: Vec<(f64, f64)>) -> QueryRegion {
        QueryRegion {
            geometries: pts
                .into_iter()
                .map(|(x, y)| Geometry::Point(Point::new(x, y)))
                .collect(),
        }
    }

    /// Reads every feature's geometry from a GeoJSON file.
    pub fn from_geojson_file(path: &str) -> Result<QueryRegion> {
        let raw = String::from_utf8(extractio::slurp_file(path)?)?;
        let geojson: GeoJson = raw
            .parse()
            .with_context(|| format!("parsing {}", path))?;
        let mut geometries = Vec::new();
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    if let Some(geometry) = feature.geometry {
                        geometries.push(Geometry::try_from(geometry.value)?);
                    }
                }
            }
            GeoJson::Feature(feature) => {
                if let Some(geometry) = feature.geometry {
                    geometries.push(Geometry::try_from(geometry.value)?);
                }
            }
            GeoJson::Geometry(geometry) => {
                geometries.push(Geometry::try_from(geometry.value)?);
            }
        }
        if geometries.is_empty() {
            bail!("{} has no geometry", path);
        }
        Ok(QueryRegion { geometries })
    }

    /// Builds a region from the stop locations of a GTFS feed. Takes a
    /// `stops.txt` or the directory of an unzipped feed; rows without
    /// coordinates are skipped.
    pub fn from_gtfs_stops(path: &str) -> Result<QueryRegion> {
        #[derive(Deserialize)]
        struct Stop {
            stop_lat: Option<f64>,
            stop_lon: Option<f64>,
        }

        let file = if path.ends_with("stops.txt") {
            path.to_string()
        } else {
            format!("{}/stops.txt", path)
        };
        let mut pts = Vec::new();
        let mut reader = csv::Reader::from_reader(fs_err::File::open(&file)?);
        for rec in reader.deserialize() {
            let stop: Stop = rec.with_context(|| format!("reading {}", file))?;
            if let (Some(lat), Some(lon)) = (stop.stop_lat, stop.stop_lon) {
                pts.push((lon, lat));
            }
        }
        if pts.is_empty() {
            bail!("{} has no stop locations", file);
        }
        Ok(QueryRegion::from_points(pts))
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// True if the extent fully contains the union of this region. The union
    /// is never materialized; a polygon contains a union exactly when it
    /// contains every member.
    pub fn covered_by(&self, extent: &Polygon<f64>) -> bool {
        !self.geometries.is_empty()
            && self
                .geometries
                .iter()
                .all(|geometry| polygon_contains(extent, geometry))
    }

    /// The axis-aligned bounding box over all members, or `None` for an
    /// empty region.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        let mut bounds: Option<Rect<f64>> = None;
        for geometry in &self.geometries {
            if let Some(rect) = geometry.bounding_rect() {
                bounds = Some(match bounds {
                    Some(b) => combine(b, rect),
                    None => rect,
                });
            }
        }
        bounds
    }
}

fn combine(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        geo::Coordinate {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        geo::Coordinate {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

// Exhaustive on purpose; a new geometry kind must decide its coverage rule
// here instead of silently matching nothing. Points use the boundary-
// inclusive test: a stop on the exact edge of an extent (a cropped extract's
// bounding box, usually) still counts as covered, otherwise cropping would
// never satisfy the region it was cropped to.
fn polygon_contains(extent: &Polygon<f64>, geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(pt) => extent.intersects(pt),
        Geometry::MultiPoint(pts) => pts.iter().all(|pt| extent.intersects(pt)),
        Geometry::Line(line) => extent.contains(&LineString::from(vec![line.start, line.end])),
        Geometry::LineString(ls) => extent.contains(ls),
        Geometry::MultiLineString(mls) => mls.iter().all(|ls| extent.contains(ls)),
        Geometry::Polygon(polygon) => extent.contains(polygon),
        Geometry::MultiPolygon(mp) => mp.iter().all(|polygon| extent.contains(polygon)),
        Geometry::Rect(rect) => extent.contains(&rect.to_polygon()),
        Geometry::Triangle(triangle) => extent.contains(&triangle.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.iter().all(|g| polygon_contains(extent, g)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(min, min), (max, min), (max, max), (min, max), (min, min)]),
            Vec::new(),
        )
    }

    #[test]
    fn test_coverage_is_member_wise() {
        let region = QueryRegion::from_points(vec![(1.0, 1.0), (8.0, 8.0)]);
        assert!(region.covered_by(&square(0.0, 10.0)));
        // Covering one point isn't enough
        assert!(!region.covered_by(&square(0.0, 5.0)));
    }

    #[test]
    fn test_polygon_members() {
        let region = QueryRegion::new(vec![Geometry::Polygon(square(2.0, 4.0))]);
        assert!(region.covered_by(&square(0.0, 10.0)));
        assert!(!region.covered_by(&square(3.0, 10.0)));
    }

    #[test]
    fn test_empty_region_is_never_covered() {
        let region = QueryRegion::new(Vec::new());
        assert!(!region.covered_by(&square(0.0, 10.0)));
        assert!(region.bounding_box().is_none());
    }

    #[test]
    fn test_bounding_box_spans_all_members() {
        let region = QueryRegion::from_points(vec![(1.0, 7.0), (5.0, 2.0)]);
        let bbox = region.bounding_box().unwrap();
        assert_eq!(bbox.min().x, 1.0);
        assert_eq!(bbox.min().y, 2.0);
        assert_eq!(bbox.max().x, 5.0);
        assert_eq!(bbox.max().y, 7.0);
    }

    #[test]
    fn test_from_gtfs_stops() {
        let dir = std::env::temp_dir().join(format!("extract_cache_gtfs_{}", std::process::id()));
        fs_err::create_dir_all(&dir).unwrap();
        fs_err::write(
            dir.join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon\n1,Marktplatz,49.0,8.4\n2,Kronenplatz,49.01,8.41\n3,NoLocation,,\n",
        )
        .unwrap();

        let region = QueryRegion::from_gtfs_stops(&dir.display().to_string()).unwrap();
        let bbox = region.bounding_box().unwrap();
        assert_eq!(bbox.min().x, 8.4);
        assert_eq!(bbox.max().y, 49.01);
    }

    #[test]
    fn test_from_geojson_file() {
        let path = std::env::temp_dir().join(format!(
            "extract_cache_region_{}.geojson",
            std::process::id()
        ));
        fs_err::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [8.4, 49.0]}}
            ]}"#,
        )
        .unwrap();

        let region = QueryRegion::from_geojson_file(&path.display().to_string()).unwrap();
        assert!(region.covered_by(&square(0.0, 50.0)));
    }
}
