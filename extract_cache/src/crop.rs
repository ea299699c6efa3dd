use std::path::Path;
use std::process::Command;

use crate::{CacheError, Extract, QueryRegion};

/// Derives a smaller extract bounded to a region's bounding box from an
/// oversized one. Injected into the resolver so it can be tested without the
/// external tool.
pub trait Cropper {
    fn crop(
        &mut self,
        source: &Extract,
        region: &QueryRegion,
        new_name: &str,
        extract_dir: &str,
    ) -> Result<Extract, CacheError>;
}

/// Shells out to osmconvert to clip the payload:
/// `osmconvert <src> -b=left,bottom,right,top --complete-ways -o=<dst>`.
///
/// A missing binary, a bad bounding box, and a non-zero exit all surface as
/// `CropFailed` with the tool's output. Swallowing any of them would leave a
/// catalog record pointing at a missing or truncated file.
pub struct OsmconvertCropper {
    pub binary: String,
}

impl Cropper for OsmconvertCropper {
    fn crop(
        &mut self,
        source: &Extract,
        region: &QueryRegion,
        new_name: &str,
        extract_dir: &str,
    ) -> Result<Extract, CacheError> {
        let bbox = region.bounding_box().ok_or(CacheError::NoCoverageFound)?;
        let output = Extract::in_dir(new_name, extract_dir, bbox.to_polygon());
        if let Some(parent) = Path::new(&output.path).parent() {
            fs_err::create_dir_all(parent)?;
        }

        info!(
            "Cropping {} to {}. This might take a while...",
            source.path, output.path
        );
        let result = extractio::run_cmd(
            Command::new(&self.binary)
                .arg(&source.path)
                .arg(format!(
                    "-b={},{},{},{}",
                    bbox.min().x,
                    bbox.min().y,
                    bbox.max().x,
                    bbox.max().y
                ))
                .arg("--complete-ways")
                .arg(format!("-o={}", output.path)),
        );
        match result {
            Ok(_) => {
                info!("Cropped extract {} saved at {}", new_name, output.path);
                Ok(output)
            }
            Err(err) => Err(CacheError::CropFailed {
                output: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::prelude::*;
    use geo::{LineString, Polygon};

    use super::*;

    fn source() -> Extract {
        Extract::new(
            "germany",
            "data/osm/germany.osm.pbf",
            Polygon::new(
                LineString::from(vec![(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 50.0), (0.0, 0.0)]),
                Vec::new(),
            ),
        )
    }

    #[test]
    fn test_missing_binary_is_crop_failed() {
        let mut cropper = OsmconvertCropper {
            binary: "definitely-not-osmconvert".to_string(),
        };
        let region = QueryRegion::from_points(vec![(1.0, 1.0), (2.0, 2.0)]);
        let dir = std::env::temp_dir()
            .join(format!("extract_cache_crop_{}", std::process::id()))
            .display()
            .to_string();
        match cropper.crop(&source(), &region, "karlsruhe", &dir) {
            Err(CacheError::CropFailed { .. }) => {}
            other => panic!("expected CropFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_result_extent_is_the_region_bbox() {
        // `true` accepts any arguments and exits 0, standing in for the real
        // tool; only the record matters here.
        let mut cropper = OsmconvertCropper {
            binary: "true".to_string(),
        };
        let region = QueryRegion::from_points(vec![(1.0, 2.0), (3.0, 4.0)]);
        let dir = std::env::temp_dir()
            .join(format!("extract_cache_crop_ok_{}", std::process::id()))
            .display()
            .to_string();
        let cropped = cropper.crop(&source(), &region, "karlsruhe", &dir).unwrap();

        assert_eq!(cropped.name, "karlsruhe");
        assert!(cropped.path.ends_with("karlsruhe.osm.pbf"));
        let bbox = cropped.extent.bounding_rect().unwrap();
        assert_eq!(bbox.min().x, 1.0);
        assert_eq!(bbox.min().y, 2.0);
        assert_eq!(bbox.max().x, 3.0);
        assert_eq!(bbox.max().y, 4.0);
        // The derived extract must cover the region it was cropped to
        assert!(region.covered_by(&cropped.extent));
    }
}
