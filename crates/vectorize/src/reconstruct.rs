use std::fs;
use std::path::{Path, PathBuf};

use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contours::{ThresholdBinarizer, extract_external_contours};
use crate::error::Result;
use crate::georef::GeoReference;
use crate::io::geojson::write_feature_collection;

/// File extensions accepted as mask rasters, matched case-insensitively.
const MASK_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// Counts reported by an end-to-end reconstruction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionSummary {
    pub polygons: usize,
    /// False when no polygon was found and no output file was written.
    pub written: bool,
}

/// Converts predicted binary mask tiles back into georeferenced polygons,
/// inverting the rasterization: external contours traced in pixel space are
/// mapped through the source raster's affine transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconstructor {
    pub binarizer: ThresholdBinarizer,
}

impl Reconstructor {
    pub fn new(threshold: u8) -> Self {
        Self {
            binarizer: ThresholdBinarizer::new(threshold),
        }
    }

    /// Georeferenced polygons for every readable mask in `mask_dir`.
    ///
    /// Unreadable mask files are skipped; an empty directory yields an
    /// empty set.
    pub fn reconstruct_directory(
        &self,
        mask_dir: &Path,
        georef: &GeoReference,
    ) -> Result<Vec<Polygon<f64>>> {
        let mut polygons = Vec::new();
        for path in list_masks(mask_dir)? {
            let mask = match image::open(&path) {
                Ok(image) => image.to_luma8(),
                Err(error) => {
                    debug!(path = %path.display(), %error, "skipping unreadable mask");
                    continue;
                }
            };
            polygons.extend(self.reconstruct_mask(&mask, georef));
        }
        info!(polygons = polygons.len(), "reconstructed vegetation polygons");
        Ok(polygons)
    }

    /// Polygons for a single mask image, one per external contour.
    pub fn reconstruct_mask(&self, mask: &GrayImage, georef: &GeoReference) -> Vec<Polygon<f64>> {
        let binary = self.binarizer.binarize(mask);
        extract_external_contours(&binary)
            .into_iter()
            .map(|points| {
                let ring: Vec<Coord<f64>> = points
                    .into_iter()
                    .map(|(col, row)| {
                        let (x, y) = georef.transform.xy(f64::from(col), f64::from(row));
                        Coord { x, y }
                    })
                    .collect();
                Polygon::new(LineString::new(ring), vec![])
            })
            .collect()
    }
}

/// Full raster→vector inversion: read the georeference from the original
/// raster, trace every mask in `mask_dir`, and persist one GeoJSON layer at
/// `output_path`.
///
/// The georeference source must open successfully; there is no fallback
/// transform. When zero polygons are found across all masks, no output file
/// is written and the run still succeeds.
pub fn reconstruct_to_geojson(
    reconstructor: &Reconstructor,
    mask_dir: &Path,
    raster_path: &Path,
    output_path: &Path,
) -> Result<ReconstructionSummary> {
    let georef = GeoReference::from_tiff(raster_path)?;
    let polygons = reconstructor.reconstruct_directory(mask_dir, &georef)?;

    if polygons.is_empty() {
        info!("no vegetation polygons found, skipping vector output");
        return Ok(ReconstructionSummary {
            polygons: 0,
            written: false,
        });
    }

    write_feature_collection(output_path, &polygons, georef.epsg)?;
    info!(
        path = %output_path.display(),
        polygons = polygons.len(),
        "wrote vector layer"
    );
    Ok(ReconstructionSummary {
        polygons: polygons.len(),
        written: true,
    })
}

/// Mask files directly inside `dir`, sorted for a stable processing order.
fn list_masks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_mask_extension(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_mask_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MASK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
