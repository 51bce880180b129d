//! # Georeferenced vector reconstruction
//!
//! Inverts the raster side of the vegetation segmentation pipeline:
//! predicted binary masks are re-binarized, their external contours traced,
//! and every contour mapped through the source raster's affine transform
//! (pixel-center convention) into a polygon carrying the raster's CRS. All
//! polygons across a mask directory land in a single GeoJSON layer.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vectorize::{Reconstructor, reconstruct_to_geojson};
//!
//! let summary = reconstruct_to_geojson(
//!     &Reconstructor::new(128),
//!     Path::new("data/predict/output"),
//!     Path::new("data/predict/geo/ortho.tif"),
//!     Path::new("data/vegetation.geojson"),
//! )?;
//! if !summary.written {
//!     eprintln!("no vegetation found");
//! }
//! # Ok::<(), vectorize::VectorizeError>(())
//! ```

pub mod contours;
pub mod error;
pub mod georef;
pub mod io;
pub mod reconstruct;

pub use contours::{ThresholdBinarizer, extract_external_contours};
pub use error::{Result, VectorizeError};
pub use georef::{GeoReference, GeoTransform};
pub use io::geojson::write_feature_collection;
pub use reconstruct::{ReconstructionSummary, Reconstructor, reconstruct_to_geojson};
