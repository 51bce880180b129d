use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorizeError {
    #[error("Failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to read raster metadata: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("No georeference in {0}: ModelPixelScale/ModelTiepoint tags are missing")]
    MissingGeoreference(PathBuf),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VectorizeError>;
