use thiserror::Error;

#[derive(Error, Debug)]
pub enum TilingError {
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Split ratio {0} is outside the open interval (0, 1)")]
    InvalidRatio(f64),

    #[error("Failed to relocate pair '{stem}': {source}")]
    PairMove {
        stem: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TilingError>;
