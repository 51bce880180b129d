use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Directory table for a whole processing run: raw rasters in, tile and
/// mask directories, and the train/validation layout out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectLayout {
    pub raw_images: PathBuf,
    pub processed_images: PathBuf,
    pub processed_masks: PathBuf,
    pub train_images: PathBuf,
    pub train_masks: PathBuf,
    pub val_images: PathBuf,
    pub val_masks: PathBuf,
}

impl ProjectLayout {
    /// Conventional layout under a single data root.
    pub fn under(root: &Path) -> Self {
        Self {
            raw_images: root.join("raw"),
            processed_images: root.join("processed").join("image"),
            processed_masks: root.join("processed").join("mask"),
            train_images: root.join("train").join("image"),
            train_masks: root.join("train").join("mask"),
            val_images: root.join("val").join("image"),
            val_masks: root.join("val").join("mask"),
        }
    }

    /// Load a layout from a TOML or JSON file, selected by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(LayoutError::UnsupportedFileFormat),
        }
    }

    /// The four split destinations of this layout.
    pub fn split_layout(&self) -> tiling::SplitLayout {
        tiling::SplitLayout {
            train_images: self.train_images.clone(),
            train_masks: self.train_masks.clone(),
            val_images: self.val_images.clone(),
            val_masks: self.val_masks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_loads_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        fs::write(
            &path,
            r#"
raw_images = "data/raw"
processed_images = "data/processed/image"
processed_masks = "data/processed/mask"
train_images = "data/train/image"
train_masks = "data/train/mask"
val_images = "data/val/image"
val_masks = "data/val/mask"
"#,
        )
        .unwrap();

        let layout = ProjectLayout::from_file(&path).unwrap();
        assert_eq!(layout.raw_images, PathBuf::from("data/raw"));
        assert_eq!(
            layout.split_layout().val_masks,
            PathBuf::from("data/val/mask")
        );
    }

    #[test]
    fn layout_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let layout = ProjectLayout::under(Path::new("data"));
        fs::write(&path, serde_json::to_string(&layout).unwrap()).unwrap();

        assert_eq!(ProjectLayout::from_file(&path).unwrap(), layout);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.yaml");
        fs::write(&path, "raw_images: data/raw").unwrap();

        assert!(matches!(
            ProjectLayout::from_file(&path),
            Err(LayoutError::UnsupportedFileFormat)
        ));
    }
}
