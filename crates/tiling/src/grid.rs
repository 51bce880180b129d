use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::synth::MaskSynthesizer;

/// File extensions accepted as source rasters, matched case-insensitively.
pub const RASTER_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Identity of a tile: the source raster's file stem plus the pixel origin
/// (top-left corner) of the tile in the parent image.
///
/// The same source and origin always produce the same identity, so tiles are
/// traceable back to their position in the raster, and an image tile and its
/// mask share a stem regardless of extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub stem: String,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(stem: impl Into<String>, x: u32, y: u32) -> Self {
        Self {
            stem: stem.into(),
            x,
            y,
        }
    }

    /// File name carrying the identity: `{stem}_{x}_{y}.{ext}`.
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}_{}_{}.{}", self.stem, self.x, self.y, ext)
    }
}

/// Counts reported by a partitioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    /// Source rasters successfully tiled.
    pub images: usize,
    /// Tiles written (pairs count once when masks are generated alongside).
    pub tiles: usize,
    /// Source files skipped because they could not be decoded.
    pub skipped: usize,
}

/// Cuts rasters into fixed-size square tiles on a regular grid.
///
/// Every tile is exactly `tile_size × tile_size`: tiles at the right and
/// bottom edges that would extend past the raster are padded with black
/// pixels rather than cropped or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitioner {
    pub tile_size: u32,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self { tile_size: 256 }
    }
}

impl Partitioner {
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    /// Grid origins covering a `width × height` raster, row-major.
    ///
    /// Yields `ceil(width / tile_size) × ceil(height / tile_size)` origins.
    pub fn origins(&self, width: u32, height: u32) -> Vec<(u32, u32)> {
        let s = self.tile_size;
        let mut origins =
            Vec::with_capacity((width.div_ceil(s) * height.div_ceil(s)) as usize);
        for y in (0..height).step_by(s as usize) {
            for x in (0..width).step_by(s as usize) {
                origins.push((x, y));
            }
        }
        origins
    }

    /// Cut the tile at origin `(x, y)`, zero-padding past the raster edge.
    pub fn cut(&self, image: &RgbImage, x: u32, y: u32) -> RgbImage {
        let s = self.tile_size;
        let mut tile = RgbImage::new(s, s);
        let w = image.width().saturating_sub(x).min(s);
        let h = image.height().saturating_sub(y).min(s);
        for ty in 0..h {
            for tx in 0..w {
                tile.put_pixel(tx, ty, *image.get_pixel(x + tx, y + ty));
            }
        }
        tile
    }

    /// Cut every raster in `input_dir` into tiles under `output_dir`.
    ///
    /// The output directory is created if absent. A source file that cannot
    /// be decoded is logged and skipped; the batch continues.
    pub fn partition_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<PartitionSummary> {
        fs::create_dir_all(output_dir)?;

        let mut summary = PartitionSummary::default();
        for path in list_rasters(input_dir)? {
            let Some(image) = open_raster(&path, &mut summary) else {
                continue;
            };
            let stem = file_stem(&path);
            for (x, y) in self.origins(image.width(), image.height()) {
                let tile = self.cut(&image, x, y);
                let id = TileId::new(stem.clone(), x, y);
                tile.save(output_dir.join(id.file_name("jpg")))?;
                summary.tiles += 1;
            }
            summary.images += 1;
        }

        info!(
            images = summary.images,
            tiles = summary.tiles,
            tile_size = self.tile_size,
            "partitioned rasters"
        );
        Ok(summary)
    }

    /// Cut every raster into paired image and synthetic mask tiles.
    ///
    /// Image tiles are written as `{stem}_{x}_{y}.jpg` under
    /// `image_out_dir` and their masks as `{stem}_{x}_{y}.png` under
    /// `mask_out_dir`, so a pair is recoverable by stem alone. Skip policy
    /// matches [`partition_directory`](Self::partition_directory).
    pub fn partition_with_masks(
        &self,
        input_dir: &Path,
        image_out_dir: &Path,
        mask_out_dir: &Path,
        synthesizer: &MaskSynthesizer,
    ) -> Result<PartitionSummary> {
        fs::create_dir_all(image_out_dir)?;
        fs::create_dir_all(mask_out_dir)?;

        let mut summary = PartitionSummary::default();
        for path in list_rasters(input_dir)? {
            let Some(image) = open_raster(&path, &mut summary) else {
                continue;
            };
            let stem = file_stem(&path);
            for (x, y) in self.origins(image.width(), image.height()) {
                let tile = self.cut(&image, x, y);
                let mask = synthesizer.synthesize(&tile);
                let id = TileId::new(stem.clone(), x, y);
                tile.save(image_out_dir.join(id.file_name("jpg")))?;
                mask.save(mask_out_dir.join(id.file_name("png")))?;
                summary.tiles += 1;
            }
            summary.images += 1;
        }

        info!(
            images = summary.images,
            pairs = summary.tiles,
            tile_size = self.tile_size,
            "partitioned rasters with synthetic masks"
        );
        Ok(summary)
    }
}

fn open_raster(path: &Path, summary: &mut PartitionSummary) -> Option<RgbImage> {
    match image::open(path) {
        Ok(image) => Some(image.to_rgb8()),
        Err(error) => {
            warn!(path = %path.display(), %error, "skipping unreadable image");
            summary.skipped += 1;
            None
        }
    }
}

/// Raster files directly inside `dir`, sorted for a stable processing order.
fn list_rasters(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_raster_extension(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_raster_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RASTER_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
