//! # Raster tiling and paired-dataset preparation
//!
//! Preprocessing stage of the vegetation segmentation pipeline: cuts large
//! aerial rasters into fixed-size training tiles, optionally derives
//! synthetic binary masks, and partitions the resulting (image, mask) pairs
//! into train/validation directories.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tiling::{MaskSynthesizer, PairSplitter, Partitioner, SplitLayout, SplitRatio};
//!
//! let partitioner = Partitioner::new(256);
//! let synthesizer = MaskSynthesizer::new(128);
//! partitioner.partition_with_masks(
//!     Path::new("data/raw"),
//!     Path::new("data/processed/image"),
//!     Path::new("data/processed/mask"),
//!     &synthesizer,
//! )?;
//!
//! let splitter = PairSplitter::with_seed(SplitRatio::new(0.8)?, 42);
//! splitter.split(
//!     Path::new("data/processed/image"),
//!     Path::new("data/processed/mask"),
//!     &SplitLayout::under(Path::new("data")),
//! )?;
//! # Ok::<(), tiling::TilingError>(())
//! ```

pub mod error;
pub mod grid;
pub mod split;
pub mod synth;

pub use error::{Result, TilingError};
pub use grid::{PartitionSummary, Partitioner, TileId};
pub use split::{PairSplitter, SplitLayout, SplitRatio, SplitSummary};
pub use synth::MaskSynthesizer;
