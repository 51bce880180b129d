use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TilingError};

/// Train fraction, validated to lie strictly between 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatio(f64);

impl SplitRatio {
    pub fn new(ratio: f64) -> Result<Self> {
        if ratio > 0.0 && ratio < 1.0 {
            Ok(Self(ratio))
        } else {
            Err(TilingError::InvalidRatio(ratio))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

/// Destination directories for the four split outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitLayout {
    pub train_images: PathBuf,
    pub train_masks: PathBuf,
    pub val_images: PathBuf,
    pub val_masks: PathBuf,
}

impl SplitLayout {
    /// Conventional `train/image`, `train/mask`, `val/image`, `val/mask`
    /// directories under a common root.
    pub fn under(root: &Path) -> Self {
        Self {
            train_images: root.join("train").join("image"),
            train_masks: root.join("train").join("mask"),
            val_images: root.join("val").join("image"),
            val_masks: root.join("val").join("mask"),
        }
    }

    fn create_all(&self) -> io::Result<()> {
        fs::create_dir_all(&self.train_images)?;
        fs::create_dir_all(&self.train_masks)?;
        fs::create_dir_all(&self.val_images)?;
        fs::create_dir_all(&self.val_masks)
    }
}

/// Counts reported by a split run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train: usize,
    pub val: usize,
    /// Files on either side with no stem-matched counterpart; left in place.
    pub dropped: usize,
}

/// Partitions matched (image, mask) tile pairs into train and validation
/// sets, relocating both files of each pair into the destination layout.
///
/// Pairing is by file stem: an image tile and a mask tile belong together
/// exactly when their names without extension are identical. Files without a
/// counterpart are never moved. The relocation consumes the source
/// directories; it is meant to run once over freshly generated tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSplitter {
    pub ratio: SplitRatio,
    /// Shuffle seed. Splits are reproducible only when this is set.
    pub seed: Option<u64>,
}

impl PairSplitter {
    pub fn new(ratio: SplitRatio) -> Self {
        Self { ratio, seed: None }
    }

    pub fn with_seed(ratio: SplitRatio, seed: u64) -> Self {
        Self {
            ratio,
            seed: Some(seed),
        }
    }

    /// Shuffle the matched pairs, assign the first `floor(N × ratio)` to
    /// train and the rest to validation, and move each pair into `layout`.
    pub fn split(
        &self,
        image_dir: &Path,
        mask_dir: &Path,
        layout: &SplitLayout,
    ) -> Result<SplitSummary> {
        layout.create_all()?;

        let images = stem_index(image_dir)?;
        let masks = stem_index(mask_dir)?;

        let mut dropped = 0usize;
        let mut pairs: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(images.len());
        for (stem, image_path) in &images {
            match masks.get(stem) {
                Some(mask_path) => pairs.push((image_path.clone(), mask_path.clone())),
                None => {
                    debug!(stem = %stem, "image tile has no matching mask, dropping");
                    dropped += 1;
                }
            }
        }
        dropped += masks.keys().filter(|stem| !images.contains_key(*stem)).count();

        match self.seed {
            Some(seed) => pairs.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => pairs.shuffle(&mut rand::thread_rng()),
        }

        let split_index = (pairs.len() as f64 * self.ratio.get()).floor() as usize;
        let (train, val) = pairs.split_at(split_index);

        for (image, mask) in train {
            move_pair(image, mask, &layout.train_images, &layout.train_masks)?;
        }
        for (image, mask) in val {
            move_pair(image, mask, &layout.val_images, &layout.val_masks)?;
        }

        let summary = SplitSummary {
            train: train.len(),
            val: val.len(),
            dropped,
        };
        info!(
            train = summary.train,
            val = summary.val,
            dropped = summary.dropped,
            "split paired dataset"
        );
        Ok(summary)
    }
}

/// Map from file stem to path for every plain file directly inside `dir`.
fn stem_index(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut index = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            index.insert(stem.to_owned(), path);
        }
    }
    Ok(index)
}

/// Relocate one pair. The image moves first; if the mask move then fails the
/// image is moved back, so a pair is never left split across directories.
fn move_pair(
    image: &Path,
    mask: &Path,
    image_dest_dir: &Path,
    mask_dest_dir: &Path,
) -> Result<()> {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image_dest = dest_path(image_dest_dir, image);
    let mask_dest = dest_path(mask_dest_dir, mask);

    move_file(image, &image_dest).map_err(|source| TilingError::PairMove {
        stem: stem.clone(),
        source,
    })?;
    if let Err(source) = move_file(mask, &mask_dest) {
        let _ = move_file(&image_dest, image);
        return Err(TilingError::PairMove { stem, source });
    }
    Ok(())
}

fn dest_path(dir: &Path, file: &Path) -> PathBuf {
    match file.file_name() {
        Some(name) => dir.join(name),
        None => dir.to_path_buf(),
    }
}

/// Rename, falling back to copy+remove when the rename crosses filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        images: TempDir,
        masks: TempDir,
        dest: TempDir,
    }

    impl Fixture {
        fn with_pairs(stems: &[&str]) -> Self {
            let fixture = Self {
                images: tempfile::tempdir().unwrap(),
                masks: tempfile::tempdir().unwrap(),
                dest: tempfile::tempdir().unwrap(),
            };
            for stem in stems {
                fs::write(fixture.images.path().join(format!("{stem}.jpg")), b"i").unwrap();
                fs::write(fixture.masks.path().join(format!("{stem}.png")), b"m").unwrap();
            }
            fixture
        }

        fn layout(&self) -> SplitLayout {
            SplitLayout::under(self.dest.path())
        }
    }

    fn stems_in(dir: &Path) -> Vec<String> {
        let mut stems: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| {
                e.unwrap()
                    .path()
                    .file_stem()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        stems.sort();
        stems
    }

    #[test]
    fn ratio_outside_open_interval_is_rejected() {
        assert!(SplitRatio::new(0.0).is_err());
        assert!(SplitRatio::new(1.0).is_err());
        assert!(SplitRatio::new(-0.2).is_err());
        assert!(SplitRatio::new(0.8).is_ok());
    }

    #[test]
    fn ten_pairs_at_eighty_percent_split_eight_two() {
        let stems: Vec<String> = (0..10).map(|i| format!("tile_{i}_0")).collect();
        let stem_refs: Vec<&str> = stems.iter().map(String::as_str).collect();
        let fixture = Fixture::with_pairs(&stem_refs);
        let layout = fixture.layout();

        let splitter = PairSplitter::with_seed(SplitRatio::new(0.8).unwrap(), 42);
        let summary = splitter
            .split(fixture.images.path(), fixture.masks.path(), &layout)
            .unwrap();

        assert_eq!(summary.train, 8);
        assert_eq!(summary.val, 2);
        assert_eq!(summary.dropped, 0);

        // Every pair kept its stem on both sides of the layout.
        assert_eq!(stems_in(&layout.train_images), stems_in(&layout.train_masks));
        assert_eq!(stems_in(&layout.val_images), stems_in(&layout.val_masks));

        // Disjoint and exhaustive.
        let mut all = stems_in(&layout.train_images);
        all.extend(stems_in(&layout.val_images));
        all.sort();
        let mut expected = stems.clone();
        expected.sort();
        assert_eq!(all, expected);

        // Sources were consumed.
        assert!(stems_in(fixture.images.path()).is_empty());
        assert!(stems_in(fixture.masks.path()).is_empty());
    }

    #[test]
    fn unmatched_files_never_enter_the_split() {
        let fixture = Fixture::with_pairs(&["a", "b"]);
        fs::write(fixture.images.path().join("orphan_image.jpg"), b"i").unwrap();
        fs::write(fixture.masks.path().join("orphan_mask.png"), b"m").unwrap();
        let layout = fixture.layout();

        let splitter = PairSplitter::with_seed(SplitRatio::new(0.5).unwrap(), 7);
        let summary = splitter
            .split(fixture.images.path(), fixture.masks.path(), &layout)
            .unwrap();

        assert_eq!(summary.train + summary.val, 2);
        assert_eq!(summary.dropped, 2);
        // Orphans stay where they were.
        assert_eq!(stems_in(fixture.images.path()), vec!["orphan_image"]);
        assert_eq!(stems_in(fixture.masks.path()), vec!["orphan_mask"]);
    }

    #[test]
    fn seeded_split_is_reproducible() {
        let stems: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
        let stem_refs: Vec<&str> = stems.iter().map(String::as_str).collect();

        let first = Fixture::with_pairs(&stem_refs);
        let second = Fixture::with_pairs(&stem_refs);
        let splitter = PairSplitter::with_seed(SplitRatio::new(0.75).unwrap(), 1234);

        splitter
            .split(first.images.path(), first.masks.path(), &first.layout())
            .unwrap();
        splitter
            .split(second.images.path(), second.masks.path(), &second.layout())
            .unwrap();

        assert_eq!(
            stems_in(&first.layout().train_images),
            stems_in(&second.layout().train_images)
        );
        assert_eq!(
            stems_in(&first.layout().val_images),
            stems_in(&second.layout().val_images)
        );
    }

    #[test]
    fn empty_inputs_yield_empty_split() {
        let fixture = Fixture::with_pairs(&[]);
        let layout = fixture.layout();

        let summary = PairSplitter::new(SplitRatio::new(0.8).unwrap())
            .split(fixture.images.path(), fixture.masks.path(), &layout)
            .unwrap();

        assert_eq!(summary, SplitSummary::default());
        assert!(layout.train_images.is_dir());
        assert!(stems_in(&layout.val_images).is_empty());
    }
}
