use clap::{Parser, Subcommand};
use cli::ProjectLayout;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use tiling::{MaskSynthesizer, PairSplitter, Partitioner, SplitLayout, SplitRatio};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};
use vectorize::{Reconstructor, reconstruct_to_geojson};

#[derive(Parser)]
#[command(author, version, about = "Vegetation segmentation preprocessing and vector reconstruction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut rasters into fixed-size tiles
    Tile {
        /// Directory containing the source rasters
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the tiles
        #[arg(short, long)]
        output: PathBuf,
        /// Tile edge length in pixels
        #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
        tile_size: u32,
    },
    /// Cut rasters into paired image tiles and synthetic binary masks
    Prepare {
        /// Directory containing the source rasters
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the image tiles
        #[arg(long)]
        images: PathBuf,
        /// Output directory for the mask tiles
        #[arg(long)]
        masks: PathBuf,
        /// Tile edge length in pixels
        #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
        tile_size: u32,
        /// Intensity cutoff for the synthetic masks
        #[arg(long, default_value_t = 128)]
        threshold: u8,
    },
    /// Move paired tiles into train/validation directories
    Split {
        /// Directory containing the image tiles
        #[arg(long)]
        images: PathBuf,
        /// Directory containing the mask tiles
        #[arg(long)]
        masks: PathBuf,
        /// Root under which train/image, train/mask, val/image and
        /// val/mask are created
        #[arg(long)]
        dest: PathBuf,
        /// Train fraction, strictly between 0 and 1
        #[arg(long, default_value_t = 0.8)]
        ratio: f64,
        /// Seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run prepare and split in one pass over a project layout file
    Run {
        /// Layout file (.toml or .json) naming the project directories
        #[arg(short, long)]
        layout: PathBuf,
        /// Tile edge length in pixels
        #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u32).range(1..))]
        tile_size: u32,
        /// Intensity cutoff for the synthetic masks
        #[arg(long, default_value_t = 128)]
        threshold: u8,
        /// Train fraction, strictly between 0 and 1
        #[arg(long, default_value_t = 0.8)]
        ratio: f64,
        /// Seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Convert predicted binary masks into a georeferenced vector layer
    Vectorize {
        /// Directory containing the predicted mask images
        #[arg(long)]
        masks: PathBuf,
        /// Georeferenced source raster supplying the transform and CRS
        #[arg(long)]
        raster: PathBuf,
        /// Output GeoJSON path
        #[arg(short, long)]
        output: PathBuf,
        /// Intensity cutoff for re-binarizing the masks
        #[arg(long, default_value_t = 128)]
        threshold: u8,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tile {
            input,
            output,
            tile_size,
        } => {
            let summary = Partitioner::new(tile_size).partition_directory(&input, &output)?;
            info!(
                images = summary.images,
                tiles = summary.tiles,
                skipped = summary.skipped,
                "tiling complete"
            );
        }
        Commands::Prepare {
            input,
            images,
            masks,
            tile_size,
            threshold,
        } => {
            let summary = Partitioner::new(tile_size).partition_with_masks(
                &input,
                &images,
                &masks,
                &MaskSynthesizer::new(threshold),
            )?;
            info!(
                images = summary.images,
                pairs = summary.tiles,
                skipped = summary.skipped,
                "sample generation complete"
            );
        }
        Commands::Split {
            images,
            masks,
            dest,
            ratio,
            seed,
        } => {
            let summary =
                splitter(ratio, seed)?.split(&images, &masks, &SplitLayout::under(&dest))?;
            info!(
                train = summary.train,
                val = summary.val,
                dropped = summary.dropped,
                "split complete"
            );
        }
        Commands::Run {
            layout,
            tile_size,
            threshold,
            ratio,
            seed,
        } => {
            let layout = ProjectLayout::from_file(&layout)?;
            Partitioner::new(tile_size).partition_with_masks(
                &layout.raw_images,
                &layout.processed_images,
                &layout.processed_masks,
                &MaskSynthesizer::new(threshold),
            )?;
            let summary = splitter(ratio, seed)?.split(
                &layout.processed_images,
                &layout.processed_masks,
                &layout.split_layout(),
            )?;
            info!(
                train = summary.train,
                val = summary.val,
                "sample generation and split complete"
            );
        }
        Commands::Vectorize {
            masks,
            raster,
            output,
            threshold,
        } => {
            let summary = reconstruct_to_geojson(
                &Reconstructor::new(threshold),
                &masks,
                &raster,
                &output,
            )?;
            if summary.written {
                info!(polygons = summary.polygons, path = %output.display(), "vector layer written");
            } else {
                info!("no vegetation polygons found, nothing written");
            }
        }
    }

    Ok(())
}

fn splitter(ratio: f64, seed: Option<u64>) -> Result<PairSplitter> {
    let ratio = SplitRatio::new(ratio)?;
    Ok(match seed {
        Some(seed) => PairSplitter::with_seed(ratio, seed),
        None => PairSplitter::new(ratio),
    })
}
