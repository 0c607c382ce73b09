//! `geotile`: merges georeferenced rasters into a scene image, describes
//! datasets and expands tile databases.

mod info;
mod merge;
mod tiles;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "geotile")]
#[command(about = "Merges georeferenced rasters into scene images and pages tile databases")]
struct Args {
    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Describe each input file instead of merging.
    #[arg(long)]
    info: bool,

    /// Tile database settings (JSON) to load and expand.
    #[arg(long, value_name = "SETTINGS")]
    tiles: Option<PathBuf>,

    /// Levels to expand below the root with --tiles.
    #[arg(long, default_value_t = 1)]
    depth: u32,

    /// Inputs followed by the output file when merging.
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(settings) = &args.tiles {
        return tiles::expand(settings, args.depth);
    }
    if args.info {
        return info::describe_files(&args.files);
    }
    if args.files.is_empty() {
        bail!("nothing to do, pass input files and an output file");
    }
    merge::merge_files(&args.files)
}
