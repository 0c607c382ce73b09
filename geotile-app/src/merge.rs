use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use geotile_raster::{merge_datasets, open_shared_dataset, Access};
use geotile_scene::scene_file;

/// `inputs... output`: merges the inputs that open into one image and
/// writes it to the last path. Nothing is written when the merge fails.
pub fn merge_files(files: &[PathBuf]) -> Result<()> {
    let Some((output, inputs)) = files.split_last() else {
        bail!("no output file given");
    };
    if inputs.is_empty() {
        bail!("no input files given before {}", output.display());
    }
    merge(inputs, output)
}

pub fn merge(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let mut datasets = Vec::new();
    for input in inputs {
        match open_shared_dataset(input, Access::ReadOnly) {
            Ok(dataset) => datasets.push(dataset),
            Err(e) => bevy::log::warn!("{}", e),
        }
    }
    if datasets.is_empty() {
        bail!("no datasets loaded");
    }

    let image = merge_datasets(&datasets).context("could not merge the inputs")?;
    scene_file::write_object(output, &image)
        .with_context(|| format!("could not write {}", output.display()))?;

    bevy::log::info!(
        "wrote {}x{} image with {} {} components to {}",
        image.width,
        image.height,
        image.components,
        image.data_type(),
        output.display()
    );
    Ok(())
}
