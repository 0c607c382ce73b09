#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::expect_used
)]
//! Raster datasets for geotile.
//!
//! Files are opened through a small driver registry (GeoTIFF, PNG, JPEG),
//! exposed as [`Dataset`]s with typed bands, checked for pixel alignment
//! and merged into [`geotile_scene::ImageData`] with projection, transform
//! and metadata attached.

mod bridge;
mod compat;
mod dataset;
mod driver;
mod error;
mod image_driver;
mod memory;
mod meta_utils;
mod reader_writer;
mod tiff_driver;

pub use bridge::{
    assign_meta_data, copy_raster_band_to_image, create_image_2d, data_types, parse_meta_data,
};
pub use compat::{
    all_equal, compatible_dataset_projections, compatible_dataset_projections_transform_and_sizes,
};
pub use dataset::{
    open_dataset, open_dataset_from_bytes, open_shared_dataset, Access, BandDescription,
    ColorInterpretation, Dataset, DatasetHandle, RasterBand, RasterSource,
};
pub use driver::{drivers, ensure_initialized, identify, Driver, OpenFn};
pub use error::RasterError;
pub use memory::MemoryDataset;
pub use meta_utils::{dms_in_brackets, exif_gps_position, BracketedFields, GpsPosition};
pub use reader_writer::{merge_datasets, read_image};
