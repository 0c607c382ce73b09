#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::expect_used
)]
//! Tiled quad-tree imagery and terrain for geotile.
//!
//! [`TileDatabaseSettings`] describe a tile set, the resolver maps quad-tree
//! addresses to extents and file names, the [`TileReader`] builds tiles on
//! request and the [`DatabasePager`] reads the children a LOD traversal
//! asks for in the background.

mod error;
mod pager;
mod reader_writer;
mod remote;
mod resolver;
mod settings;
mod tile_database;
mod tile_reader;

pub use error::TileError;
pub use pager::DatabasePager;
pub use reader_writer::{Options, RasterReaderWriter, ReadObject, ReaderWriter, ReaderWriterRegistry};
pub use remote::RemoteReaderWriter;
pub use settings::TileDatabaseSettings;
pub use tile_database::TileDatabase;
pub use tile_reader::{
    parse_tile_request_name, tile_request_name, TileReader, TileStatistics, ROOT_TILE,
    TILE_EXTENSION,
};
