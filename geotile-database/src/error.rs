use std::io;

use geotile_raster::RasterError;

#[derive(thiserror::Error, Debug)]
pub enum TileError {
    #[error("tile path template '{0}' needs {{x}}, {{y}} or {{-y}}, and {{z}} or {{level}}")]
    PathResolution(String),
    #[error("tile {x} {y} at level {level} is out of range: {reason}")]
    Range {
        x: u32,
        y: u32,
        level: u32,
        reason: String,
    },
    #[error("no root tile could be loaded from '{0}'")]
    RootLoad(String),
    #[error("invalid tile database settings: {0}")]
    InvalidSettings(String),
    #[error("'{0}' is not a tile request")]
    InvalidTileName(String),
    #[error("{0}")]
    Raster(#[from] RasterError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Remote(#[from] reqwest::Error),
}
