//! Reading objects by name through a list of format handlers, the way a
//! scene loader picks a plugin by file extension.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use geotile_scene::geometry::DEFAULT_ECEF_RESOLUTION;
use geotile_scene::{ImageData, Node};

use crate::remote::RemoteReaderWriter;
use crate::TileError;

/// What a handler produced.
#[derive(Debug, Clone)]
pub enum ReadObject {
    Image(Arc<ImageData>),
    Node(Arc<dyn Node>),
}

pub trait ReaderWriter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower case file extensions this handler reads.
    fn extensions(&self) -> &[&'static str];

    fn handles(&self, path: &str) -> bool {
        extension(path).map_or(false, |ext| {
            self.extensions()
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&ext))
        })
    }

    /// `Ok(None)` when there is nothing at `path`.
    fn read(&self, path: &str, options: &Options) -> Result<Option<ReadObject>, TileError>;
}

pub(crate) fn extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Local raster files through geotile-raster. Missing files read as
/// nothing.
#[derive(Debug, Default)]
pub struct RasterReaderWriter;

impl ReaderWriter for RasterReaderWriter {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn extensions(&self) -> &[&'static str] {
        &["tif", "tiff", "png", "jpg", "jpeg"]
    }

    fn read(&self, path: &str, _options: &Options) -> Result<Option<ReadObject>, TileError> {
        if !Path::new(path).exists() {
            return Ok(None);
        }
        let image = geotile_raster::read_image(path)?;
        Ok(Some(ReadObject::Image(Arc::new(image))))
    }
}

/// Handlers in lookup order; the first one that handles a path reads it.
#[derive(Clone, Default)]
pub struct ReaderWriterRegistry {
    reader_writers: Vec<Arc<dyn ReaderWriter>>,
}

impl ReaderWriterRegistry {
    pub fn new() -> Self {
        ReaderWriterRegistry::default()
    }

    /// Remote URLs first, then local rasters.
    pub fn with_defaults() -> Self {
        let mut registry = ReaderWriterRegistry::new();
        registry.add(Arc::new(RemoteReaderWriter::default()));
        registry.add(Arc::new(RasterReaderWriter));
        registry
    }

    pub fn add(&mut self, reader_writer: Arc<dyn ReaderWriter>) {
        self.reader_writers.push(reader_writer);
    }

    /// Puts `reader_writer` ahead of every other handler.
    pub fn add_first(&mut self, reader_writer: Arc<dyn ReaderWriter>) {
        self.reader_writers.insert(0, reader_writer);
    }

    pub fn find(&self, path: &str) -> Option<&Arc<dyn ReaderWriter>> {
        self.reader_writers.iter().find(|rw| rw.handles(path))
    }

    pub fn len(&self) -> usize {
        self.reader_writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader_writers.is_empty()
    }
}

impl fmt::Debug for ReaderWriterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.reader_writers.iter().map(|rw| rw.name()))
            .finish()
    }
}

/// Read options handed down to every handler.
#[derive(Debug, Clone)]
pub struct Options {
    pub registry: ReaderWriterRegistry,
    /// Grid resolution of ellipsoid tiles.
    pub ecef_resolution: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            registry: ReaderWriterRegistry::with_defaults(),
            ecef_resolution: DEFAULT_ECEF_RESOLUTION,
        }
    }
}

impl Options {
    pub fn read(&self, path: &str) -> Result<Option<ReadObject>, TileError> {
        match self.registry.find(path) {
            Some(reader_writer) => reader_writer.read(path, self),
            None => {
                bevy::log::warn!("no reader for '{}'", path);
                Ok(None)
            }
        }
    }

    pub fn read_image(&self, path: &str) -> Result<Option<Arc<ImageData>>, TileError> {
        Ok(match self.read(path)? {
            Some(ReadObject::Image(image)) => Some(image),
            Some(ReadObject::Node(_)) => {
                bevy::log::warn!("'{}' holds a node, not an image", path);
                None
            }
            None => None,
        })
    }
}
