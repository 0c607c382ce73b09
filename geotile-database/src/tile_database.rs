use std::any::Any;
use std::fmt;
use std::sync::Arc;

use geotile_scene::{Node, Visitor};

use crate::reader_writer::Options;
use crate::tile_reader::{TileReader, TileStatistics};
use crate::{TileDatabaseSettings, TileError};

/// Scene node owning the root of one tile set. Traversals pass straight
/// through to the root.
pub struct TileDatabase {
    pub settings: Arc<TileDatabaseSettings>,
    pub child: Option<Arc<dyn Node>>,
    reader: Option<Arc<TileReader>>,
    options: Options,
}

impl TileDatabase {
    pub fn new(settings: TileDatabaseSettings) -> Self {
        TileDatabase {
            settings: Arc::new(settings),
            child: None,
            reader: None,
            options: Options::default(),
        }
    }

    /// Builds the root with a fresh tile reader registered ahead of the
    /// handlers in `options`, so the placeholders' requests resolve
    /// through it.
    pub fn read_database(&mut self, options: &Options) -> Result<(), TileError> {
        let reader = Arc::new(TileReader::new(self.settings.clone())?);
        let mut options = options.clone();
        options.registry.add_first(reader.clone());

        let root = reader.read_root(&options)?;
        self.child = Some(root);
        self.reader = Some(reader);
        self.options = options;
        Ok(())
    }

    /// Options to read this database's tile requests with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn statistics(&self) -> Option<TileStatistics> {
        self.reader.as_ref().map(|reader| reader.statistics())
    }
}

impl fmt::Debug for TileDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileDatabase")
            .field("settings", &self.settings)
            .field("child", &self.child)
            .finish()
    }
}

impl Node for TileDatabase {
    fn accept(&self, visitor: &mut dyn Visitor) {
        visitor.apply(self);
    }

    fn traverse(&self, visitor: &mut dyn Visitor) {
        if let Some(child) = &self.child {
            child.accept(visitor);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
