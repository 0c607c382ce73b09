//! The quad-tree loader. The root is a grid of level 0 tiles; every
//! placeholder names the four children it expands into, and reading that
//! name builds them.

use std::sync::Arc;
use std::time::Duration;

use bevy::math::DVec3;
use geotile_scene::geometry::{create_ecef_tile, create_texture_quad};
use geotile_scene::{Extents, Group, ImageData, LodTransition, Node, PagedLod, TileGeometry};
use parking_lot::Mutex;

use crate::reader_writer::{Options, ReadObject, ReaderWriter};
use crate::{TileDatabaseSettings, TileError};

pub const TILE_EXTENSION: &str = "tile";
pub const ROOT_TILE: &str = "root.tile";

/// Name of the request that reads the children of `(x, y)` at
/// `level - 1`.
pub fn tile_request_name(x: u32, y: u32, level: u32) -> String {
    format!("{} {} {}.{}", x, y, level, TILE_EXTENSION)
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Inverse of [`tile_request_name`]. Leading directories are ignored.
pub fn parse_tile_request_name(name: &str) -> Result<(u32, u32, u32), TileError> {
    let invalid = || TileError::InvalidTileName(name.to_owned());
    let stem = file_name(name)
        .strip_suffix(TILE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or_else(invalid)?;
    let mut fields = stem.split_whitespace().map(str::parse::<u32>);
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(level)), None) => Ok((x, y, level)),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TileStatistics {
    pub num_tiles_read: u64,
    pub total_time_reading_tiles: Duration,
}

impl TileStatistics {
    pub fn average_time_per_tile(&self) -> Option<Duration> {
        u32::try_from(self.num_tiles_read)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| self.total_time_reading_tiles / n)
    }
}

struct TileImages {
    image: Arc<ImageData>,
    terrain: Option<Arc<ImageData>>,
}

/// Builds tiles on demand. Safe to share between threads; the statistics
/// are the only state reads have in common.
pub struct TileReader {
    settings: Arc<TileDatabaseSettings>,
    statistics: Mutex<TileStatistics>,
}

impl std::fmt::Debug for TileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileReader")
            .field("image_layer", &self.settings.image_layer)
            .field("statistics", &self.statistics())
            .finish()
    }
}

impl TileReader {
    pub fn new(settings: Arc<TileDatabaseSettings>) -> Result<Self, TileError> {
        settings.validate()?;
        Ok(TileReader {
            settings,
            statistics: Mutex::new(TileStatistics::default()),
        })
    }

    pub fn settings(&self) -> &TileDatabaseSettings {
        &self.settings
    }

    pub fn statistics(&self) -> TileStatistics {
        *self.statistics.lock()
    }

    /// The level 0 grid. Tiles that fail to load are left out; failing to
    /// load any of them is an error.
    pub fn read_root(&self, options: &Options) -> Result<Arc<dyn Node>, TileError> {
        let leaf = self.settings.max_level == 0;
        let mut group = Group::new();
        for y in 0..self.settings.no_y {
            for x in 0..self.settings.no_x {
                match self.read_tile(x, y, 0, options)? {
                    Some(images) => group.add_child(self.create_node(x, y, 0, images, leaf, options)),
                    None => bevy::log::warn!("root tile {} {} could not be loaded", x, y),
                }
            }
        }
        if group.is_empty() {
            return Err(TileError::RootLoad(self.settings.image_layer.clone()));
        }
        bevy::log::info!(
            "loaded {} of {} root tiles from {}",
            group.len(),
            self.settings.no_x * self.settings.no_y,
            self.settings.image_layer
        );
        Ok(Arc::new(group))
    }

    /// The four children of tile `(x, y)` at `level - 1`. At the maximum
    /// level they are leaves, above it placeholders for the next level.
    /// Children without an image are left out; `Ok(None)` when none of
    /// them loaded.
    pub fn read_subtile(
        &self,
        x: u32,
        y: u32,
        level: u32,
        options: &Options,
    ) -> Result<Option<Arc<dyn Node>>, TileError> {
        let range_error = |reason: String| TileError::Range { x, y, level, reason };
        if level == 0 {
            return Err(range_error("level 0 tiles are read with the root".into()));
        }
        if level > self.settings.max_level {
            return Err(range_error(format!(
                "the maximum level is {}",
                self.settings.max_level
            )));
        }
        let (parents_x, parents_y) = self.settings.tiles_at_level(level - 1);
        if u64::from(x) >= parents_x || u64::from(y) >= parents_y {
            return Err(range_error(format!(
                "level {} has {}x{} tiles",
                level - 1,
                parents_x,
                parents_y
            )));
        }

        let leaf = level == self.settings.max_level;
        let mut group = Group::new();
        for dy in 0..2 {
            for dx in 0..2 {
                let (cx, cy) = (2 * x + dx, 2 * y + dy);
                if let Some(images) = self.read_tile(cx, cy, level, options)? {
                    group.add_child(self.create_node(cx, cy, level, images, leaf, options));
                }
            }
        }
        if group.is_empty() {
            bevy::log::debug!("no children of {} {} at level {}", x, y, level);
            return Ok(None);
        }
        Ok(Some(Arc::new(group)))
    }

    /// Geometry for one tile: an ellipsoid patch when the settings carry an
    /// ellipsoid model, a flat quad otherwise.
    pub fn create_tile(
        &self,
        extents: &Extents,
        image: Arc<ImageData>,
        terrain: Option<Arc<ImageData>>,
        options: &Options,
    ) -> TileGeometry {
        let mipmap_levels = self
            .settings
            .mipmap_levels_hint
            .clamp(1, image.full_mipmap_levels().max(1));
        match &self.settings.ellipsoid_model {
            Some(ellipsoid) => create_ecef_tile(
                extents,
                image,
                terrain,
                ellipsoid,
                &|point: DVec3| self.settings.compute_latitude_longitude_altitude(point),
                options.ecef_resolution,
                mipmap_levels,
            ),
            None => create_texture_quad(extents, image, mipmap_levels),
        }
    }

    fn create_node(
        &self,
        x: u32,
        y: u32,
        level: u32,
        images: TileImages,
        leaf: bool,
        options: &Options,
    ) -> Arc<dyn Node> {
        let extents = self.settings.compute_tile_extents(x, y, level);
        let tile = self.create_tile(&extents, images.image, images.terrain, options);
        if leaf {
            return Arc::new(tile);
        }
        Arc::new(PagedLod::new(
            tile.bound(),
            LodTransition::new(self.settings.lod_transition_screen_height_ratio),
            tile_request_name(x, y, level + 1),
            Arc::new(tile),
        ))
    }

    /// Image and optional terrain for one address. A missing or broken
    /// image means the tile has no content; a missing terrain tile only
    /// means it is flat.
    fn read_tile(
        &self,
        x: u32,
        y: u32,
        level: u32,
        options: &Options,
    ) -> Result<Option<TileImages>, TileError> {
        let start = instant::Instant::now();

        let path = self
            .settings
            .get_tile_path(&self.settings.image_layer, x, y, level)?;
        let Some(image) = read_absorbing_errors(&path, options) else {
            return Ok(None);
        };
        let terrain = match &self.settings.terrain_layer {
            Some(layer) => {
                let path = self.settings.get_tile_path(layer, x, y, level)?;
                read_absorbing_errors(&path, options)
            }
            None => None,
        };

        let mut statistics = self.statistics.lock();
        statistics.num_tiles_read += 1;
        statistics.total_time_reading_tiles += start.elapsed();

        Ok(Some(TileImages { image, terrain }))
    }
}

fn read_absorbing_errors(path: &str, options: &Options) -> Option<Arc<ImageData>> {
    match options.read_image(path) {
        Ok(Some(image)) => Some(image),
        Ok(None) => {
            bevy::log::debug!("no tile at {}", path);
            None
        }
        Err(e) => {
            bevy::log::warn!("could not read tile {}: {}", path, e);
            None
        }
    }
}

impl ReaderWriter for TileReader {
    fn name(&self) -> &'static str {
        "tile"
    }

    fn extensions(&self) -> &[&'static str] {
        &[TILE_EXTENSION]
    }

    fn read(&self, path: &str, options: &Options) -> Result<Option<ReadObject>, TileError> {
        if file_name(path) == ROOT_TILE {
            return self.read_root(options).map(|root| Some(ReadObject::Node(root)));
        }
        let (x, y, level) = parse_tile_request_name(path)?;
        Ok(self
            .read_subtile(x, y, level, options)?
            .map(ReadObject::Node))
    }
}

#[cfg(test)]
mod tests {
    use geotile_scene::visitors::CountNodes;
    use geotile_scene::{DataType, PixelData};

    use super::*;

    /// Serves a 2x2 image for every tile whose path is not listed as
    /// missing.
    struct Synthetic {
        missing: Vec<String>,
    }

    impl ReaderWriter for Synthetic {
        fn name(&self) -> &'static str {
            "synthetic"
        }

        fn extensions(&self) -> &[&'static str] {
            &["img"]
        }

        fn read(&self, path: &str, _: &Options) -> Result<Option<ReadObject>, TileError> {
            if self.missing.iter().any(|m| m == path) {
                return Ok(None);
            }
            let image = ImageData::from_pixels(2, 2, 1, PixelData::U8(vec![1, 2, 3, 4])).unwrap();
            Ok(Some(ReadObject::Image(Arc::new(image))))
        }
    }

    fn reader(max_level: u32, missing: &[&str]) -> (TileReader, Options) {
        let settings = TileDatabaseSettings {
            max_level,
            ellipsoid_model: None,
            image_layer: "{z}/{x}/{y}.img".into(),
            ..Default::default()
        };
        let mut options = Options::default();
        options.registry.add_first(Arc::new(Synthetic {
            missing: missing.iter().map(|m| m.to_string()).collect(),
        }));
        (TileReader::new(Arc::new(settings)).unwrap(), options)
    }

    fn placeholder_names(node: &Arc<dyn Node>) -> Vec<String> {
        let group = node.as_any().downcast_ref::<Group>().unwrap();
        group
            .children
            .iter()
            .filter_map(|c| c.as_any().downcast_ref::<PagedLod>())
            .map(|p| p.filename.clone())
            .collect()
    }

    #[test]
    fn request_names() {
        assert_eq!(tile_request_name(3, 1, 2), "3 1 2.tile");
        assert_eq!(parse_tile_request_name("3 1 2.tile").unwrap(), (3, 1, 2));
        assert_eq!(parse_tile_request_name("db/3 1 2.tile").unwrap(), (3, 1, 2));
        for bad in ["3 1.tile", "3 1 2 4.tile", "a b c.tile", "3 1 2.png", "3 1 2tile"] {
            assert!(matches!(
                parse_tile_request_name(bad),
                Err(TileError::InvalidTileName(_))
            ));
        }
    }

    #[test]
    fn root_is_a_grid_of_placeholders() {
        let (reader, options) = reader(3, &[]);
        let root = reader.read_root(&options).unwrap();
        assert_eq!(placeholder_names(&root), vec!["0 0 1.tile", "1 0 1.tile"]);
        assert_eq!(reader.statistics().num_tiles_read, 2);
    }

    #[test]
    fn missing_root_tiles_are_skipped() {
        let (reader, options) = reader(3, &["0/0/0.img"]);
        let root = reader.read_root(&options).unwrap();
        assert_eq!(placeholder_names(&root), vec!["1 0 1.tile"]);

        let (reader, options) = self::reader(3, &["0/0/0.img", "0/1/0.img"]);
        assert!(matches!(
            reader.read_root(&options),
            Err(TileError::RootLoad(_))
        ));
    }

    #[test]
    fn subtiles_name_the_next_level() {
        let (reader, options) = reader(3, &[]);
        let children = reader.read_subtile(1, 0, 1, &options).unwrap().unwrap();
        assert_eq!(
            placeholder_names(&children),
            vec!["2 0 2.tile", "3 0 2.tile", "2 1 2.tile", "3 1 2.tile"]
        );
    }

    #[test]
    fn max_level_yields_leaves_only() {
        let (reader, options) = reader(2, &[]);
        let children = reader.read_subtile(0, 1, 2, &options).unwrap().unwrap();
        let counts = CountNodes::of(children.as_ref());
        assert_eq!(counts.paged_lods, 0);
        assert_eq!(counts.tiles, 4);
        let extents = reader.settings().compute_tile_extents(0, 2, 2);
        let first = children.as_any().downcast_ref::<Group>().unwrap().children[0]
            .as_any()
            .downcast_ref::<TileGeometry>()
            .unwrap()
            .extents;
        assert_eq!(first, extents);
    }

    #[test]
    fn out_of_range_requests_fail() {
        let (reader, options) = reader(2, &[]);
        for (x, y, level) in [(0, 0, 0), (0, 0, 3), (2, 0, 1), (0, 1, 1), (4, 0, 2)] {
            assert!(matches!(
                reader.read_subtile(x, y, level, &options),
                Err(TileError::Range { .. })
            ));
        }
    }

    #[test]
    fn missing_children_are_absent() {
        let (reader, options) = reader(3, &["1/0/0.img", "1/1/1.img"]);
        let children = reader.read_subtile(0, 0, 1, &options).unwrap().unwrap();
        assert_eq!(placeholder_names(&children), vec!["1 0 2.tile", "0 1 2.tile"]);

        let all = ["1/0/0.img", "1/1/0.img", "1/0/1.img", "1/1/1.img"];
        let (reader, options) = self::reader(3, &all);
        assert!(reader.read_subtile(0, 0, 1, &options).unwrap().is_none());
    }

    #[test]
    fn flat_and_ellipsoid_tiles() {
        let (reader, options) = reader(3, &[]);
        let image = Arc::new(ImageData::new(4, 4, 3, DataType::U8, &[]).unwrap());
        let extents = reader.settings().compute_tile_extents(0, 0, 0);
        let flat = reader.create_tile(&extents, image.clone(), None, &options);
        assert_eq!(flat.vertices.len(), 4);
        assert_eq!(flat.mipmap_levels, 3);

        let settings = TileDatabaseSettings {
            image_layer: "{z}/{x}/{y}.img".into(),
            ..Default::default()
        };
        let round = TileReader::new(Arc::new(settings)).unwrap();
        let options = Options {
            ecef_resolution: 8,
            ..options
        };
        let tile = round.create_tile(&extents, image, None, &options);
        assert_eq!(tile.vertices.len(), 64);
        assert!(tile.origin.length() > 6.3e6);
    }

    #[test]
    fn reads_through_the_registry() {
        let (reader, mut options) = reader(3, &[]);
        let reader = Arc::new(reader);
        options.registry.add_first(reader.clone());
        match options.read("0 0 1.tile").unwrap() {
            Some(ReadObject::Node(node)) => assert_eq!(placeholder_names(&node).len(), 4),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(options.read(ROOT_TILE), Ok(Some(ReadObject::Node(_)))));
        assert!(options.read("9 9 1.tile").is_err());
        assert_eq!(reader.statistics().num_tiles_read, 6);
    }

    #[test]
    fn root_request_may_carry_directories() {
        let (reader, options) = reader(3, &[]);
        match reader.read("db/root.tile", &options).unwrap() {
            Some(ReadObject::Node(root)) => assert_eq!(placeholder_names(&root).len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            reader.read("db/notroot.tile", &options),
            Err(TileError::InvalidTileName(_))
        ));
    }
}
