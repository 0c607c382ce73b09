use std::fs;
use std::path::Path;

use bevy::math::DVec3;
use geotile_scene::{Ellipsoid, Extents};
use serde::{Deserialize, Serialize};

use crate::TileError;

/// Everything a tile database needs to know about its tile set. The
/// defaults describe the readymap imagery layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileDatabaseSettings {
    pub extents: Extents,
    pub no_x: u32,
    pub no_y: u32,
    pub max_level: u32,
    pub origin_top_left: bool,
    pub lod_transition_screen_height_ratio: f64,
    pub projection: String,
    /// Round earth tiles when set, flat quads otherwise.
    pub ellipsoid_model: Option<Ellipsoid>,
    pub image_layer: String,
    pub terrain_layer: Option<String>,
    pub mipmap_levels_hint: u32,
}

impl Default for TileDatabaseSettings {
    fn default() -> Self {
        TileDatabaseSettings {
            extents: Extents::new(
                DVec3::new(-180.0, -90.0, 0.0),
                DVec3::new(180.0, 90.0, 1.0),
            ),
            no_x: 2,
            no_y: 1,
            max_level: 22,
            origin_top_left: true,
            lod_transition_screen_height_ratio: 0.25,
            projection: String::new(),
            ellipsoid_model: Some(Ellipsoid::WGS84),
            image_layer: String::new(),
            terrain_layer: None,
            mipmap_levels_hint: 16,
        }
    }
}

impl TileDatabaseSettings {
    /// readymap.org imagery with its elevation layer.
    pub fn readymap() -> Self {
        TileDatabaseSettings {
            max_level: 10,
            origin_top_left: false,
            image_layer: "http://readymap.org/readymap/tiles/1.0.0/7/{z}/{x}/{y}.jpeg".into(),
            terrain_layer: Some(
                "http://readymap.org/readymap/tiles/1.0.0/116/{z}/{x}/{y}.tif".into(),
            ),
            ..Default::default()
        }
    }

    /// OpenStreetMap tiles in spherical mercator.
    pub fn open_street_map() -> Self {
        TileDatabaseSettings {
            no_x: 1,
            no_y: 1,
            max_level: 17,
            origin_top_left: true,
            projection: "EPSG:3857".into(),
            image_layer: "http://a.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), TileError> {
        let invalid = |reason: String| Err(TileError::InvalidSettings(reason));
        if self.no_x == 0 || self.no_y == 0 {
            return invalid(format!(
                "the root grid must have at least one tile, got {}x{}",
                self.no_x, self.no_y
            ));
        }
        if !self.extents.is_valid() {
            return invalid(format!(
                "extents {:?} to {:?} are empty on some axis",
                self.extents.min, self.extents.max
            ));
        }
        let (tiles_x, tiles_y) = self.tiles_at_level(self.max_level);
        if tiles_x > u64::from(u32::MAX) || tiles_y > u64::from(u32::MAX) {
            return invalid(format!(
                "max level {} overflows the tile addresses",
                self.max_level
            ));
        }
        if !(self.lod_transition_screen_height_ratio.is_finite()
            && self.lod_transition_screen_height_ratio > 0.0)
        {
            return invalid(format!(
                "lod transition ratio {} must be positive",
                self.lod_transition_screen_height_ratio
            ));
        }
        if self.image_layer.is_empty() {
            return invalid("no image layer".into());
        }
        self.get_tile_path(&self.image_layer, 0, 0, 0)?;
        if let Some(terrain) = &self.terrain_layer {
            self.get_tile_path(terrain, 0, 0, 0)?;
        }
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, TileError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TileError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_readymap_layout() {
        let settings = TileDatabaseSettings::default();
        assert_eq!(settings.no_x, 2);
        assert_eq!(settings.no_y, 1);
        assert_eq!(settings.max_level, 22);
        assert!(settings.origin_top_left);
        assert_eq!(settings.lod_transition_screen_height_ratio, 0.25);
        assert_eq!(settings.mipmap_levels_hint, 16);
        assert_eq!(settings.ellipsoid_model, Some(Ellipsoid::WGS84));
        // no image layer yet
        assert!(settings.validate().is_err());
    }

    #[test]
    fn presets_validate() {
        let readymap = TileDatabaseSettings::readymap();
        readymap.validate().unwrap();
        assert_eq!(readymap.max_level, 10);
        assert!(!readymap.origin_top_left);

        let osm = TileDatabaseSettings::open_street_map();
        osm.validate().unwrap();
        assert_eq!((osm.no_x, osm.no_y), (1, 1));
        assert_eq!(osm.projection, "EPSG:3857");
    }

    #[test]
    fn invariants_are_enforced() {
        let mut settings = TileDatabaseSettings::readymap();
        settings.no_y = 0;
        assert!(matches!(
            settings.validate(),
            Err(TileError::InvalidSettings(_))
        ));

        let mut settings = TileDatabaseSettings::readymap();
        settings.extents.max.z = settings.extents.min.z;
        assert!(matches!(
            settings.validate(),
            Err(TileError::InvalidSettings(_))
        ));

        let mut settings = TileDatabaseSettings::readymap();
        settings.max_level = 40;
        assert!(matches!(
            settings.validate(),
            Err(TileError::InvalidSettings(_))
        ));

        let mut settings = TileDatabaseSettings::readymap();
        settings.image_layer = "tiles/{x}/{y}.png".into();
        assert!(matches!(
            settings.validate(),
            Err(TileError::PathResolution(_))
        ));
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = TileDatabaseSettings::readymap();
        settings.write_json(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        let read = TileDatabaseSettings::read_json(&path).unwrap();
        assert_eq!(read.image_layer, settings.image_layer);
        assert_eq!(read.terrain_layer, settings.terrain_layer);
        assert_eq!(read.extents, settings.extents);
        assert_eq!(read.max_level, 10);
        assert_eq!(
            read.ellipsoid_model.map(|e| e.radii),
            settings.ellipsoid_model.map(|e| e.radii)
        );

        read.write_json(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: TileDatabaseSettings =
            serde_json::from_str(r#"{"image_layer": "{z}/{x}/{y}.png", "ellipsoid_model": null}"#)
                .unwrap();
        assert_eq!(settings.no_x, 2);
        assert!(settings.ellipsoid_model.is_none());
        settings.validate().unwrap();
    }
}
