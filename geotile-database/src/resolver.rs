//! Where a quad-tree address lives: its extents, its file and its
//! geographic position.

use std::collections::HashMap;

use bevy::math::DVec3;
use geotile_scene::Extents;
use new_string_template::template::Template;

use crate::{TileDatabaseSettings, TileError};

const FLIPPED_ROW: &str = "{-y}";

impl TileDatabaseSettings {
    /// Number of tiles along x and y at `level`.
    pub fn tiles_at_level(&self, level: u32) -> (u64, u64) {
        let scale = 1u64.checked_shl(level).unwrap_or(u64::MAX);
        (
            u64::from(self.no_x).saturating_mul(scale),
            u64::from(self.no_y).saturating_mul(scale),
        )
    }

    /// The part of the root extents covered by tile `(x, y)` at `level`.
    /// Each edge is computed directly from the tile index so neighbouring
    /// tiles share their edges exactly at every level.
    pub fn compute_tile_extents(&self, x: u32, y: u32, level: u32) -> Extents {
        let (tiles_x, tiles_y) = self.tiles_at_level(level);
        let (tiles_x, tiles_y) = (tiles_x as f64, tiles_y as f64);
        let root = &self.extents;
        let width = root.width();
        let height = root.height();

        let min_x = root.min.x + width * f64::from(x) / tiles_x;
        let max_x = root.min.x + width * f64::from(x + 1) / tiles_x;
        let (min_y, max_y) = if self.origin_top_left {
            (
                root.max.y - height * f64::from(y + 1) / tiles_y,
                root.max.y - height * f64::from(y) / tiles_y,
            )
        } else {
            (
                root.min.y + height * f64::from(y) / tiles_y,
                root.min.y + height * f64::from(y + 1) / tiles_y,
            )
        };
        Extents::new(
            DVec3::new(min_x, min_y, root.min.z),
            DVec3::new(max_x, max_y, root.max.z),
        )
    }

    /// Fills `template` for tile `(x, y)` at `level`.
    ///
    /// `{x}` is the column, `{y}` the row in this database's origin
    /// convention, `{-y}` the row counted from the opposite edge and `{z}` or
    /// `{level}` the level.
    pub fn get_tile_path(
        &self,
        template: &str,
        x: u32,
        y: u32,
        level: u32,
    ) -> Result<String, TileError> {
        let has = |placeholder: &str| template.contains(placeholder);
        if !has("{x}") || !(has("{y}") || has(FLIPPED_ROW)) || !(has("{z}") || has("{level}")) {
            return Err(TileError::PathResolution(template.to_owned()));
        }

        let (_, tiles_y) = self.tiles_at_level(level);
        let inverted_y = tiles_y.saturating_sub(u64::from(y) + 1);

        let x = x.to_string();
        let y = y.to_string();
        let level = level.to_string();
        let inverted_y = inverted_y.to_string();
        let mut data = HashMap::new();
        data.insert("x", x.as_str());
        data.insert("y", y.as_str());
        data.insert("z", level.as_str());
        data.insert("level", level.as_str());
        data.insert("inverted_y", inverted_y.as_str());

        Template::new(template.replace(FLIPPED_ROW, "{inverted_y}"))
            .render(&data)
            .map_err(|e| {
                bevy::log::warn!("could not fill tile path template '{}': {}", template, e);
                TileError::PathResolution(template.to_owned())
            })
    }

    /// (latitude, longitude, altitude) in degrees for a point in the working
    /// frame. Spherical mercator frames stretch y over +-90 degrees.
    pub fn compute_latitude_longitude_altitude(&self, point: DVec3) -> DVec3 {
        match self.projection.as_str() {
            "EPSG:3857" | "spherical-mercator" => {
                let n = 2.0 * point.y.to_radians();
                DVec3::new(n.sinh().atan().to_degrees(), point.x, point.z)
            }
            _ => DVec3::new(point.y, point.x, point.z),
        }
    }
}
