use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::math::dvec3_serde;

/// Axis aligned box in the database's working frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    #[serde(with = "dvec3_serde")]
    pub min: DVec3,
    #[serde(with = "dvec3_serde")]
    pub max: DVec3,
}

impl Default for Extents {
    /// The whole globe in degrees with a unit height range.
    fn default() -> Self {
        Extents::new(DVec3::new(-180.0, -90.0, 0.0), DVec3::new(180.0, 90.0, 1.0))
    }
}

impl Extents {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Extents { min, max }
    }

    /// An inverted box that any `expand_by` call replaces.
    pub fn empty() -> Self {
        Extents {
            min: DVec3::splat(f64::MAX),
            max: DVec3::splat(f64::MIN),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn depth(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Strictly ordered on every axis.
    pub fn is_valid(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y && self.min.z < self.max.z
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn expand_by(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}
