use bevy::math::DVec3;

use crate::Extents;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        BoundingSphere { center, radius }
    }

    /// Sphere around the axis aligned box of `positions`. Empty input gives
    /// a zero sphere at the origin.
    pub fn from_points(positions: &[DVec3]) -> Self {
        let Some(first) = positions.first() else {
            return BoundingSphere::default();
        };
        let mut min = *first;
        let mut max = *first;
        for position in positions.iter().skip(1) {
            min = min.min(*position);
            max = max.max(*position);
        }
        let center = (min + max) * 0.5;
        let radius = positions
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0_f64, f64::max)
            .sqrt();
        BoundingSphere { center, radius }
    }

    pub fn from_extents(extents: &Extents) -> Self {
        let center = extents.center();
        BoundingSphere {
            center,
            radius: (extents.max - center).length(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.radius >= 0.0
    }

    /// Smallest sphere enclosing both spheres.
    pub fn union(&self, other: &BoundingSphere) -> BoundingSphere {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }
        let offset = other.center - self.center;
        let distance = offset.length();
        if distance + other.radius <= self.radius {
            return *self;
        }
        if distance + self.radius <= other.radius {
            return *other;
        }
        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = self.center + offset * ((radius - self.radius) / distance);
        BoundingSphere { center, radius }
    }
}
