use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::math::{self, Cartographic};

/// An oblate ellipsoid of revolution used to lift geodetic positions into
/// the earth-centred earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "EllipsoidRadii", into = "EllipsoidRadii")]
pub struct Ellipsoid {
    pub radii: DVec3,
    pub radii_squared: DVec3,
    pub one_over_radii: DVec3,
    pub one_over_radii_squared: DVec3,
    pub minimum_radius: f64,
    pub maximum_radius: f64,
}

#[derive(Serialize, Deserialize)]
struct EllipsoidRadii {
    radius_equator: f64,
    radius_polar: f64,
}

impl From<EllipsoidRadii> for Ellipsoid {
    fn from(value: EllipsoidRadii) -> Self {
        Ellipsoid::from_equator_and_polar(value.radius_equator, value.radius_polar)
    }
}

impl From<Ellipsoid> for EllipsoidRadii {
    fn from(value: Ellipsoid) -> Self {
        EllipsoidRadii {
            radius_equator: value.radius_equator(),
            radius_polar: value.radius_polar(),
        }
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

macro_rules! ellipsoid {
    ($x:expr, $y:expr, $z:expr, $min:expr, $max:expr) => {
        Ellipsoid {
            radii: DVec3::new($x, $y, $z),
            radii_squared: DVec3::new($x * $x, $y * $y, $z * $z),
            one_over_radii: DVec3::new(1.0 / $x, 1.0 / $y, 1.0 / $z),
            one_over_radii_squared: DVec3::new(
                1.0 / ($x * $x),
                1.0 / ($y * $y),
                1.0 / ($z * $z),
            ),
            minimum_radius: $min,
            maximum_radius: $max,
        }
    };
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = ellipsoid!(
        6378137.0,
        6378137.0,
        6356752.3142451793,
        6356752.3142451793,
        6378137.0
    );
    pub const UNIT_SPHERE: Ellipsoid = ellipsoid!(1.0, 1.0, 1.0, 1.0, 1.0);

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        ellipsoid!(x, y, z, x.min(y).min(z), x.max(y).max(z))
    }

    pub fn from_equator_and_polar(radius_equator: f64, radius_polar: f64) -> Self {
        Ellipsoid::new(radius_equator, radius_equator, radius_polar)
    }

    pub fn radius_equator(&self) -> f64 {
        self.radii.x
    }

    pub fn radius_polar(&self) -> f64 {
        self.radii.z
    }

    pub fn flattening(&self) -> f64 {
        (self.radii.x - self.radii.z) / self.radii.x
    }

    pub fn eccentricity_squared(&self) -> f64 {
        1.0 - self.radii_squared.z / self.radii_squared.x
    }

    /// Unit normal of the ellipsoid surface at a geodetic position.
    pub fn geodetic_surface_normal_cartographic(&self, cartographic: &Cartographic) -> DVec3 {
        let cos_latitude = cartographic.latitude.cos();
        DVec3::new(
            cos_latitude * cartographic.longitude.cos(),
            cos_latitude * cartographic.longitude.sin(),
            cartographic.latitude.sin(),
        )
        .normalize()
    }

    /// Unit normal of the ellipsoid surface under an ECEF position. `None`
    /// at the centre where no normal exists.
    pub fn geodetic_surface_normal(&self, position: DVec3) -> Option<DVec3> {
        if position.abs_diff_eq(DVec3::ZERO, math::EPSILON14) {
            return None;
        }
        Some((position * self.one_over_radii_squared).normalize())
    }

    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(cartographic);
        let k = self.radii_squared * n;
        let gamma = n.dot(k).sqrt();
        k / gamma + n * cartographic.height
    }

    /// Iterative ECEF to geodetic conversion. `None` at the centre.
    pub fn cartesian_to_cartographic(&self, position: DVec3) -> Option<Cartographic> {
        let a = self.radii.x;
        let b = self.radii.z;
        let e2 = self.eccentricity_squared();
        let p = (position.x * position.x + position.y * position.y).sqrt();

        if p < math::EPSILON10 {
            if position.z.abs() < math::EPSILON10 {
                return None;
            }
            let latitude = std::f64::consts::FRAC_PI_2.copysign(position.z);
            return Some(Cartographic::from_radians(0.0, latitude, position.z.abs() - b));
        }

        let longitude = position.y.atan2(position.x);
        let mut latitude = position.z.atan2(p * (1.0 - e2));
        let mut height = 0.0;
        for _ in 0..10 {
            let sin_latitude = latitude.sin();
            let n = a / (1.0 - e2 * sin_latitude * sin_latitude).sqrt();
            height = p / latitude.cos() - n;
            let next = position.z.atan2(p * (1.0 - e2 * n / (n + height)));
            let converged = (next - latitude).abs() < math::EPSILON15;
            latitude = next;
            if converged {
                break;
            }
        }
        Some(Cartographic::from_radians(longitude, latitude, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{equals_epsilon, EPSILON7};

    const SPACE_CARTESIAN: DVec3 =
        DVec3::new(4582719.8827300891, -4582719.8827300882, 1725510.4250797231);

    fn space_cartographic() -> Cartographic {
        Cartographic::from_degrees(-45.0, 15.0, 330000.0)
    }

    #[test]
    fn wgs84_constants() {
        let ellipsoid = Ellipsoid::WGS84;
        assert_eq!(ellipsoid.minimum_radius, 6356752.3142451793);
        assert_eq!(ellipsoid.maximum_radius, 6378137.0);
        assert!(equals_epsilon(
            ellipsoid.flattening(),
            1.0 / 298.257223563,
            Some(1e-9),
            None
        ));
    }

    #[test]
    fn cartographic_to_cartesian_work() {
        let result = Ellipsoid::WGS84.cartographic_to_cartesian(&space_cartographic());
        assert!(result.abs_diff_eq(SPACE_CARTESIAN, 1e-3));
    }

    #[test]
    fn cartesian_to_cartographic_work() {
        let result = Ellipsoid::WGS84
            .cartesian_to_cartographic(SPACE_CARTESIAN)
            .unwrap();
        assert!(result.equals_epsilon(&space_cartographic(), 1e-5));
    }

    #[test]
    fn cartesian_to_cartographic_at_pole() {
        let ellipsoid = Ellipsoid::WGS84;
        let pole = DVec3::new(0.0, 0.0, ellipsoid.radius_polar() + 10.0);
        let result = ellipsoid.cartesian_to_cartographic(pole).unwrap();
        assert!(equals_epsilon(
            result.latitude,
            std::f64::consts::FRAC_PI_2,
            Some(EPSILON7),
            None
        ));
        assert!(equals_epsilon(result.height, 10.0, None, Some(EPSILON7)));
        assert!(ellipsoid.cartesian_to_cartographic(DVec3::ZERO).is_none());
    }

    #[test]
    fn surface_normal_points_outwards() {
        let ellipsoid = Ellipsoid::WGS84;
        let normal = ellipsoid
            .geodetic_surface_normal(DVec3::new(ellipsoid.radius_equator(), 0.0, 0.0))
            .unwrap();
        assert!(normal.abs_diff_eq(DVec3::X, EPSILON7));
        assert!(ellipsoid.geodetic_surface_normal(DVec3::ZERO).is_none());
    }

    #[test]
    fn serializes_as_radii() {
        let json = serde_json::to_string(&Ellipsoid::WGS84).unwrap();
        assert!(json.contains("radius_equator"));
        let back: Ellipsoid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Ellipsoid::WGS84);
    }
}
