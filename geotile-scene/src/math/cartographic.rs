use std::fmt;

/// A geodetic position: longitude and latitude in radians, height in metres
/// above the ellipsoid.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    pub const ZERO: Cartographic = Cartographic {
        longitude: 0.0,
        latitude: 0.0,
        height: 0.0,
    };

    pub fn from_radians(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude,
            latitude,
            height,
        }
    }

    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude: longitude.to_radians(),
            latitude: latitude.to_radians(),
            height,
        }
    }

    /// Returns `(longitude, latitude, height)` with the angles in degrees.
    pub fn to_degrees(&self) -> (f64, f64, f64) {
        (
            self.longitude.to_degrees(),
            self.latitude.to_degrees(),
            self.height,
        )
    }

    pub fn equals_epsilon(&self, right: &Cartographic, epsilon: f64) -> bool {
        (self.longitude - right.longitude).abs() <= epsilon
            && (self.latitude - right.latitude).abs() <= epsilon
            && (self.height - right.height).abs() <= epsilon
    }
}

impl fmt::Display for Cartographic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (longitude, latitude, height) = self.to_degrees();
        write!(
            f,
            "Cartographic {{ longitude: {}, latitude: {}, height: {} }}",
            longitude, latitude, height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_round_trip() {
        let c = Cartographic::from_degrees(150.0, -40.0, 100.0);
        let (lon, lat, height) = c.to_degrees();
        assert!((lon - 150.0).abs() < 1e-12);
        assert!((lat + 40.0).abs() < 1e-12);
        assert_eq!(height, 100.0);
    }
}
