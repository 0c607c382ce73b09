mod cartographic;
mod epsilon;

pub use cartographic::*;
pub use epsilon::*;

pub fn equals_epsilon(
    left: f64,
    right: f64,
    relative_epsilon: Option<f64>,
    absolute_epsilon: Option<f64>,
) -> bool {
    let relative_epsilon = relative_epsilon.unwrap_or(0.0);
    let absolute_epsilon = absolute_epsilon.unwrap_or(relative_epsilon);
    let diff = (left - right).abs();
    diff <= absolute_epsilon || diff <= relative_epsilon * left.abs()
}

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Serde adapter storing a `DVec3` as a plain `[x, y, z]` array.
pub mod dvec3_serde {
    use bevy::math::DVec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &DVec3, serializer: S) -> Result<S::Ok, S::Error> {
        value.to_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DVec3, D::Error> {
        let array = <[f64; 3]>::deserialize(deserializer)?;
        Ok(DVec3::from_array(array))
    }
}
