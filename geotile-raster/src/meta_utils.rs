//! Reading values out of metadata strings shaped like `(12) (34) (56.7)`,
//! the layout EXIF GPS tags are reported in.

use std::str::FromStr;

use geotile_scene::{Attributes, Object};

/// Sequential reader over whitespace separated fields, each either bare or
/// wrapped in one pair of parentheses. Best effort: an unterminated
/// bracket yields whatever was read up to the end of input.
pub struct BracketedFields<'a> {
    rest: &'a str,
}

impl<'a> BracketedFields<'a> {
    pub fn new(input: &'a str) -> Self {
        BracketedFields { rest: input }
    }

    /// The next field with its brackets removed, `None` at end of input.
    pub fn next_str(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        if let Some(inner) = self.rest.strip_prefix('(') {
            match inner.find(')') {
                Some(end) => {
                    self.rest = &inner[end + 1..];
                    Some(&inner[..end])
                }
                None => {
                    self.rest = "";
                    Some(inner)
                }
            }
        } else {
            let end = self
                .rest
                .find(char::is_whitespace)
                .unwrap_or(self.rest.len());
            let (field, rest) = self.rest.split_at(end);
            self.rest = rest;
            Some(field)
        }
    }

    /// The next field parsed as `T`. `None` at end of input or when the
    /// field does not parse.
    pub fn next<T: FromStr>(&mut self) -> Option<T> {
        self.next_str()?.trim().parse().ok()
    }

    pub fn remaining(&self) -> &'a str {
        self.rest
    }
}

/// Decimal degrees from `(degrees) (minutes) (seconds)`. Missing or
/// malformed fields count as zero.
pub fn dms_in_brackets(input: &str) -> f64 {
    let mut fields = BracketedFields::new(input);
    let degrees: f64 = fields.next().unwrap_or(0.0);
    let minutes: f64 = fields.next().unwrap_or(0.0);
    let seconds: f64 = fields.next().unwrap_or(0.0);
    degrees + (minutes + seconds / 60.0) / 60.0
}

/// Position recorded in EXIF GPS tags, angles in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

/// Reads `EXIF_GPSLatitude`/`EXIF_GPSLongitude` (and their `Ref` hemisphere
/// tags) plus the optional altitude from a flattened metadata map.
pub fn exif_gps_position(attributes: &Attributes) -> Option<GpsPosition> {
    let hemisphere = |key: &str, negative: char| {
        attributes
            .get_value(key)
            .and_then(|v| BracketedFields::new(v).next_str())
            .map(|v| v.trim().starts_with(negative))
            .unwrap_or(false)
    };

    let mut latitude = dms_in_brackets(attributes.get_value("EXIF_GPSLatitude")?);
    if hemisphere("EXIF_GPSLatitudeRef", 'S') {
        latitude = -latitude;
    }
    let mut longitude = dms_in_brackets(attributes.get_value("EXIF_GPSLongitude")?);
    if hemisphere("EXIF_GPSLongitudeRef", 'W') {
        longitude = -longitude;
    }
    let altitude = attributes
        .get_value("EXIF_GPSAltitude")
        .and_then(|v| BracketedFields::new(v).next::<f64>())
        .map(|a| if hemisphere("EXIF_GPSAltitudeRef", '1') { -a } else { a });

    Some(GpsPosition {
        latitude,
        longitude,
        altitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotile_scene::equals_epsilon;

    #[test]
    fn dms_conversion() {
        let value = dms_in_brackets("(51) (30) (12.5)");
        assert!(equals_epsilon(
            value,
            51.0 + (30.0 + 12.5 / 60.0) / 60.0,
            Some(1e-12),
            None
        ));
        assert!((value - 51.5035).abs() < 1e-4);
    }

    #[test]
    fn bare_and_bracketed_fields() {
        let mut fields = BracketedFields::new("  (12) 34 (hello world)");
        assert_eq!(fields.next::<i32>(), Some(12));
        assert_eq!(fields.next::<i32>(), Some(34));
        assert_eq!(fields.next_str(), Some("hello world"));
        assert_eq!(fields.next_str(), None);
    }

    #[test]
    fn any_whitespace_separates_fields() {
        let mut fields = BracketedFields::new("\t(1)\t2\n (3)\r\n");
        assert_eq!(fields.next::<i32>(), Some(1));
        assert_eq!(fields.next::<i32>(), Some(2));
        assert_eq!(fields.next::<i32>(), Some(3));
        assert_eq!(fields.next_str(), None);

        assert_eq!(BracketedFields::new("\t").next_str(), None);
        assert_eq!(dms_in_brackets("(10)\t(30)\t(0)"), 10.5);
    }

    #[test]
    fn unterminated_bracket_reads_to_end() {
        let mut fields = BracketedFields::new("(12.5");
        assert_eq!(fields.next::<f64>(), Some(12.5));
        assert_eq!(fields.remaining(), "");
        assert_eq!(dms_in_brackets("(10) (30"), 10.5);
    }

    #[test]
    fn malformed_fields_count_as_zero() {
        assert_eq!(dms_in_brackets("(ten) (30) (0)"), 0.5);
        assert_eq!(dms_in_brackets(""), 0.0);
    }

    #[test]
    fn gps_position_with_hemispheres() {
        let mut attributes = Attributes::new();
        attributes.set_value("EXIF_GPSLatitude", "(33) (51) (36)");
        attributes.set_value("EXIF_GPSLatitudeRef", "(S)");
        attributes.set_value("EXIF_GPSLongitude", "(151) (12) (0)");
        attributes.set_value("EXIF_GPSLongitudeRef", "E");
        attributes.set_value("EXIF_GPSAltitude", "(58.5)");
        let position = exif_gps_position(&attributes).unwrap();
        assert!((position.latitude + 33.86).abs() < 1e-9);
        assert!((position.longitude - 151.2).abs() < 1e-9);
        assert_eq!(position.altitude, Some(58.5));
    }

    #[test]
    fn gps_position_needs_both_angles() {
        let mut attributes = Attributes::new();
        attributes.set_value("EXIF_GPSLatitude", "(33) (51) (36)");
        assert!(exif_gps_position(&attributes).is_none());
    }
}
