//! PNG and JPEG through the `image` crate. Neither carries georeferencing;
//! an embedded EXIF block is reported as `EXIF_<Tag>=...` metadata.

use std::io::Cursor;

use exif::{Exif, In, Tag, Value};
use geotile_scene::PixelData;
use image::DynamicImage;

use crate::dataset::{BandDescription, ColorInterpretation, RasterSource};
use crate::driver::Driver;
use crate::RasterError;

pub(crate) fn png_driver() -> Driver {
    Driver {
        short_name: "PNG",
        long_name: "Portable Network Graphics",
        extensions: &["png"],
        magic: &[b"\x89PNG\r\n\x1a\n"],
        open,
    }
}

pub(crate) fn jpeg_driver() -> Driver {
    Driver {
        short_name: "JPEG",
        long_name: "JPEG JFIF",
        extensions: &["jpg", "jpeg"],
        magic: &[b"\xFF\xD8\xFF"],
        open,
    }
}

struct DecodedImage {
    width: u32,
    height: u32,
    bands: Vec<BandDescription>,
    pixels: Vec<PixelData>,
    metadata: Vec<String>,
}

fn roles(channels: usize) -> &'static [ColorInterpretation] {
    use ColorInterpretation::*;
    match channels {
        1 => &[Gray],
        2 => &[Gray, Alpha],
        3 => &[Red, Green, Blue],
        _ => &[Red, Green, Blue, Alpha],
    }
}

fn split<T: Copy>(data: &[T], channels: usize) -> Vec<Vec<T>> {
    (0..channels)
        .map(|c| data.iter().skip(c).step_by(channels).copied().collect())
        .collect()
}

/// Numbers each in brackets, `(51) (30) (12.5)`; text as is.
fn exif_value(value: &Value) -> Option<String> {
    fn bracketed<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
        items
            .into_iter()
            .map(|v| format!("({})", v.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    Some(match value {
        Value::Ascii(strings) => strings
            .iter()
            .map(|s| String::from_utf8_lossy(s).trim_end_matches('\0').to_owned())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Byte(v) => bracketed(v),
        Value::Short(v) => bracketed(v),
        Value::Long(v) => bracketed(v),
        Value::SByte(v) => bracketed(v),
        Value::SShort(v) => bracketed(v),
        Value::SLong(v) => bracketed(v),
        Value::Float(v) => bracketed(v),
        Value::Double(v) => bracketed(v),
        Value::Rational(v) => bracketed(v.iter().map(|r| r.to_f64())),
        Value::SRational(v) => bracketed(v.iter().map(|r| r.to_f64())),
        _ => return None,
    })
}

fn exif_metadata(exif: &Exif) -> Vec<String> {
    const POINTERS: [Tag; 3] = [
        Tag::ExifIFDPointer,
        Tag::GPSInfoIFDPointer,
        Tag::InteropIFDPointer,
    ];
    exif.fields()
        .filter(|field| field.ifd_num == In::PRIMARY && field.tag.description().is_some())
        .filter(|field| !POINTERS.contains(&field.tag))
        .filter_map(|field| {
            exif_value(&field.value).map(|value| format!("EXIF_{}={}", field.tag, value))
        })
        .collect()
}

fn read_exif(name: &str, bytes: &[u8]) -> Vec<String> {
    match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif_metadata(&exif),
        Err(exif::Error::NotFound(_)) => Vec::new(),
        Err(e) => {
            bevy::log::debug!("ignoring EXIF block of {}: {}", name, e);
            Vec::new()
        }
    }
}

fn open(name: &str, bytes: Vec<u8>) -> Result<Box<dyn RasterSource>, RasterError> {
    let image = image::load_from_memory(&bytes).map_err(|e| RasterError::open_failure(name, e))?;
    let (width, height) = (image.width(), image.height());
    let channels = usize::from(image.color().channel_count());

    let pixels: Vec<PixelData> = match image {
        DynamicImage::ImageLuma8(b) => split(b.as_raw(), 1).into_iter().map(PixelData::U8).collect(),
        DynamicImage::ImageLumaA8(b) => split(b.as_raw(), 2).into_iter().map(PixelData::U8).collect(),
        DynamicImage::ImageRgb8(b) => split(b.as_raw(), 3).into_iter().map(PixelData::U8).collect(),
        DynamicImage::ImageRgba8(b) => split(b.as_raw(), 4).into_iter().map(PixelData::U8).collect(),
        DynamicImage::ImageLuma16(b) => split(b.as_raw(), 1).into_iter().map(PixelData::U16).collect(),
        DynamicImage::ImageLumaA16(b) => split(b.as_raw(), 2).into_iter().map(PixelData::U16).collect(),
        DynamicImage::ImageRgb16(b) => split(b.as_raw(), 3).into_iter().map(PixelData::U16).collect(),
        DynamicImage::ImageRgba16(b) => split(b.as_raw(), 4).into_iter().map(PixelData::U16).collect(),
        DynamicImage::ImageRgb32F(b) => split(b.as_raw(), 3).into_iter().map(PixelData::F32).collect(),
        DynamicImage::ImageRgba32F(b) => split(b.as_raw(), 4).into_iter().map(PixelData::F32).collect(),
        other => split(other.to_rgba8().as_raw(), 4)
            .into_iter()
            .map(PixelData::U8)
            .collect(),
    };

    let bands = pixels
        .iter()
        .zip(roles(channels.min(pixels.len())).iter())
        .map(|(p, role)| BandDescription {
            data_type: p.data_type(),
            color_interpretation: *role,
            block_size: (width, 1),
            no_data: None,
            metadata: Vec::new(),
        })
        .collect();

    Ok(Box::new(DecodedImage {
        width,
        height,
        bands,
        pixels,
        metadata: read_exif(name, &bytes),
    }))
}

impl RasterSource for DecodedImage {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn bands(&self) -> &[BandDescription] {
        &self.bands
    }

    fn read_band(&self, index: usize) -> Result<PixelData, RasterError> {
        self.pixels
            .get(index)
            .cloned()
            .ok_or(RasterError::BandOutOfRange {
                index,
                count: self.pixels.len(),
            })
    }

    fn projection_ref(&self) -> Option<&str> {
        None
    }

    fn geo_transform(&self) -> Option<[f64; 6]> {
        None
    }

    fn metadata(&self) -> &[String] {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageFormat, Rgb};

    use crate::{exif_gps_position, open_dataset_from_bytes, parse_meta_data, ColorInterpretation};
    use geotile_scene::PixelData;

    fn png_bytes() -> Vec<u8> {
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 200]));
        let mut bytes = Cursor::new(Vec::new());
        buffer.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn png_bands_are_split() {
        let dataset = open_dataset_from_bytes("tile.png", png_bytes()).unwrap();
        assert_eq!(dataset.driver_name(), "PNG");
        assert_eq!(dataset.raster_x_size(), 3);
        assert_eq!(dataset.raster_y_size(), 2);
        assert_eq!(dataset.raster_count(), 3);
        assert!(dataset.projection_ref().is_none());
        assert!(dataset.geo_transform().is_none());

        let red = dataset.band(0).unwrap();
        assert_eq!(red.color_interpretation(), ColorInterpretation::Red);
        assert_eq!(red.read().unwrap(), PixelData::U8(vec![0, 1, 2, 0, 1, 2]));
        let blue = dataset.band(2).unwrap();
        assert_eq!(blue.read().unwrap(), PixelData::U8(vec![200; 6]));
    }

    #[test]
    fn corrupt_png_is_an_open_failure() {
        let mut bytes = png_bytes();
        bytes.truncate(20);
        assert!(matches!(
            open_dataset_from_bytes("tile.png", bytes),
            Err(crate::RasterError::OpenFailure { .. })
        ));
    }

    /// Little endian TIFF block holding only a GPS IFD: 33° 51' 36" S,
    /// 151° 12' 0" W, 58.5 m.
    fn gps_exif() -> Vec<u8> {
        fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&kind.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&value);
        }
        const ASCII: u16 = 2;
        const BYTE: u16 = 1;
        const LONG: u16 = 4;
        const RATIONAL: u16 = 5;

        let mut tiff = b"II*\0".to_vec();
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0 at 8: the GPS pointer only, GPS IFD at 26
        tiff.extend_from_slice(&1u16.to_le_bytes());
        entry(&mut tiff, 0x8825, LONG, 1, 26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        // GPS IFD: 6 entries, values from 104
        tiff.extend_from_slice(&6u16.to_le_bytes());
        entry(&mut tiff, 0x0001, ASCII, 2, *b"S\0\0\0");
        entry(&mut tiff, 0x0002, RATIONAL, 3, 104u32.to_le_bytes());
        entry(&mut tiff, 0x0003, ASCII, 2, *b"W\0\0\0");
        entry(&mut tiff, 0x0004, RATIONAL, 3, 128u32.to_le_bytes());
        entry(&mut tiff, 0x0005, BYTE, 1, [0, 0, 0, 0]);
        entry(&mut tiff, 0x0006, RATIONAL, 1, 152u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(tiff.len(), 104);
        for (num, den) in [(33u32, 1u32), (51, 1), (36, 1), (151, 1), (12, 1), (0, 1), (117, 2)] {
            tiff.extend_from_slice(&num.to_le_bytes());
            tiff.extend_from_slice(&den.to_le_bytes());
        }
        tiff
    }

    fn jpeg_with_exif(exif: &[u8]) -> Vec<u8> {
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(8, 8, |_, _| Rgb([90, 120, 150]));
        let mut encoded = Cursor::new(Vec::new());
        buffer.write_to(&mut encoded, ImageFormat::Jpeg).unwrap();
        let encoded = encoded.into_inner();

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(exif);
        let mut bytes = encoded[..2].to_vec();
        bytes.extend_from_slice(&[0xFF, 0xE1]);
        bytes.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
        bytes.extend_from_slice(&payload);
        bytes.extend_from_slice(&encoded[2..]);
        bytes
    }

    #[test]
    fn jpeg_exif_gps_becomes_metadata() {
        let dataset = open_dataset_from_bytes("photo.jpg", jpeg_with_exif(&gps_exif())).unwrap();
        assert_eq!(dataset.driver_name(), "JPEG");
        assert_eq!(dataset.raster_count(), 3);
        assert_eq!(dataset.metadata_item("EXIF_GPSLatitude"), Some("(33) (51) (36)"));
        assert_eq!(dataset.metadata_item("EXIF_GPSLatitudeRef"), Some("S"));
        assert!(dataset.metadata_item("EXIF_GPSInfoIFDPointer").is_none());

        let position = exif_gps_position(&parse_meta_data(dataset.metadata())).unwrap();
        assert!((position.latitude + 33.86).abs() < 1e-9);
        assert!((position.longitude + 151.2).abs() < 1e-9);
        assert_eq!(position.altitude, Some(58.5));
    }

    #[test]
    fn images_without_exif_have_no_metadata() {
        let dataset = open_dataset_from_bytes("tile.png", png_bytes()).unwrap();
        assert!(dataset.metadata().is_empty());
    }
}
