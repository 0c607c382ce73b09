//! TIFF and GeoTIFF reading on top of the `tiff` crate.

use std::io::Cursor;
use std::sync::Arc;

use geotile_scene::{DataType, PixelData};
use parking_lot::Mutex;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::dataset::{BandDescription, ColorInterpretation, RasterSource};
use crate::driver::Driver;
use crate::RasterError;

// GeoTIFF and GDAL private tags
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

// GeoKeys
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

const ASCII_TAGS: [(u16, &str); 4] = [
    (270, "TIFFTAG_IMAGEDESCRIPTION"),
    (305, "TIFFTAG_SOFTWARE"),
    (306, "TIFFTAG_DATETIME"),
    (315, "TIFFTAG_ARTIST"),
];

pub(crate) fn driver() -> Driver {
    Driver {
        short_name: "GTiff",
        long_name: "GeoTIFF",
        extensions: &["tif", "tiff"],
        magic: &[b"II*\0", b"MM\0*", b"II+\0", b"MM\0+"],
        open,
    }
}

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

type TiffDecoder<'a> = Decoder<Cursor<&'a [u8]>>;

fn find_f64_vec(decoder: &mut TiffDecoder, code: u16) -> Result<Option<Vec<f64>>, RasterError> {
    Ok(decoder
        .find_tag(tag(code))?
        .map(|v| v.into_f64_vec())
        .transpose()?)
}

fn find_string(decoder: &mut TiffDecoder, code: u16) -> Result<Option<String>, RasterError> {
    Ok(decoder
        .find_tag(tag(code))?
        .map(|v| v.into_string())
        .transpose()?)
}

fn data_type(sample_format: u16, bits: u16) -> Result<DataType, RasterError> {
    match (sample_format, bits) {
        (1, 8) => Ok(DataType::U8),
        (2, 8) => Ok(DataType::I8),
        (1, 16) => Ok(DataType::U16),
        (2, 16) => Ok(DataType::I16),
        (1, 32) => Ok(DataType::U32),
        (2, 32) => Ok(DataType::I32),
        (3, 32) => Ok(DataType::F32),
        (3, 64) => Ok(DataType::F64),
        _ => Err(RasterError::UnsupportedDataType(format!(
            "sample format {} with {} bits",
            sample_format, bits
        ))),
    }
}

/// Colour role of sample `index` under the photometric interpretation,
/// extra samples flagged as associated or unassociated alpha become alpha.
fn color_interpretation(photometric: u16, extra_samples: &[u16], index: usize) -> ColorInterpretation {
    let (base, first_extra) = match photometric {
        0 | 1 => (vec![ColorInterpretation::Gray], 1),
        2 => (
            vec![
                ColorInterpretation::Red,
                ColorInterpretation::Green,
                ColorInterpretation::Blue,
            ],
            3,
        ),
        3 => (vec![ColorInterpretation::Palette], 1),
        _ => (Vec::new(), 0),
    };
    if let Some(role) = base.get(index) {
        return *role;
    }
    match index
        .checked_sub(first_extra)
        .and_then(|i| extra_samples.get(i))
    {
        Some(1) | Some(2) => ColorInterpretation::Alpha,
        _ => ColorInterpretation::Undefined,
    }
}

/// Geo-transform from a 4x4 model transformation or from pixel scale plus
/// tie point.
fn geo_transform(
    transformation: Option<&[f64]>,
    scale: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
) -> Option<[f64; 6]> {
    if let Some(m) = transformation.filter(|m| m.len() >= 16) {
        return Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
    }
    match (scale, tiepoint) {
        (Some(&[sx, sy, ..]), Some(&[i, j, _, x, y, ..])) => {
            Some([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy])
        }
        _ => None,
    }
}

/// Looks up an inline SHORT value in a GeoKeyDirectory.
fn geo_key(directory: &[u16], key: u16) -> Option<u16> {
    let count = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

fn projection_from_geo_keys(directory: &[u16]) -> Option<String> {
    [PROJECTED_CS_TYPE_GEO_KEY, GEOGRAPHIC_TYPE_GEO_KEY]
        .iter()
        .filter_map(|key| geo_key(directory, *key))
        .find(|code| *code != 0 && *code != USER_DEFINED)
        .map(|code| format!("EPSG:{}", code))
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", name);
    let start = attributes.find(&pattern)? + pattern.len();
    let end = attributes.get(start..)?.find('"')? + start;
    attributes.get(start..end)
}

/// An `<Item>` of a GDAL metadata document: name, band (if band level)
/// and value.
#[derive(Debug, PartialEq)]
struct MetadataItem {
    name: String,
    band: Option<usize>,
    value: String,
}

/// Pulls the default-domain items out of a `<GDALMetadata>` document.
fn parse_gdal_metadata(xml: &str) -> Vec<MetadataItem> {
    let mut items = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<Item") {
        rest = &rest[start + "<Item".len()..];
        let Some(tag_end) = rest.find('>') else { break };
        let attributes = &rest[..tag_end];
        rest = &rest[tag_end + 1..];
        let Some(value_end) = rest.find("</Item>") else { break };
        let value = &rest[..value_end];
        rest = &rest[value_end + "</Item>".len()..];

        if attribute(attributes, "domain").is_some() {
            continue;
        }
        if let Some(name) = attribute(attributes, "name") {
            items.push(MetadataItem {
                name: unescape(name),
                band: attribute(attributes, "sample").and_then(|s| s.parse().ok()),
                value: unescape(value),
            });
        }
    }
    items
}

struct TiffSource {
    name: String,
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    bands: Vec<BandDescription>,
    projection: Option<String>,
    geo_transform: Option<[f64; 6]>,
    metadata: Vec<String>,
    decoded: Mutex<Option<Arc<Vec<PixelData>>>>,
}

fn open(name: &str, bytes: Vec<u8>) -> Result<Box<dyn RasterSource>, RasterError> {
    let header = read_header(&bytes).map_err(|e| RasterError::open_failure(name, e))?;
    Ok(Box::new(TiffSource {
        name: name.to_owned(),
        bytes,
        width: header.width,
        height: header.height,
        bands: header.bands,
        projection: header.projection,
        geo_transform: header.geo_transform,
        metadata: header.metadata,
        decoded: Mutex::new(None),
    }))
}

struct Header {
    width: u32,
    height: u32,
    bands: Vec<BandDescription>,
    projection: Option<String>,
    geo_transform: Option<[f64; 6]>,
    metadata: Vec<String>,
}

fn read_header(bytes: &[u8]) -> Result<Header, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;

    let samples = decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
        .unwrap_or(1) as usize;
    let bits = decoder
        .find_tag_unsigned_vec::<u16>(Tag::BitsPerSample)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let sample_format = decoder
        .find_tag_unsigned_vec::<u16>(Tag::SampleFormat)?
        .and_then(|v| v.first().copied())
        .unwrap_or(1);
    let data_type = data_type(sample_format, bits)?;
    let photometric = decoder
        .find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)?
        .unwrap_or(1);
    let extra_samples = decoder
        .find_tag_unsigned_vec::<u16>(Tag::ExtraSamples)?
        .unwrap_or_default();

    let block_size = match (
        decoder.find_tag_unsigned::<u32>(Tag::TileWidth)?,
        decoder.find_tag_unsigned::<u32>(Tag::TileLength)?,
    ) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            let rows = decoder
                .find_tag_unsigned::<u32>(Tag::RowsPerStrip)?
                .unwrap_or(height);
            (width, rows.min(height))
        }
    };

    let no_data = find_string(&mut decoder, GDAL_NODATA)?
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

    let mut bands: Vec<BandDescription> = (0..samples)
        .map(|i| BandDescription {
            data_type,
            color_interpretation: color_interpretation(photometric, &extra_samples, i),
            block_size,
            no_data,
            metadata: Vec::new(),
        })
        .collect();

    let mut metadata = Vec::new();
    if let Some(xml) = find_string(&mut decoder, GDAL_METADATA)? {
        for item in parse_gdal_metadata(&xml) {
            let entry = format!("{}={}", item.name, item.value);
            match item.band {
                Some(band) => {
                    if let Some(description) = bands.get_mut(band) {
                        description.metadata.push(entry);
                    }
                }
                None => metadata.push(entry),
            }
        }
    }
    for (code, key) in ASCII_TAGS {
        if let Some(value) = find_string(&mut decoder, code)? {
            metadata.push(format!("{}={}", key, value.trim_end_matches(char::from(0))));
        }
    }

    let transformation = find_f64_vec(&mut decoder, MODEL_TRANSFORMATION)?;
    let scale = find_f64_vec(&mut decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64_vec(&mut decoder, MODEL_TIEPOINT)?;
    let mut transform = geo_transform(
        transformation.as_deref(),
        scale.as_deref(),
        tiepoint.as_deref(),
    );

    let geo_keys = decoder
        .find_tag_unsigned_vec::<u16>(tag(GEO_KEY_DIRECTORY))?
        .unwrap_or_default();
    let projection = projection_from_geo_keys(&geo_keys);
    if !geo_keys.is_empty() {
        let is_point = geo_key(&geo_keys, GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT);
        metadata.push(format!(
            "AREA_OR_POINT={}",
            if is_point { "Point" } else { "Area" }
        ));
        if let (true, Some(gt)) = (is_point, transform.as_mut()) {
            gt[0] -= 0.5 * gt[1] + 0.5 * gt[2];
            gt[3] -= 0.5 * gt[4] + 0.5 * gt[5];
        }
    }

    Ok(Header {
        width,
        height,
        bands,
        projection,
        geo_transform: transform,
        metadata,
    })
}

fn split_samples<T: Copy>(data: Vec<T>, samples: usize) -> Vec<Vec<T>> {
    if samples <= 1 {
        return vec![data];
    }
    (0..samples)
        .map(|s| data.iter().skip(s).step_by(samples).copied().collect())
        .collect()
}

impl TiffSource {
    fn decode(&self) -> Result<Arc<Vec<PixelData>>, RasterError> {
        let mut cache = self.decoded.lock();
        if let Some(bands) = cache.as_ref() {
            return Ok(bands.clone());
        }
        bevy::log::debug!("decoding pixels of {}", self.name);
        let mut decoder = Decoder::new(Cursor::new(self.bytes.as_slice()))?;
        let samples = self.bands.len();
        let bands: Vec<PixelData> = match decoder.read_image()? {
            DecodingResult::U8(v) => split_samples(v, samples).into_iter().map(PixelData::U8).collect(),
            DecodingResult::I8(v) => split_samples(v, samples).into_iter().map(PixelData::I8).collect(),
            DecodingResult::U16(v) => split_samples(v, samples).into_iter().map(PixelData::U16).collect(),
            DecodingResult::I16(v) => split_samples(v, samples).into_iter().map(PixelData::I16).collect(),
            DecodingResult::U32(v) => split_samples(v, samples).into_iter().map(PixelData::U32).collect(),
            DecodingResult::I32(v) => split_samples(v, samples).into_iter().map(PixelData::I32).collect(),
            DecodingResult::F32(v) => split_samples(v, samples).into_iter().map(PixelData::F32).collect(),
            DecodingResult::F64(v) => split_samples(v, samples).into_iter().map(PixelData::F64).collect(),
            _ => {
                return Err(RasterError::UnsupportedDataType(format!(
                    "64 bit integer samples in {}",
                    self.name
                )))
            }
        };
        let bands = Arc::new(bands);
        *cache = Some(bands.clone());
        Ok(bands)
    }
}

impl RasterSource for TiffSource {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn bands(&self) -> &[BandDescription] {
        &self.bands
    }

    fn read_band(&self, index: usize) -> Result<PixelData, RasterError> {
        let bands = self.decode()?;
        bands
            .get(index)
            .cloned()
            .ok_or(RasterError::BandOutOfRange {
                index,
                count: bands.len(),
            })
    }

    fn projection_ref(&self) -> Option<&str> {
        self.projection.as_deref()
    }

    fn geo_transform(&self) -> Option<[f64; 6]> {
        self.geo_transform
    }

    fn metadata(&self) -> &[String] {
        &self.metadata
    }
}
