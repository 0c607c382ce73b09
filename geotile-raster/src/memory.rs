use std::sync::Arc;

use geotile_scene::PixelData;

use crate::dataset::{BandDescription, ColorInterpretation, Dataset, DatasetHandle, RasterSource};
use crate::RasterError;

/// In-memory raster, built up band by band.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    width: u32,
    height: u32,
    bands: Vec<BandDescription>,
    pixels: Vec<PixelData>,
    projection: Option<String>,
    geo_transform: Option<[f64; 6]>,
    metadata: Vec<String>,
}

impl MemoryDataset {
    pub fn new(width: u32, height: u32) -> Self {
        MemoryDataset {
            width,
            height,
            ..Default::default()
        }
    }

    /// Appends a band. `pixels` should hold `width * height` values; reads
    /// of a band with the wrong length fail.
    pub fn with_band(mut self, pixels: PixelData, color_interpretation: ColorInterpretation) -> Self {
        self.bands.push(BandDescription {
            data_type: pixels.data_type(),
            color_interpretation,
            block_size: (self.width, 1),
            no_data: None,
            metadata: Vec::new(),
        });
        self.pixels.push(pixels);
        self
    }

    pub fn with_no_data(mut self, band: usize, value: f64) -> Self {
        if let Some(description) = self.bands.get_mut(band) {
            description.no_data = Some(value);
        }
        self
    }

    pub fn with_band_metadata(mut self, band: usize, entry: impl Into<String>) -> Self {
        if let Some(description) = self.bands.get_mut(band) {
            description.metadata.push(entry.into());
        }
        self
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn with_geo_transform(mut self, geo_transform: [f64; 6]) -> Self {
        self.geo_transform = Some(geo_transform);
        self
    }

    pub fn with_metadata(mut self, entry: impl Into<String>) -> Self {
        self.metadata.push(entry.into());
        self
    }

    pub fn into_handle(self, description: impl Into<String>) -> DatasetHandle {
        Arc::new(Dataset::new(description, "MEM", "In Memory Raster", Box::new(self)))
    }
}

impl RasterSource for MemoryDataset {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn bands(&self) -> &[BandDescription] {
        &self.bands
    }

    fn read_band(&self, index: usize) -> Result<PixelData, RasterError> {
        let pixels = self.pixels.get(index).ok_or(RasterError::BandOutOfRange {
            index,
            count: self.pixels.len(),
        })?;
        let expected = self.width as usize * self.height as usize;
        if pixels.len() != expected {
            return Err(RasterError::UnsupportedBandLayout(format!(
                "band {} holds {} values, expected {}",
                index,
                pixels.len(),
                expected
            )));
        }
        Ok(pixels.clone())
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
