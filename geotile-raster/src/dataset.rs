use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use geotile_scene::{DataType, PixelData};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::driver::{self, Driver};
use crate::RasterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Update,
}

/// Colour role of a band. `Undefined` bands are auxiliary and are left out
/// when merging bands into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorInterpretation {
    Undefined,
    Gray,
    Palette,
    Red,
    Green,
    Blue,
    Alpha,
}

impl ColorInterpretation {
    pub fn name(&self) -> &'static str {
        match self {
            ColorInterpretation::Undefined => "Undefined",
            ColorInterpretation::Gray => "Gray",
            ColorInterpretation::Palette => "Palette",
            ColorInterpretation::Red => "Red",
            ColorInterpretation::Green => "Green",
            ColorInterpretation::Blue => "Blue",
            ColorInterpretation::Alpha => "Alpha",
        }
    }

    pub fn is_defined(&self) -> bool {
        *self != ColorInterpretation::Undefined
    }
}

impl fmt::Display for ColorInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandDescription {
    pub data_type: DataType,
    pub color_interpretation: ColorInterpretation,
    pub block_size: (u32, u32),
    pub no_data: Option<f64>,
    /// Band level `KEY=VALUE` entries such as `STATISTICS_MINIMUM`.
    pub metadata: Vec<String>,
}

/// What a driver hands back for an opened file.
pub trait RasterSource: Send + Sync {
    fn size(&self) -> (u32, u32);
    fn bands(&self) -> &[BandDescription];
    /// Full band in row-major order.
    fn read_band(&self, index: usize) -> Result<PixelData, RasterError>;
    fn projection_ref(&self) -> Option<&str>;
    fn geo_transform(&self) -> Option<[f64; 6]>;
    /// Dataset level `KEY=VALUE` entries.
    fn metadata(&self) -> &[String];
}

/// An opened raster. The underlying source is released when the last
/// handle is dropped.
pub struct Dataset {
    description: String,
    driver_name: &'static str,
    driver_long_name: &'static str,
    source: Box<dyn RasterSource>,
}

pub type DatasetHandle = Arc<Dataset>;

impl Dataset {
    pub fn new(
        description: impl Into<String>,
        driver_name: &'static str,
        driver_long_name: &'static str,
        source: Box<dyn RasterSource>,
    ) -> Self {
        Dataset {
            description: description.into(),
            driver_name,
            driver_long_name,
            source,
        }
    }

    fn from_driver(description: &str, driver: &Driver, source: Box<dyn RasterSource>) -> Self {
        Dataset::new(description, driver.short_name, driver.long_name, source)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver_name
    }

    pub fn driver_long_name(&self) -> &'static str {
        self.driver_long_name
    }

    pub fn raster_x_size(&self) -> u32 {
        self.source.size().0
    }

    pub fn raster_y_size(&self) -> u32 {
        self.source.size().1
    }

    pub fn raster_count(&self) -> usize {
        self.source.bands().len()
    }

    pub fn band(&self, index: usize) -> Result<RasterBand<'_>, RasterError> {
        if index >= self.raster_count() {
            return Err(RasterError::BandOutOfRange {
                index,
                count: self.raster_count(),
            });
        }
        Ok(RasterBand {
            dataset: self,
            index,
        })
    }

    pub fn bands(&self) -> impl Iterator<Item = RasterBand<'_>> {
        (0..self.raster_count()).map(move |index| RasterBand {
            dataset: self,
            index,
        })
    }

    /// `None` when the dataset has no projection or an empty one.
    pub fn projection_ref(&self) -> Option<&str> {
        self.source.projection_ref().filter(|p| !p.is_empty())
    }

    pub fn geo_transform(&self) -> Option<[f64; 6]> {
        self.source.geo_transform()
    }

    pub fn metadata(&self) -> &[String] {
        self.source.metadata()
    }

    /// Value of the first `KEY=VALUE` metadata entry for `key`.
    pub fn metadata_item(&self, key: &str) -> Option<&str> {
        find_item(self.metadata(), key)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("description", &self.description)
            .field("driver", &self.driver_name)
            .field("size", &self.source.size())
            .field("bands", &self.raster_count())
            .finish()
    }
}

impl Drop for Dataset {
    fn drop(&mut self) {
        bevy::log::debug!("closing dataset {}", self.description);
    }
}

pub(crate) fn find_item<'a>(metadata: &'a [String], key: &str) -> Option<&'a str> {
    metadata.iter().find_map(|entry| {
        let (k, v) = entry.split_once('=')?;
        (k == key).then_some(v)
    })
}

/// One band of a dataset.
#[derive(Clone, Copy)]
pub struct RasterBand<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl<'a> RasterBand<'a> {
    fn description(&self) -> Option<&'a BandDescription> {
        self.dataset.source.bands().get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn x_size(&self) -> u32 {
        self.dataset.raster_x_size()
    }

    pub fn y_size(&self) -> u32 {
        self.dataset.raster_y_size()
    }

    pub fn data_type(&self) -> DataType {
        self.description()
            .map(|d| d.data_type)
            .unwrap_or(DataType::U8)
    }

    pub fn color_interpretation(&self) -> ColorInterpretation {
        self.description()
            .map(|d| d.color_interpretation)
            .unwrap_or(ColorInterpretation::Undefined)
    }

    pub fn block_size(&self) -> (u32, u32) {
        self.description()
            .map(|d| d.block_size)
            .unwrap_or((self.x_size(), 1))
    }

    pub fn no_data(&self) -> Option<f64> {
        self.description().and_then(|d| d.no_data)
    }

    pub fn read(&self) -> Result<PixelData, RasterError> {
        self.dataset.source.read_band(self.index)
    }

    fn statistic(&self, key: &str) -> Option<f64> {
        let description = self.description()?;
        find_item(&description.metadata, key)?.trim().parse().ok()
    }

    /// Minimum recorded in the band statistics, if any.
    pub fn minimum(&self) -> Option<f64> {
        self.statistic("STATISTICS_MINIMUM")
    }

    pub fn maximum(&self) -> Option<f64> {
        self.statistic("STATISTICS_MAXIMUM")
    }

    /// Scans the band for its range, skipping the no-data value.
    pub fn compute_min_max(&self) -> Result<Option<(f64, f64)>, RasterError> {
        let pixels = self.read()?;
        let no_data = self.no_data();
        let range = pixels
            .to_f64_vec()
            .into_iter()
            .filter(|v| !v.is_nan() && Some(*v) != no_data)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });
        Ok(range)
    }

    /// Recorded statistics when present, a scan otherwise.
    pub fn min_max(&self) -> Result<Option<(f64, f64)>, RasterError> {
        match (self.minimum(), self.maximum()) {
            (Some(min), Some(max)) => Ok(Some((min, max))),
            _ => self.compute_min_max(),
        }
    }
}

fn open_bytes(name: &str, bytes: Vec<u8>) -> Result<Dataset, RasterError> {
    let driver = driver::identify(name, &bytes)
        .ok_or_else(|| RasterError::open_failure(name, "not recognised as a supported format"))?;
    let source = (driver.open)(name, bytes)?;
    bevy::log::debug!("opened {} with driver {}", name, driver.short_name);
    Ok(Dataset::from_driver(name, driver, source))
}

fn open_path(path: &Path, access: Access) -> Result<Dataset, RasterError> {
    driver::ensure_initialized();
    let name = path.display().to_string();
    if access == Access::Update {
        return Err(RasterError::open_failure(
            &name,
            "update access is not supported",
        ));
    }
    let bytes = std::fs::read(path).map_err(|e| RasterError::open_failure(&name, e))?;
    open_bytes(&name, bytes)
}

/// Opens `path` as a new, unshared dataset.
pub fn open_dataset(path: impl AsRef<Path>, access: Access) -> Result<DatasetHandle, RasterError> {
    open_path(path.as_ref(), access).map(Arc::new)
}

/// Decodes an in-memory file, e.g. a downloaded tile. `name` is used for
/// format detection by extension and for diagnostics.
pub fn open_dataset_from_bytes(name: &str, bytes: Vec<u8>) -> Result<DatasetHandle, RasterError> {
    driver::ensure_initialized();
    open_bytes(name, bytes).map(Arc::new)
}

static SHARED_DATASETS: Lazy<Mutex<HashMap<PathBuf, Weak<Dataset>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Like `open_dataset`, but returns the handle already open for the same
/// file while any holder keeps it alive.
pub fn open_shared_dataset(
    path: impl AsRef<Path>,
    access: Access,
) -> Result<DatasetHandle, RasterError> {
    let path = path.as_ref();
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    if let Some(existing) = SHARED_DATASETS.lock().get(&key).and_then(Weak::upgrade) {
        return Ok(existing);
    }

    let dataset = Arc::new(open_path(path, access)?);

    let mut shared = SHARED_DATASETS.lock();
    shared.retain(|_, weak| weak.strong_count() > 0);
    if let Some(existing) = shared.get(&key).and_then(Weak::upgrade) {
        return Ok(existing);
    }
    shared.insert(key, Arc::downgrade(&dataset));
    Ok(dataset)
}
