//! Process-wide driver registry.

use std::path::Path;

use once_cell::sync::OnceCell;

use crate::dataset::RasterSource;
use crate::{image_driver, tiff_driver, RasterError};

pub type OpenFn = fn(name: &str, bytes: Vec<u8>) -> Result<Box<dyn RasterSource>, RasterError>;

/// A registered format. `magic` is matched against the start of the file
/// before falling back to `extensions`.
pub struct Driver {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub extensions: &'static [&'static str],
    pub magic: &'static [&'static [u8]],
    pub open: OpenFn,
}

impl Driver {
    fn matches_magic(&self, bytes: &[u8]) -> bool {
        self.magic.iter().any(|m| bytes.starts_with(m))
    }

    fn matches_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                self.extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(e))
            })
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("short_name", &self.short_name)
            .field("long_name", &self.long_name)
            .finish()
    }
}

static DRIVERS: OnceCell<Vec<Driver>> = OnceCell::new();

/// Registers the built-in drivers the first time it is called. Safe to call
/// from any thread, any number of times.
pub fn ensure_initialized() -> &'static [Driver] {
    DRIVERS.get_or_init(|| {
        let drivers = vec![
            tiff_driver::driver(),
            image_driver::png_driver(),
            image_driver::jpeg_driver(),
        ];
        bevy::log::debug!(
            "registered raster drivers: {:?}",
            drivers.iter().map(|d| d.short_name).collect::<Vec<_>>()
        );
        drivers
    })
}

pub fn drivers() -> &'static [Driver] {
    ensure_initialized()
}

/// Picks the driver for `bytes`, by signature first and then by the
/// extension of `name`.
pub fn identify(name: &str, bytes: &[u8]) -> Option<&'static Driver> {
    let drivers = ensure_initialized();
    drivers
        .iter()
        .find(|d| d.matches_magic(bytes))
        .or_else(|| drivers.iter().find(|d| d.matches_extension(name)))
}
