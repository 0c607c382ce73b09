use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::{Attributes, Object};

/// Numeric element type of an image channel or raster band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl DataType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Value used for a fully opaque alpha channel: 1.0 for floating point
    /// types, the type maximum for integers.
    pub fn opaque_alpha(&self) -> f64 {
        match self {
            DataType::U8 => f64::from(u8::MAX),
            DataType::I8 => f64::from(i8::MAX),
            DataType::U16 => f64::from(u16::MAX),
            DataType::I16 => f64::from(i16::MAX),
            DataType::U32 => f64::from(u32::MAX),
            DataType::I32 => f64::from(i32::MAX),
            DataType::F32 | DataType::F64 => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::U8 => "Byte",
            DataType::I8 => "Int8",
            DataType::U16 => "UInt16",
            DataType::I16 => "Int16",
            DataType::U32 => "UInt32",
            DataType::I32 => "Int32",
            DataType::F32 => "Float32",
            DataType::F64 => "Float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element conversions shared by every pixel type.
pub trait Element: Copy + Default + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
                #[allow(clippy::cast_lossless)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, f32, f64);

/// Typed pixel storage, one vector variant per element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PixelData {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Runs `$body` with `$v` bound to the typed vector inside `$pixels`.
#[macro_export]
macro_rules! dispatch_pixels {
    ($pixels:expr, $v:ident => $body:expr) => {
        match $pixels {
            $crate::PixelData::U8($v) => $body,
            $crate::PixelData::I8($v) => $body,
            $crate::PixelData::U16($v) => $body,
            $crate::PixelData::I16($v) => $body,
            $crate::PixelData::U32($v) => $body,
            $crate::PixelData::I32($v) => $body,
            $crate::PixelData::F32($v) => $body,
            $crate::PixelData::F64($v) => $body,
        }
    };
}

impl PixelData {
    /// `len` elements of `data_type`, each set to `value`.
    pub fn filled(data_type: DataType, len: usize, value: f64) -> Self {
        match data_type {
            DataType::U8 => PixelData::U8(vec![Element::from_f64(value); len]),
            DataType::I8 => PixelData::I8(vec![Element::from_f64(value); len]),
            DataType::U16 => PixelData::U16(vec![Element::from_f64(value); len]),
            DataType::I16 => PixelData::I16(vec![Element::from_f64(value); len]),
            DataType::U32 => PixelData::U32(vec![Element::from_f64(value); len]),
            DataType::I32 => PixelData::I32(vec![Element::from_f64(value); len]),
            DataType::F32 => PixelData::F32(vec![Element::from_f64(value); len]),
            DataType::F64 => PixelData::F64(vec![Element::from_f64(value); len]),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            PixelData::U8(_) => DataType::U8,
            PixelData::I8(_) => DataType::I8,
            PixelData::U16(_) => DataType::U16,
            PixelData::I16(_) => DataType::I16,
            PixelData::U32(_) => DataType::U32,
            PixelData::I32(_) => DataType::I32,
            PixelData::F32(_) => DataType::F32,
            PixelData::F64(_) => DataType::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_pixels!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        dispatch_pixels!(self, v => v.get(index).map(|e| e.to_f64()))
    }

    pub fn set(&mut self, index: usize, value: f64) -> bool {
        dispatch_pixels!(self, v => match v.get_mut(index) {
            Some(e) => {
                *e = Element::from_f64(value);
                true
            }
            None => false,
        })
    }

    /// Every element widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        dispatch_pixels!(self, v => v.iter().map(|e| e.to_f64()).collect())
    }

    /// Minimum and maximum element, `None` when empty. NaNs are skipped.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        dispatch_pixels!(self, v => v
            .iter()
            .map(|e| e.to_f64())
            .filter(|e| !e.is_nan())
            .fold(None, |acc: Option<(f64, f64)>, e| match acc {
                None => Some((e, e)),
                Some((lo, hi)) => Some((lo.min(e), hi.max(e))),
            }))
    }
}

/// Copies `source` into every `stride`-th element of `target` starting at
/// `offset`. Both must hold the same element type.
fn scatter<T: Copy>(target: &mut [T], source: &[T], offset: usize, stride: usize) {
    for (dst, src) in target
        .iter_mut()
        .skip(offset)
        .step_by(stride)
        .zip(source.iter())
    {
        *dst = *src;
    }
}

fn gather<T: Copy>(source: &[T], offset: usize, stride: usize) -> Vec<T> {
    source.iter().skip(offset).step_by(stride).copied().collect()
}

/// A 2-D interleaved image with 1 to 4 components per pixel plus an
/// attribute map for georeferencing and free form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub components: u32,
    pub pixels: PixelData,
    pub attributes: Attributes,
}

impl ImageData {
    /// Allocates an image with every pixel set to `default_pixel`. Missing
    /// default components are zero. `None` for 0 or more than 4 components.
    pub fn new(
        width: u32,
        height: u32,
        components: u32,
        data_type: DataType,
        default_pixel: &[f64],
    ) -> Option<Self> {
        if !(1..=4).contains(&components) {
            return None;
        }
        let len = width as usize * height as usize * components as usize;
        let mut pixels = PixelData::filled(data_type, len, 0.0);
        for c in 0..components as usize {
            let value = default_pixel.get(c).copied().unwrap_or(0.0);
            if value != 0.0 {
                dispatch_pixels!(&mut pixels, v => {
                    for e in v.iter_mut().skip(c).step_by(components as usize) {
                        *e = Element::from_f64(value);
                    }
                });
            }
        }
        Some(ImageData {
            width,
            height,
            components,
            pixels,
            attributes: Attributes::new(),
        })
    }

    /// Wraps already interleaved pixels. `None` if the length disagrees
    /// with the dimensions.
    pub fn from_pixels(width: u32, height: u32, components: u32, pixels: PixelData) -> Option<Self> {
        let expected = width as usize * height as usize * components as usize;
        if !(1..=4).contains(&components) || pixels.len() != expected {
            return None;
        }
        Some(ImageData {
            width,
            height,
            components,
            pixels,
            attributes: Attributes::new(),
        })
    }

    pub fn data_type(&self) -> DataType {
        self.pixels.data_type()
    }

    fn index(&self, x: u32, y: u32, c: u32) -> Option<usize> {
        if x >= self.width || y >= self.height || c >= self.components {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.components as usize + c as usize)
    }

    pub fn component(&self, x: u32, y: u32, c: u32) -> Option<f64> {
        self.index(x, y, c).and_then(|i| self.pixels.get(i))
    }

    pub fn set_component(&mut self, x: u32, y: u32, c: u32, value: f64) -> bool {
        match self.index(x, y, c) {
            Some(i) => self.pixels.set(i, value),
            None => false,
        }
    }

    /// Bilinear sample at normalised coordinates, `(0, 0)` being the first
    /// pixel's centre and `(1, 1)` the last. Coordinates are clamped.
    pub fn sample(&self, u: f64, v: f64, c: u32) -> Option<f64> {
        if self.width == 0 || self.height == 0 || c >= self.components {
            return None;
        }
        let fx = u.clamp(0.0, 1.0) * f64::from(self.width - 1);
        let fy = v.clamp(0.0, 1.0) * f64::from(self.height - 1);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - f64::from(x0);
        let ty = fy - f64::from(y0);
        let top = self.component(x0, y0, c)? * (1.0 - tx) + self.component(x1, y0, c)? * tx;
        let bottom = self.component(x0, y1, c)? * (1.0 - tx) + self.component(x1, y1, c)? * tx;
        Some(top * (1.0 - ty) + bottom * ty)
    }

    /// Writes a full channel. Returns false if `source` is a different
    /// element type or size, or `component` is out of range.
    pub fn set_channel(&mut self, component: u32, source: &PixelData) -> bool {
        let pixel_count = self.width as usize * self.height as usize;
        if component >= self.components || source.len() != pixel_count {
            return false;
        }
        let offset = component as usize;
        let stride = self.components as usize;
        match (&mut self.pixels, source) {
            (PixelData::U8(t), PixelData::U8(s)) => scatter(t, s, offset, stride),
            (PixelData::I8(t), PixelData::I8(s)) => scatter(t, s, offset, stride),
            (PixelData::U16(t), PixelData::U16(s)) => scatter(t, s, offset, stride),
            (PixelData::I16(t), PixelData::I16(s)) => scatter(t, s, offset, stride),
            (PixelData::U32(t), PixelData::U32(s)) => scatter(t, s, offset, stride),
            (PixelData::I32(t), PixelData::I32(s)) => scatter(t, s, offset, stride),
            (PixelData::F32(t), PixelData::F32(s)) => scatter(t, s, offset, stride),
            (PixelData::F64(t), PixelData::F64(s)) => scatter(t, s, offset, stride),
            _ => return false,
        }
        true
    }

    /// One channel as its own typed buffer.
    pub fn channel(&self, component: u32) -> Option<PixelData> {
        if component >= self.components {
            return None;
        }
        let offset = component as usize;
        let stride = self.components as usize;
        Some(match &self.pixels {
            PixelData::U8(v) => PixelData::U8(gather(v, offset, stride)),
            PixelData::I8(v) => PixelData::I8(gather(v, offset, stride)),
            PixelData::U16(v) => PixelData::U16(gather(v, offset, stride)),
            PixelData::I16(v) => PixelData::I16(gather(v, offset, stride)),
            PixelData::U32(v) => PixelData::U32(gather(v, offset, stride)),
            PixelData::I32(v) => PixelData::I32(gather(v, offset, stride)),
            PixelData::F32(v) => PixelData::F32(gather(v, offset, stride)),
            PixelData::F64(v) => PixelData::F64(gather(v, offset, stride)),
        })
    }

    /// Number of mip-map levels a full chain down to 1x1 would have.
    pub fn full_mipmap_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        32 - largest.leading_zeros()
    }
}

impl Object for ImageData {
    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }
}
