//! Copies raster bands and metadata onto scene images.

use std::collections::BTreeSet;

use geotile_scene::{Attributes, DataType, ImageData, Object};

use crate::{Dataset, RasterBand};

/// Every band element type found across `datasets`.
pub fn data_types<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> BTreeSet<DataType> {
    datasets
        .into_iter()
        .flat_map(|dataset| dataset.bands().map(|band| band.data_type()))
        .collect()
}

/// A `width` x `height` image of `components` channels, each pixel set to
/// `default_value`. `None` for a component count outside 1 to 4.
pub fn create_image_2d(
    width: u32,
    height: u32,
    components: u32,
    data_type: DataType,
    default_value: [f64; 4],
) -> Option<ImageData> {
    ImageData::new(width, height, components, data_type, &default_value)
}

/// Copies `band` into channel `component` of `image`. Returns false without
/// touching the image when sizes, element types or the component index do
/// not line up, and when the band cannot be read.
pub fn copy_raster_band_to_image(band: &RasterBand, image: &mut ImageData, component: u32) -> bool {
    if band.x_size() != image.width || band.y_size() != image.height {
        bevy::log::warn!(
            "band size {}x{} does not match image size {}x{}",
            band.x_size(),
            band.y_size(),
            image.width,
            image.height
        );
        return false;
    }
    if band.data_type() != image.data_type() {
        bevy::log::warn!(
            "band type {} does not match image type {}",
            band.data_type(),
            image.data_type()
        );
        return false;
    }
    if component >= image.components {
        return false;
    }
    match band.read() {
        Ok(pixels) => image.set_channel(component, &pixels),
        Err(e) => {
            bevy::log::warn!("could not read band {}: {}", band.index(), e);
            false
        }
    }
}

/// Splits `KEY=VALUE` entries into pairs. Entries without `=` map to an
/// empty value.
pub fn parse_meta_data(entries: &[String]) -> Attributes {
    let mut attributes = Attributes::new();
    for entry in entries {
        match entry.split_once('=') {
            Some((key, value)) => attributes.set_value(key, value),
            None => attributes.set_value(entry, ""),
        }
    }
    attributes
}

/// Copies the dataset's metadata onto `object` as string attributes.
pub fn assign_meta_data(dataset: &Dataset, object: &mut dyn Object) {
    for (key, value) in parse_meta_data(dataset.metadata()).iter() {
        object.set_object(key, value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorInterpretation, MemoryDataset};
    use geotile_scene::PixelData;

    #[test]
    fn copy_into_channel() {
        let dataset = MemoryDataset::new(2, 1)
            .with_band(PixelData::F32(vec![0.25, 0.75]), ColorInterpretation::Green)
            .into_handle("memory");
        let mut image = create_image_2d(2, 1, 4, DataType::F32, [0.0, 0.0, 0.0, 1.0]).unwrap();
        assert!(copy_raster_band_to_image(&dataset.band(0).unwrap(), &mut image, 1));
        assert_eq!(image.component(0, 0, 1), Some(0.25));
        assert_eq!(image.component(1, 0, 1), Some(0.75));
        assert_eq!(image.component(1, 0, 3), Some(1.0));
    }

    #[test]
    fn mismatched_dimensions_return_false() {
        let dataset = MemoryDataset::new(3, 1)
            .with_band(PixelData::F32(vec![1.0, 2.0, 3.0]), ColorInterpretation::Gray)
            .into_handle("memory");
        let mut image = create_image_2d(2, 1, 1, DataType::F32, [0.0; 4]).unwrap();
        let before = image.clone();
        assert!(!copy_raster_band_to_image(&dataset.band(0).unwrap(), &mut image, 0));
        assert_eq!(image, before);
    }

    #[test]
    fn mismatched_types_return_false() {
        let dataset = MemoryDataset::new(2, 1)
            .with_band(PixelData::U16(vec![1, 2]), ColorInterpretation::Gray)
            .into_handle("memory");
        let mut image = create_image_2d(2, 1, 1, DataType::U8, [0.0; 4]).unwrap();
        assert!(!copy_raster_band_to_image(&dataset.band(0).unwrap(), &mut image, 0));
        assert!(!copy_raster_band_to_image(&dataset.band(0).unwrap(), &mut image, 3));
    }

    #[test]
    fn unreadable_band_returns_false() {
        let dataset = MemoryDataset::new(2, 1)
            .with_band(PixelData::U8(vec![1]), ColorInterpretation::Gray)
            .into_handle("memory");
        let mut image = create_image_2d(2, 1, 1, DataType::U8, [0.0; 4]).unwrap();
        assert!(!copy_raster_band_to_image(&dataset.band(0).unwrap(), &mut image, 0));
    }

    #[test]
    fn metadata_becomes_string_attributes() {
        let dataset = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![0]), ColorInterpretation::Gray)
            .with_metadata("EXIF_GPSLatitude=(51) (30) (12.5)")
            .with_metadata("EXIF_GPSLatitudeRef=N")
            .with_metadata("LONELY")
            .with_metadata("EQUATION=a=b")
            .into_handle("memory");
        let mut image = create_image_2d(1, 1, 1, DataType::U8, [0.0; 4]).unwrap();
        assign_meta_data(&dataset, &mut image);
        assert_eq!(image.get_value("EXIF_GPSLatitude"), Some("(51) (30) (12.5)"));
        assert_eq!(image.get_value("LONELY"), Some(""));
        assert_eq!(image.get_value("EQUATION"), Some("a=b"));
        assert_eq!(image.attributes().len(), 4);
    }

    #[test]
    fn data_types_across_datasets() {
        let a = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![0]), ColorInterpretation::Red)
            .with_band(PixelData::U8(vec![0]), ColorInterpretation::Green)
            .into_handle("a");
        let b = MemoryDataset::new(1, 1)
            .with_band(PixelData::F32(vec![0.0]), ColorInterpretation::Gray)
            .into_handle("b");
        let types = data_types([a.as_ref(), b.as_ref()]);
        assert_eq!(types.into_iter().collect::<Vec<_>>(), vec![DataType::U8, DataType::F32]);
    }
}
