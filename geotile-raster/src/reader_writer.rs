//! Turning one or more datasets into a single scene image.

use std::path::Path;

use geotile_scene::{ImageData, Object, Value};

use crate::bridge::{assign_meta_data, copy_raster_band_to_image, create_image_2d, data_types};
use crate::compat::{all_equal, compatible_dataset_projections_transform_and_sizes};
use crate::{open_shared_dataset, Access, DatasetHandle, RasterBand, RasterError};

/// Reads the file at `path` into an image with up to four channels.
pub fn read_image(path: impl AsRef<Path>) -> Result<ImageData, RasterError> {
    let dataset = open_shared_dataset(path, Access::ReadOnly)?;
    merge_datasets(&[dataset])
}

/// Merges the classified bands of pixel aligned datasets into one image.
///
/// All datasets must share projection, geo-transform and size, and all
/// bands one element type. Bands with an undefined colour role are left
/// out. Three bands are padded with an opaque alpha channel; more than four
/// are rejected. Metadata of every dataset plus the first dataset's
/// `ProjectionRef` and `GeoTransform` are attached to the image.
pub fn merge_datasets(datasets: &[DatasetHandle]) -> Result<ImageData, RasterError> {
    let Some(first) = datasets.first() else {
        return Err(RasterError::UnsupportedBandLayout(
            "no datasets to merge".into(),
        ));
    };

    if !all_equal(datasets, |lhs, rhs| {
        compatible_dataset_projections_transform_and_sizes(lhs, rhs)
    }) {
        let names: Vec<&str> = datasets.iter().map(|d| d.description()).collect();
        return Err(RasterError::IncompatibleInputs(names.join(", ")));
    }

    let types = data_types(datasets.iter().map(|d| d.as_ref()));
    if types.len() > 1 {
        return Err(RasterError::TypeMismatch(types.into_iter().collect()));
    }
    let Some(data_type) = types.into_iter().next() else {
        return Err(RasterError::UnsupportedBandLayout(format!(
            "{} has no raster bands",
            first.description()
        )));
    };

    let mut bands: Vec<RasterBand> = Vec::new();
    for dataset in datasets {
        for band in dataset.bands() {
            if band.color_interpretation().is_defined() {
                bands.push(band);
            } else {
                bevy::log::info!(
                    "{}: undefined classification on raster band {}, skipping",
                    dataset.description(),
                    band.index() + 1
                );
            }
        }
    }

    let components = match bands.len() {
        0 => {
            return Err(RasterError::UnsupportedBandLayout(
                "no classified raster bands".into(),
            ))
        }
        3 => 4,
        n if n > 4 => {
            return Err(RasterError::UnsupportedBandLayout(format!(
                "{} classified raster bands, a maximum of 4 can be merged",
                n
            )))
        }
        n => n as u32,
    };

    let mut image = create_image_2d(
        first.raster_x_size(),
        first.raster_y_size(),
        components,
        data_type,
        [0.0, 0.0, 0.0, data_type.opaque_alpha()],
    )
    .ok_or_else(|| RasterError::UnsupportedBandLayout(format!("{} components", components)))?;

    for (component, band) in (0u32..).zip(bands.iter()) {
        if !copy_raster_band_to_image(band, &mut image, component) {
            return Err(RasterError::UnsupportedBandLayout(format!(
                "could not copy band {} of {}",
                band.index() + 1,
                band.dataset().description()
            )));
        }
    }

    for dataset in datasets {
        assign_meta_data(dataset, &mut image);
    }
    if let Some(projection) = first.projection_ref() {
        image.set_value("ProjectionRef", projection);
    }
    if let Some(transform) = first.geo_transform() {
        image.set_object("GeoTransform", Value::DoubleArray(transform.to_vec()));
    }

    bevy::log::debug!(
        "merged {} bands into a {}x{}x{} {} image",
        bands.len(),
        image.width,
        image.height,
        image.components,
        data_type
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColorInterpretation, MemoryDataset};
    use geotile_scene::{DataType, PixelData};

    const GT: [f64; 6] = [0.0, 1.0, 0.0, 2.0, 0.0, -1.0];

    fn single(values: Vec<f32>, role: ColorInterpretation, projection: &str) -> DatasetHandle {
        MemoryDataset::new(2, 1)
            .with_band(PixelData::F32(values), role)
            .with_projection(projection)
            .with_geo_transform(GT)
            .with_metadata("SOURCE=test")
            .into_handle("memory")
    }

    #[test]
    fn three_bands_become_rgba() {
        let datasets = vec![
            single(vec![0.1, 0.2], ColorInterpretation::Red, "EPSG:4326"),
            single(vec![0.3, 0.4], ColorInterpretation::Green, "EPSG:4326"),
            single(vec![0.5, 0.6], ColorInterpretation::Blue, "EPSG:4326"),
        ];
        let image = merge_datasets(&datasets).unwrap();
        assert_eq!(image.components, 4);
        assert_eq!(image.data_type(), DataType::F32);
        assert_eq!(
            image.pixels,
            PixelData::F32(vec![0.1, 0.3, 0.5, 1.0, 0.2, 0.4, 0.6, 1.0])
        );
        assert_eq!(image.get_value("ProjectionRef"), Some("EPSG:4326"));
        assert_eq!(image.get_value("SOURCE"), Some("test"));
        assert_eq!(
            image
                .get_object("GeoTransform")
                .and_then(Value::as_f64_slice),
            Some(&GT[..])
        );
    }

    #[test]
    fn mismatched_projection_is_rejected() {
        let datasets = vec![
            single(vec![0.1, 0.2], ColorInterpretation::Red, "EPSG:4326"),
            single(vec![0.3, 0.4], ColorInterpretation::Green, "EPSG:3857"),
            single(vec![0.5, 0.6], ColorInterpretation::Blue, "EPSG:4326"),
        ];
        assert!(matches!(
            merge_datasets(&datasets),
            Err(RasterError::IncompatibleInputs(_))
        ));
    }

    #[test]
    fn mixed_types_are_rejected() {
        let a = single(vec![0.1, 0.2], ColorInterpretation::Red, "EPSG:4326");
        let b = MemoryDataset::new(2, 1)
            .with_band(PixelData::U8(vec![1, 2]), ColorInterpretation::Green)
            .with_projection("EPSG:4326")
            .with_geo_transform(GT)
            .into_handle("memory");
        assert!(matches!(
            merge_datasets(&[a, b]),
            Err(RasterError::TypeMismatch(types)) if types == vec![DataType::U8, DataType::F32]
        ));
    }

    #[test]
    fn undefined_bands_are_skipped() {
        let dataset = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![9]), ColorInterpretation::Gray)
            .with_band(PixelData::U8(vec![3]), ColorInterpretation::Undefined)
            .into_handle("memory");
        let image = merge_datasets(&[dataset]).unwrap();
        assert_eq!(image.components, 1);
        assert_eq!(image.pixels, PixelData::U8(vec![9]));
        assert!(image.get_value("ProjectionRef").is_none());
        assert!(image.get_object("GeoTransform").is_none());
    }

    #[test]
    fn band_layout_limits() {
        let none = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![3]), ColorInterpretation::Undefined)
            .into_handle("memory");
        assert!(matches!(
            merge_datasets(&[none]),
            Err(RasterError::UnsupportedBandLayout(_))
        ));

        let mut builder = MemoryDataset::new(1, 1);
        for _ in 0..5 {
            builder = builder.with_band(PixelData::U8(vec![1]), ColorInterpretation::Gray);
        }
        assert!(matches!(
            merge_datasets(&[builder.into_handle("memory")]),
            Err(RasterError::UnsupportedBandLayout(_))
        ));
        assert!(matches!(
            merge_datasets(&[]),
            Err(RasterError::UnsupportedBandLayout(_))
        ));
    }

    #[test]
    fn integer_alpha_is_type_max() {
        let dataset = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![1]), ColorInterpretation::Red)
            .with_band(PixelData::U8(vec![2]), ColorInterpretation::Green)
            .with_band(PixelData::U8(vec![3]), ColorInterpretation::Blue)
            .into_handle("memory");
        let image = merge_datasets(&[dataset]).unwrap();
        assert_eq!(image.pixels, PixelData::U8(vec![1, 2, 3, 255]));
    }
}
