use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use geotile_raster::{exif_gps_position, open_dataset, parse_meta_data, Access, Dataset};

/// Prints a description of every file that opens. Files that do not open
/// are reported and skipped.
pub fn describe_files(files: &[PathBuf]) -> Result<()> {
    for file in files {
        match open_dataset(file, Access::ReadOnly) {
            Ok(dataset) => {
                println!("\nSuccessfully loaded {}", file.display());
                print!("{}", describe(&dataset)?);
            }
            Err(e) => bevy::log::warn!("{}", e),
        }
    }
    Ok(())
}

pub fn describe(dataset: &Dataset) -> Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Driver: {}/{}",
        dataset.driver_name(),
        dataset.driver_long_name()
    )?;
    writeln!(
        out,
        "Size is {}x{}x{}",
        dataset.raster_x_size(),
        dataset.raster_y_size(),
        dataset.raster_count()
    )?;
    if let Some(projection) = dataset.projection_ref() {
        writeln!(out, "Projection is `{}'", projection)?;
    }
    if let Some(gt) = dataset.geo_transform() {
        writeln!(out, "Origin = ({:.6},{:.6})", gt[0], gt[3])?;
        writeln!(out, "Pixel Size = ({:.6},{:.6})", gt[1], gt[5])?;
    }

    for band in dataset.bands() {
        let (block_x, block_y) = band.block_size();
        writeln!(
            out,
            "Band {} Block={}x{} Type={}, ColorInterp={}",
            band.index() + 1,
            block_x,
            block_y,
            band.data_type(),
            band.color_interpretation()
        )?;
        match band.min_max()? {
            Some((min, max)) => writeln!(out, "    Min={:.3}, Max={:.3}", min, max)?,
            None => writeln!(out, "    no valid pixels")?,
        }
        if let Some(no_data) = band.no_data() {
            writeln!(out, "    NoData Value={}", no_data)?;
        }
    }

    if let Some(gps) = exif_gps_position(&parse_meta_data(dataset.metadata())) {
        write!(
            out,
            "GPS position: latitude {:.6}, longitude {:.6}",
            gps.latitude, gps.longitude
        )?;
        if let Some(altitude) = gps.altitude {
            write!(out, ", altitude {:.1}", altitude)?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use geotile_raster::{ColorInterpretation, MemoryDataset};
    use geotile_scene::PixelData;

    use super::*;

    #[test]
    fn describes_georeferenced_bands() {
        let dataset = MemoryDataset::new(2, 2)
            .with_band(
                PixelData::F32(vec![1.0, -2.5, 3.25, 4.0]),
                ColorInterpretation::Gray,
            )
            .with_projection("EPSG:4326")
            .with_geo_transform([10.0, 0.5, 0.0, 50.0, 0.0, -0.25])
            .into_handle("memory");
        let text = describe(&dataset).unwrap();
        assert_eq!(
            text,
            "Driver: MEM/In Memory Raster\n\
             Size is 2x2x1\n\
             Projection is `EPSG:4326'\n\
             Origin = (10.000000,50.000000)\n\
             Pixel Size = (0.500000,-0.250000)\n\
             Band 1 Block=2x1 Type=Float32, ColorInterp=Gray\n    \
             Min=-2.500, Max=4.000\n"
        );
    }

    #[test]
    fn reports_gps_position() {
        let dataset = MemoryDataset::new(1, 1)
            .with_band(PixelData::U8(vec![7]), ColorInterpretation::Red)
            .with_metadata("EXIF_GPSLatitude=(51) (30) (0)")
            .with_metadata("EXIF_GPSLatitudeRef=(N)")
            .with_metadata("EXIF_GPSLongitude=(0) (7) (30)")
            .with_metadata("EXIF_GPSLongitudeRef=(W)")
            .into_handle("photo");
        let text = describe(&dataset).unwrap();
        assert!(text.ends_with("GPS position: latitude 51.500000, longitude -0.125000\n"));
    }
}
