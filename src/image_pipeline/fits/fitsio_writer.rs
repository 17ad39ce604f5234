use std::path::Path;

use fitsio::FitsFile;
use fitsio::images::{ImageDescription, ImageType};
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::types::{CcdImage, HeaderValue};
use crate::image_pipeline::fits::writer::FitsWriter;

/// Writes a BITPIX -32 primary image plus every header card.
///
/// Only the cards held in the image's [`ImageHeader`](crate::image_pipeline::fits::ImageHeader)
/// are written. Images loaded by `FitsioReader` carry the recognised keywords
/// alone, so WCS, pointing and observer cards of the input are not propagated.
pub struct FitsioWriter;

/// Cards cfitsio manages itself from the image description.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "BZERO", "BSCALE", "END",
];

fn is_structural(key: &str) -> bool {
    STRUCTURAL_KEYWORDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Creates `path` with a BITPIX -32 primary image and writes the header cards.
fn write_primary(image: &CcdImage, path: &Path) -> Result<()> {
    let (rows, cols) = image.shape();
    let dimensions = [rows, cols];
    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &dimensions,
    };

    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .map_err(|e| CalibrationError::fits(path, e))?;
    let hdu = fptr
        .primary_hdu()
        .map_err(|e| CalibrationError::fits(path, e))?;

    // Logical iteration order is row-major regardless of memory layout
    let pixels: Vec<f32> = image.data.iter().copied().collect();
    hdu.write_image(&mut fptr, &pixels)
        .map_err(|e| CalibrationError::fits(path, e))?;

    for card in image.header.cards() {
        if is_structural(&card.key) {
            continue;
        }
        let written = match &card.value {
            HeaderValue::Text(value) => hdu.write_key(&mut fptr, &card.key, value.as_str()),
            HeaderValue::Integer(value) => hdu.write_key(&mut fptr, &card.key, *value),
            HeaderValue::Float(value) => hdu.write_key(&mut fptr, &card.key, *value),
        };
        written.map_err(|e| CalibrationError::fits(path, e))?;
    }

    Ok(())
}

impl FitsWriter for FitsioWriter {
    fn write_image(&self, image: &CcdImage, path: &Path, overwrite: bool) -> Result<()> {
        let (rows, cols) = image.shape();
        debug!("Writing FITS image: {}x{} -> {}", rows, cols, path.display());

        if rows == 0 || cols == 0 {
            return Err(CalibrationError::InvalidDimensions(rows, cols));
        }

        if path.exists() {
            if !overwrite {
                return Err(CalibrationError::OutputWriteError(format!(
                    "{}: file exists and overwrite is disabled",
                    path.display()
                )));
            }
            std::fs::remove_file(path).map_err(|e| {
                CalibrationError::OutputWriteError(format!("{}: {}", path.display(), e))
            })?;
        }

        if let Err(e) = write_primary(image, path) {
            // no partial output left behind
            let _ = std::fs::remove_file(path);
            return Err(e);
        }

        debug!("FITS write complete");
        Ok(())
    }
}
