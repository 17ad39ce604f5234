//! FITS reader implementation backed by cfitsio through the `fitsio` crate.
//!
//! Only the primary image HDU is used. When the primary HDU carries no data
//! (a common layout for compressed or multi-extension files) the first
//! extension is read instead. Pixel values of every BITPIX are returned as
//! `f32`; cfitsio applies BZERO/BSCALE on the way.

use std::path::Path;

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use ndarray::Array2;
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::reader::FitsReader;
use crate::image_pipeline::fits::types::{
    CcdImage, HeaderInfo, ImageHeader, KNOWN_KEYWORDS, KeywordKind,
};

pub struct FitsioReader;

impl FitsioReader {
    fn open(path: &Path) -> Result<FitsFile> {
        if !path.is_file() {
            return Err(CalibrationError::InputReadError(format!(
                "{}: no such file",
                path.display()
            )));
        }
        FitsFile::open(path).map_err(|e| CalibrationError::fits(path, e))
    }

    /// Locates the image HDU and its `(rows, cols)` shape.
    fn image_hdu(fptr: &mut FitsFile, path: &Path) -> Result<(FitsHdu, (usize, usize))> {
        let primary = fptr
            .primary_hdu()
            .map_err(|e| CalibrationError::fits(path, e))?;

        if let Some(shape) = image_shape(&primary.info, path)? {
            return Ok((primary, shape));
        }

        debug!("Primary HDU of {} has no data, trying first extension", path.display());
        let extension = fptr.hdu(1usize).map_err(|e| CalibrationError::fits(path, e))?;
        match image_shape(&extension.info, path)? {
            Some(shape) => Ok((extension, shape)),
            None => Err(CalibrationError::UnsupportedFormat(format!(
                "{}: no image data in primary HDU or first extension",
                path.display()
            ))),
        }
    }
}

/// `Ok(None)` for an image HDU without data (NAXIS = 0).
fn image_shape(info: &HduInfo, path: &Path) -> Result<Option<(usize, usize)>> {
    match info {
        HduInfo::ImageInfo { shape, .. } => match shape.as_slice() {
            [] => Ok(None),
            [rows, cols] => Ok(Some((*rows, *cols))),
            // Degenerate cube with a single plane
            [1, rows, cols] => Ok(Some((*rows, *cols))),
            other => Err(CalibrationError::UnsupportedFormat(format!(
                "{}: expected a 2-D image, found shape {:?}",
                path.display(),
                other
            ))),
        },
        HduInfo::TableInfo { .. } => Err(CalibrationError::UnsupportedFormat(format!(
            "{}: HDU is a table, not an image",
            path.display()
        ))),
        HduInfo::AnyInfo => Err(CalibrationError::UnsupportedFormat(format!(
            "{}: unknown HDU type",
            path.display()
        ))),
    }
}

/// Reads the recognised keywords; missing ones are simply absent from the result.
fn read_known_keywords(hdu: &FitsHdu, fptr: &mut FitsFile) -> ImageHeader {
    let mut header = ImageHeader::new();
    for &(key, kind) in KNOWN_KEYWORDS {
        match kind {
            KeywordKind::Text => {
                if let Ok(value) = hdu.read_key::<String>(fptr, key) {
                    header.set(key, value.trim().to_string());
                }
            }
            KeywordKind::Float => {
                if let Ok(value) = hdu.read_key::<f64>(fptr, key) {
                    header.set(key, value);
                }
            }
            KeywordKind::Integer => {
                if let Ok(value) = hdu.read_key::<i64>(fptr, key) {
                    header.set(key, value);
                }
            }
        }
    }
    header
}

impl FitsReader for FitsioReader {
    fn read_image(&self, path: &Path) -> Result<CcdImage> {
        let mut fptr = Self::open(path)?;
        let (hdu, (rows, cols)) = Self::image_hdu(&mut fptr, path)?;

        if rows == 0 || cols == 0 {
            return Err(CalibrationError::InvalidDimensions(rows, cols));
        }

        let pixels: Vec<f32> = hdu
            .read_image(&mut fptr)
            .map_err(|e| CalibrationError::fits(path, e))?;
        debug!("Read {} pixels ({}x{}) from {}", pixels.len(), rows, cols, path.display());

        let data = Array2::from_shape_vec((rows, cols), pixels).map_err(|e| {
            CalibrationError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        })?;
        let header = read_known_keywords(&hdu, &mut fptr);

        Ok(CcdImage::new(data, header).with_source(path))
    }

    fn read_header(&self, path: &Path) -> Result<HeaderInfo> {
        let mut fptr = Self::open(path)?;
        let (hdu, shape) = Self::image_hdu(&mut fptr, path)?;
        let header = read_known_keywords(&hdu, &mut fptr);
        Ok(HeaderInfo { header, shape })
    }
}
