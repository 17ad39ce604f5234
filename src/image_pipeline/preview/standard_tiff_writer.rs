use std::io::Write;
use tracing::debug;
use crate::image_pipeline::common::error::{Result, CalibrationError};
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::preview::types::{PreviewConfig, TiffCompression};
use crate::image_pipeline::preview::writer::TiffPreviewWriter;

pub struct StandardTiffPreviewWriter;

fn percentile(sorted_len: usize, p: f32) -> usize {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted_len.saturating_sub(1)) as f32;
    rank.round() as usize
}

/// Pixel values mapped to black and white for the given percentiles.
/// `None` when the image has no finite pixels.
pub fn stretch_limits(image: &CcdImage, low_percentile: f32, high_percentile: f32) -> Option<(f32, f32)> {
    let mut values: Vec<f32> = image.data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f32::total_cmp);
    let lo = values[percentile(values.len(), low_percentile)];
    let hi = values[percentile(values.len(), high_percentile)];
    Some((lo.min(hi), lo.max(hi)))
}

impl TiffPreviewWriter for StandardTiffPreviewWriter {
    fn write_preview(&self, image: &CcdImage, output: &mut dyn Write, config: &PreviewConfig) -> Result<()> {
        let (rows, cols) = image.shape();
        debug!("Encoding TIFF preview: {}x{}", cols, rows);

        if rows == 0 || cols == 0 {
            return Err(CalibrationError::InvalidDimensions(rows, cols));
        }

        let (lo, hi) = stretch_limits(image, config.low_percentile, config.high_percentile)
            .unwrap_or((0.0, 1.0));
        let scale = if hi > lo { u16::MAX as f32 / (hi - lo) } else { 0.0 };
        debug!("Preview stretch: {} .. {}", lo, hi);

        let pixels: Vec<u16> = image
            .data
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    ((v - lo) * scale).clamp(0.0, u16::MAX as f32) as u16
                } else {
                    0
                }
            })
            .collect();

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| CalibrationError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        encoder.write_image::<tiff::encoder::colortype::Gray16>(
            cols as u32,
            rows as u32,
            &pixels,
        ).map_err(|e| CalibrationError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF preview encoding complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::fits::types::ImageHeader;
    use ndarray::Array2;

    #[test]
    fn test_stretch_limits_use_percentiles() {
        let data = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f32);
        let image = CcdImage::new(data, ImageHeader::new());
        assert_eq!(stretch_limits(&image, 0.0, 100.0), Some((0.0, 99.0)));
        assert_eq!(stretch_limits(&image, 10.0, 90.0), Some((10.0, 89.0)));
    }

    #[test]
    fn test_preview_is_decodable_gray16() {
        let data = Array2::from_shape_fn((5, 7), |(r, c)| (r + c) as f32);
        let image = CcdImage::new(data, ImageHeader::new());
        let config = PreviewConfig::builder()
            .compression(TiffCompression::Lzw)
            .stretch(0.0, 100.0)
            .build();

        let mut buffer = Vec::new();
        StandardTiffPreviewWriter.write_preview(&image, &mut buffer, &config).unwrap();

        let mut decoder = tiff::decoder::Decoder::new(std::io::Cursor::new(buffer)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (7, 5));
        match decoder.read_image().unwrap() {
            tiff::decoder::DecodingResult::U16(pixels) => {
                assert_eq!(pixels[0], 0);
                assert_eq!(*pixels.last().unwrap(), u16::MAX);
            }
            other => panic!("unexpected pixel format: {:?}", std::mem::discriminant(&other)),
        }
    }
}
