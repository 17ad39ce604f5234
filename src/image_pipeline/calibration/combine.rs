use rayon::prelude::*;
use ndarray::Array2;
use tracing::{info, instrument};

use crate::image_pipeline::calibration::types::{CombineMethod, CombineOptions};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::stats::{mean_of, median_in_place, std_dev_about};

/// Reduces one pixel's stack of values. The stack is reordered and may be shrunk.
fn combine_stack(stack: &mut Vec<f32>, options: &CombineOptions) -> f32 {
    if stack.is_empty() {
        return f32::NAN;
    }

    if let Some(clip) = options.sigma_clip {
        if stack.len() > 2 {
            let centre = median_in_place(stack).unwrap_or(f32::NAN);
            let sigma = std_dev_about(stack, centre);
            if sigma > 0.0 {
                let (lo, hi) = (centre - clip.low * sigma, centre + clip.high * sigma);
                stack.retain(|&v| v >= lo && v <= hi);
            }
            if stack.is_empty() {
                return centre;
            }
        }
    }

    match options.method {
        CombineMethod::Average => mean_of(stack),
        CombineMethod::Median => median_in_place(stack),
    }
    .unwrap_or(f32::NAN)
}

fn combine_label(options: &CombineOptions) -> String {
    match options.sigma_clip {
        Some(clip) => format!("{} sigclip {}/{}", options.method, clip.low, clip.high),
        None => options.method.to_string(),
    }
}

/// Combines same-shaped frames pixel by pixel into one image.
///
/// Non-finite values are left out of each pixel's stack. The result carries
/// the first frame's header plus `NCOMBINE` and `COMBTYPE`.
#[instrument(skip_all, fields(frames = images.len()))]
pub fn combine_images(images: &[CcdImage], options: &CombineOptions) -> Result<CcdImage> {
    let first = images
        .first()
        .ok_or_else(|| CalibrationError::EmptySelection("no frames to combine".to_string()))?;
    let shape = first.shape();

    if let Some(other) = images.iter().find(|img| img.shape() != shape) {
        return Err(CalibrationError::ShapeMismatch {
            expected: shape,
            found: other.shape(),
        });
    }

    let (rows, cols) = shape;
    let n = images.len();
    info!("Combining {} frames of {}x{} ({})", n, rows, cols, combine_label(options));

    let pixels: Vec<f32> = (0..rows * cols)
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(n),
            |stack, idx| {
                let (r, c) = (idx / cols, idx % cols);
                stack.clear();
                stack.extend(
                    images
                        .iter()
                        .map(|img| img.data[[r, c]])
                        .filter(|v| v.is_finite()),
                );
                combine_stack(stack, options)
            },
        )
        .collect();

    let data = Array2::from_shape_vec((rows, cols), pixels)
        .map_err(|e| CalibrationError::UnsupportedFormat(e.to_string()))?;

    let mut header = first.header.clone();
    header.set("NCOMBINE", n as i64);
    header.set("COMBTYPE", combine_label(options));

    Ok(CcdImage::new(data, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::calibration::types::SigmaClip;
    use crate::image_pipeline::fits::types::ImageHeader;

    fn constant_frame(value: f32) -> CcdImage {
        let mut header = ImageHeader::new();
        header.set("IMAGETYP", "BIAS");
        CcdImage::new(Array2::from_elem((3, 4), value), header)
    }

    #[test]
    fn test_median_is_robust_to_outlier_frame() {
        let frames: Vec<CcdImage> = [10.0, 11.0, 12.0, 5000.0, 9.0]
            .into_iter()
            .map(constant_frame)
            .collect();
        let master = combine_images(&frames, &CombineOptions::default()).unwrap();

        assert_eq!(master.shape(), (3, 4));
        assert!(master.data.iter().all(|&v| v == 11.0));
        assert_eq!(master.header.get("NCOMBINE").and_then(|v| v.as_i64()), Some(5));
        assert_eq!(master.header.get_str("COMBTYPE"), Some("median"));
        assert_eq!(master.header.get_str("IMAGETYP"), Some("BIAS"));
    }

    #[test]
    fn test_sigma_clipping_removes_outlier_from_average() {
        let mut values: Vec<f32> = (0..19).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
        values.push(1000.0);
        let frames: Vec<CcdImage> = values.into_iter().map(constant_frame).collect();

        let plain = combine_images(
            &frames,
            &CombineOptions {
                method: CombineMethod::Average,
                sigma_clip: None,
            },
        )
        .unwrap();
        assert!(plain.data[[0, 0]] > 140.0);

        let clipped = combine_images(
            &frames,
            &CombineOptions {
                method: CombineMethod::Average,
                sigma_clip: Some(SigmaClip::symmetric(3.0)),
            },
        )
        .unwrap();
        let v = clipped.data[[2, 3]];
        assert!(v > 99.0 && v < 101.0, "clipped average was {v}");
    }

    #[test]
    fn test_nan_pixels_are_skipped() {
        let mut frames = vec![constant_frame(4.0), constant_frame(6.0)];
        frames[1].data[[0, 0]] = f32::NAN;
        let options = CombineOptions {
            method: CombineMethod::Average,
            sigma_clip: None,
        };
        let master = combine_images(&frames, &options).unwrap();
        assert_eq!(master.data[[0, 0]], 4.0);
        assert_eq!(master.data[[1, 1]], 5.0);
    }

    #[test]
    fn test_shape_mismatch_and_empty_input() {
        let frames = vec![
            constant_frame(1.0),
            CcdImage::new(Array2::zeros((2, 2)), ImageHeader::new()),
        ];
        let result = combine_images(&frames, &CombineOptions::default());
        assert!(matches!(
            result,
            Err(CalibrationError::ShapeMismatch {
                expected: (3, 4),
                found: (2, 2)
            })
        ));

        let result = combine_images(&[], &CombineOptions::default());
        assert!(matches!(result, Err(CalibrationError::EmptySelection(_))));
    }
}
