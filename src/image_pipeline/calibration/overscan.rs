use ndarray::ArrayView1;
use tracing::{debug, instrument};

use crate::image_pipeline::calibration::types::{
    OverscanLevel, OverscanModel, OverscanOptions, OverscanStatistic,
};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::region::{Region, Section};
use crate::image_pipeline::stats::{mean_of, median_in_place};

/// Header keyword recording the subtraction.
pub const OVERSCAN_KEYWORD: &str = "SUBOVSCN";

#[derive(Debug, Clone)]
pub struct OverscanResult {
    /// Input image with the bias level removed; same shape as the input
    pub image: CcdImage,
    pub level: OverscanLevel,
    pub region: Region,
}

fn collapse(mut values: Vec<f32>, statistic: OverscanStatistic) -> Option<f32> {
    values.retain(|v| v.is_finite());
    match statistic {
        OverscanStatistic::Mean => mean_of(&values),
        OverscanStatistic::Median => median_in_place(&mut values),
    }
}

fn collapse_line(line: ArrayView1<f32>, statistic: OverscanStatistic) -> Option<f32> {
    collapse(line.to_vec(), statistic)
}

fn resolve_model(model: OverscanModel, region: &Region) -> OverscanModel {
    match model {
        OverscanModel::Auto if region.height() >= region.width() => OverscanModel::PerRow,
        OverscanModel::Auto => OverscanModel::PerColumn,
        other => other,
    }
}

fn model_label(model: OverscanModel) -> &'static str {
    match model {
        OverscanModel::Scalar => "scalar",
        OverscanModel::PerRow => "per-row",
        OverscanModel::PerColumn => "per-column",
        OverscanModel::Auto => "auto",
    }
}

fn no_finite_pixels(region: &Region) -> CalibrationError {
    CalibrationError::UnsupportedFormat(format!(
        "overscan {} contains no finite pixels",
        region.to_fits_section()
    ))
}

/// Estimates the bias level from `section` and subtracts it from every pixel.
#[instrument(skip_all, fields(image = %image.display_name(), section = %section))]
pub fn subtract_overscan(
    image: &CcdImage,
    section: &Section,
    options: &OverscanOptions,
) -> Result<OverscanResult> {
    let (rows, cols) = image.shape();
    let region = section.resolve((rows, cols))?;
    let overscan = region.view(&image.data);
    let model = resolve_model(options.model, &region);

    let level = match model {
        OverscanModel::PerRow => {
            if region.rows != (0..rows) {
                return Err(CalibrationError::InvalidSection(format!(
                    "{section}: a per-row overscan must span all {rows} rows"
                )));
            }
            let values = overscan
                .rows()
                .into_iter()
                .map(|line| collapse_line(line, options.statistic))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| no_finite_pixels(&region))?;
            OverscanLevel::PerRow(values)
        }
        OverscanModel::PerColumn => {
            if region.cols != (0..cols) {
                return Err(CalibrationError::InvalidSection(format!(
                    "{section}: a per-column overscan must span all {cols} columns"
                )));
            }
            let values = overscan
                .columns()
                .into_iter()
                .map(|line| collapse_line(line, options.statistic))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| no_finite_pixels(&region))?;
            OverscanLevel::PerColumn(values)
        }
        OverscanModel::Scalar | OverscanModel::Auto => {
            let value = collapse(overscan.iter().copied().collect(), options.statistic)
                .ok_or_else(|| no_finite_pixels(&region))?;
            OverscanLevel::Scalar(value)
        }
    };

    let mut output = image.clone();
    match &level {
        OverscanLevel::Scalar(value) => {
            let value = *value;
            output.data.mapv_inplace(|p| p - value);
        }
        OverscanLevel::PerRow(values) => {
            for (mut row, &value) in output.data.rows_mut().into_iter().zip(values) {
                row.mapv_inplace(|p| p - value);
            }
        }
        OverscanLevel::PerColumn(values) => {
            for (mut column, &value) in output.data.columns_mut().into_iter().zip(values) {
                column.mapv_inplace(|p| p - value);
            }
        }
    }

    debug!(
        model = model_label(model),
        mean_level = level.mean(),
        "Overscan subtracted"
    );
    output.header.set(
        OVERSCAN_KEYWORD,
        format!(
            "{} {} of {}",
            options.statistic,
            model_label(model),
            region.to_fits_section()
        ),
    );

    Ok(OverscanResult {
        image: output,
        level,
        region,
    })
}
