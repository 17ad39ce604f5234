//! Options and results for the calibration operations

use std::fmt;
use std::str::FromStr;

/// Statistic used to collapse overscan or stacked pixels to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverscanStatistic {
    Mean,
    #[default]
    Median,
}

/// Shape of the bias estimate taken from the overscan region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverscanModel {
    /// One value for the whole region
    #[default]
    Scalar,
    /// One value per image row; the region must span every row
    PerRow,
    /// One value per image column; the region must span every column
    PerColumn,
    /// `PerRow` for regions at least as tall as they are wide, `PerColumn` otherwise
    Auto,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverscanOptions {
    pub statistic: OverscanStatistic,
    pub model: OverscanModel,
}

/// Bias level that was subtracted.
#[derive(Debug, Clone, PartialEq)]
pub enum OverscanLevel {
    Scalar(f32),
    PerRow(Vec<f32>),
    PerColumn(Vec<f32>),
}

impl OverscanLevel {
    /// Mean of the subtracted level(s), for logging.
    pub fn mean(&self) -> f32 {
        match self {
            OverscanLevel::Scalar(v) => *v,
            OverscanLevel::PerRow(values) | OverscanLevel::PerColumn(values) => {
                crate::image_pipeline::stats::mean_of(values).unwrap_or(0.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMethod {
    Average,
    #[default]
    Median,
}

/// Rejection bounds in standard deviations around the per-pixel median.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaClip {
    pub low: f32,
    pub high: f32,
}

impl SigmaClip {
    pub fn symmetric(sigma: f32) -> Self {
        Self {
            low: sigma,
            high: sigma,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CombineOptions {
    pub method: CombineMethod,
    pub sigma_clip: Option<SigmaClip>,
}

impl fmt::Display for OverscanStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverscanStatistic::Mean => "mean",
            OverscanStatistic::Median => "median",
        })
    }
}

impl FromStr for OverscanStatistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" => Ok(OverscanStatistic::Mean),
            "median" => Ok(OverscanStatistic::Median),
            other => Err(format!("unknown statistic '{other}' (expected mean or median)")),
        }
    }
}

impl FromStr for OverscanModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Ok(OverscanModel::Scalar),
            "per-row" | "row" => Ok(OverscanModel::PerRow),
            "per-column" | "column" => Ok(OverscanModel::PerColumn),
            "auto" => Ok(OverscanModel::Auto),
            other => Err(format!(
                "unknown overscan model '{other}' (expected scalar, per-row, per-column or auto)"
            )),
        }
    }
}

impl fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CombineMethod::Average => "average",
            CombineMethod::Median => "median",
        })
    }
}

impl FromStr for CombineMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" | "mean" => Ok(CombineMethod::Average),
            "median" => Ok(CombineMethod::Median),
            other => Err(format!("unknown combine method '{other}' (expected average or median)")),
        }
    }
}

impl FromStr for SigmaClip {
    type Err = String;

    /// `"3"` for symmetric clipping or `"2.5,4"` for separate low/high bounds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .ok()
                .filter(|v| *v > 0.0)
                .ok_or_else(|| format!("invalid sigma value '{}'", v.trim()))
        };
        match s.split_once(',') {
            Some((low, high)) => Ok(SigmaClip {
                low: parse(low)?,
                high: parse(high)?,
            }),
            None => Ok(SigmaClip::symmetric(parse(s)?)),
        }
    }
}
