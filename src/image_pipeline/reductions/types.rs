//! Configuration and results of the reduction pipelines

use std::path::PathBuf;

use crate::image_pipeline::calibration::{OverscanLevel, OverscanOptions};
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::region::{Region, Section};

/// Configuration for overscan subtraction and trimming
#[derive(Debug, Clone)]
pub struct ReductionConfig {
    /// Overscan region; falls back to the `BIASSEC` keyword when unset
    pub overscan: Option<Section>,
    /// Region to keep; falls back to `TRIMSEC`/`DATASEC`, then to whatever
    /// is left once the overscan strip is removed
    pub trim: Option<Section>,
    /// Whether to crop after subtracting
    pub trim_enabled: bool,
    pub overscan_options: OverscanOptions,
    /// Replace existing output files
    pub overwrite: bool,
    /// Keep going through a collection after a file fails
    pub continue_on_error: bool,
    /// Whether to reject empty images before processing
    pub validate_dimensions: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            overscan: None,
            trim: None,
            trim_enabled: true,
            overscan_options: OverscanOptions::default(),
            overwrite: false,
            continue_on_error: false,
            validate_dimensions: true,
        }
    }
}

impl ReductionConfig {
    pub fn builder() -> ReductionConfigBuilder {
        ReductionConfigBuilder::default()
    }
}

/// Builder for ReductionConfig
#[derive(Default)]
pub struct ReductionConfigBuilder {
    overscan: Option<Option<Section>>,
    trim: Option<Option<Section>>,
    trim_enabled: Option<bool>,
    overscan_options: Option<OverscanOptions>,
    overwrite: Option<bool>,
    continue_on_error: Option<bool>,
    validate_dimensions: Option<bool>,
}

impl ReductionConfigBuilder {
    pub fn overscan(mut self, section: Option<Section>) -> Self {
        self.overscan = Some(section);
        self
    }

    pub fn trim(mut self, section: Option<Section>) -> Self {
        self.trim = Some(section);
        self
    }

    pub fn trim_enabled(mut self, enabled: bool) -> Self {
        self.trim_enabled = Some(enabled);
        self
    }

    pub fn overscan_options(mut self, options: OverscanOptions) -> Self {
        self.overscan_options = Some(options);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn continue_on_error(mut self, keep_going: bool) -> Self {
        self.continue_on_error = Some(keep_going);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> ReductionConfig {
        let default = ReductionConfig::default();
        ReductionConfig {
            overscan: self.overscan.unwrap_or(default.overscan),
            trim: self.trim.unwrap_or(default.trim),
            trim_enabled: self.trim_enabled.unwrap_or(default.trim_enabled),
            overscan_options: self.overscan_options.unwrap_or(default.overscan_options),
            overwrite: self.overwrite.unwrap_or(default.overwrite),
            continue_on_error: self.continue_on_error.unwrap_or(default.continue_on_error),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}

/// One image after overscan subtraction and (optionally) trimming.
#[derive(Debug, Clone)]
pub struct ReducedImage {
    pub image: CcdImage,
    pub level: OverscanLevel,
    pub overscan_region: Region,
    /// `None` when trimming was disabled
    pub trim_region: Option<Region>,
}

/// Outcome of reducing a collection.
#[derive(Debug, Clone, Default)]
pub struct ReductionReport {
    /// `(input, output)` pairs that were written
    pub written: Vec<(PathBuf, PathBuf)>,
    /// Inputs that failed, with the error message
    pub failures: Vec<(PathBuf, String)>,
}

impl ReductionReport {
    pub fn succeeded(&self) -> usize {
        self.written.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
