use tracing::{info, instrument, warn};
use std::path::Path;

use crate::image_pipeline::{
    calibration::{subtract_overscan, trim_region_for, trim_to_region},
    collection::ImageCollection,
    common::error::{CalibrationError, Result},
    fits::{CcdImage, FitsReader, FitsWriter, FitsioReader, FitsioWriter, FrameType},
    region::Section,
    reductions::types::{ReducedImage, ReductionConfig, ReductionReport},
};

/// Subtracts the overscan level from `image` and, unless disabled, trims it.
pub fn reduce_image(image: &CcdImage, config: &ReductionConfig) -> Result<ReducedImage> {
    let (rows, cols) = image.shape();
    if config.validate_dimensions && (rows == 0 || cols == 0) {
        return Err(CalibrationError::InvalidDimensions(rows, cols));
    }

    let section = match &config.overscan {
        Some(section) => section.clone(),
        None => {
            let text = image.header.get_str("BIASSEC").ok_or_else(|| {
                CalibrationError::MissingKeyword(format!(
                    "BIASSEC in {} (no overscan section given)",
                    image.display_name()
                ))
            })?;
            Section::from_fits(text)?
        }
    };

    let subtracted = subtract_overscan(image, &section, &config.overscan_options)?;

    if !config.trim_enabled {
        return Ok(ReducedImage {
            image: subtracted.image,
            level: subtracted.level,
            overscan_region: subtracted.region,
            trim_region: None,
        });
    }

    let _span = tracing::info_span!("trim").entered();
    let region = trim_region_for(&subtracted.image, Some(&subtracted.region), config.trim.as_ref())?;
    let trimmed = trim_to_region(&subtracted.image, &region)?;

    Ok(ReducedImage {
        image: trimmed,
        level: subtracted.level,
        overscan_region: subtracted.region,
        trim_region: Some(region),
    })
}

pub struct OverscanTrimPipeline<R: FitsReader, W: FitsWriter> {
    reader: R,
    writer: W,
    config: ReductionConfig,
}

impl OverscanTrimPipeline<FitsioReader, FitsioWriter> {
    pub fn new(config: ReductionConfig) -> Self {
        Self {
            reader: FitsioReader,
            writer: FitsioWriter,
            config,
        }
    }
}

impl<R: FitsReader, W: FitsWriter> OverscanTrimPipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, config: ReductionConfig) -> Self {
        Self {
            reader,
            writer,
            config,
        }
    }

    #[instrument(skip_all, fields(image = %image.display_name()))]
    pub fn reduce(&self, image: &CcdImage) -> Result<ReducedImage> {
        let reduced = reduce_image(image, &self.config)?;
        info!(
            level = reduced.level.mean(),
            rows = reduced.image.shape().0,
            cols = reduced.image.shape().1,
            "Reduction complete"
        );
        Ok(reduced)
    }

    #[instrument(skip(self, input_path, output_path))]
    pub fn reduce_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<ReducedImage> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Reducing file"
        );

        let image = {
            let _span = tracing::info_span!("read_fits").entered();
            self.reader.read_image(input_path)?
        };

        let reduced = self.reduce(&image)?;

        {
            let _span = tracing::info_span!("write_fits").entered();
            self.writer.write_image(&reduced.image, output_path, self.config.overwrite)?;
        }

        Ok(reduced)
    }

    /// Reduces every selected image of `collection` into `out_dir`, keeping
    /// each input's file name.
    #[instrument(skip(self, collection, out_dir), fields(location = %collection.location().display()))]
    pub fn reduce_collection(
        &self,
        collection: &ImageCollection,
        frame_type: Option<&FrameType>,
        out_dir: impl AsRef<Path>,
    ) -> Result<ReductionReport> {
        let out_dir = out_dir.as_ref();
        let selected = super::select_entries(collection, frame_type)?;

        std::fs::create_dir_all(out_dir).map_err(|e| {
            CalibrationError::OutputWriteError(format!("{}: {}", out_dir.display(), e))
        })?;

        let mut report = ReductionReport::default();
        for entry in selected {
            let output = out_dir.join(entry.file_name());
            match self.reduce_file(&entry.path, &output) {
                Ok(_) => report.written.push((entry.path.clone(), output)),
                Err(e) if self.config.continue_on_error => {
                    warn!("Failed to reduce {}: {}", entry.path.display(), e);
                    report.failures.push((entry.path.clone(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            written = report.succeeded(),
            failed = report.failed(),
            "Collection reduced"
        );
        Ok(report)
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }
}
