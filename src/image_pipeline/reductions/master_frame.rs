use tracing::{debug, info, instrument};
use std::path::Path;

use crate::image_pipeline::{
    calibration::{combine_images, CombineOptions},
    collection::ImageCollection,
    common::error::Result,
    fits::{CcdImage, FitsReader, FitsWriter, FitsioReader, FitsioWriter, FrameType},
    reductions::overscan_trim::reduce_image,
    reductions::types::ReductionConfig,
};

/// Stacks calibration frames into a master frame.
pub struct MasterFramePipeline<R: FitsReader, W: FitsWriter> {
    reader: R,
    writer: W,
    combine: CombineOptions,
    /// When set, each frame is overscan-subtracted and trimmed before stacking
    reduction: Option<ReductionConfig>,
    overwrite: bool,
}

impl MasterFramePipeline<FitsioReader, FitsioWriter> {
    pub fn new(combine: CombineOptions) -> Self {
        Self::with_custom(FitsioReader, FitsioWriter, combine)
    }
}

impl<R: FitsReader, W: FitsWriter> MasterFramePipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, combine: CombineOptions) -> Self {
        Self {
            reader,
            writer,
            combine,
            reduction: None,
            overwrite: false,
        }
    }

    pub fn with_reduction(mut self, reduction: ReductionConfig) -> Self {
        self.reduction = Some(reduction);
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Reduces (if configured) and combines already loaded frames.
    pub fn combine_frames(&self, frames: &[CcdImage]) -> Result<CcdImage> {
        match &self.reduction {
            Some(config) => {
                let _span = tracing::info_span!("reduce_frames", frames = frames.len()).entered();
                let reduced = frames
                    .iter()
                    .map(|frame| reduce_image(frame, config).map(|r| r.image))
                    .collect::<Result<Vec<_>>>()?;
                combine_images(&reduced, &self.combine)
            }
            None => combine_images(frames, &self.combine),
        }
    }

    /// Reads the selected frames of `collection`, combines them and writes the
    /// master frame to `output`.
    #[instrument(skip(self, collection, output), fields(location = %collection.location().display()))]
    pub fn build_master(
        &self,
        collection: &ImageCollection,
        frame_type: Option<&FrameType>,
        output: impl AsRef<Path>,
    ) -> Result<CcdImage> {
        let output = output.as_ref();
        let selected = super::select_entries(collection, frame_type)?;

        let frames = {
            let _span = tracing::info_span!("read_fits", frames = selected.len()).entered();
            selected
                .iter()
                .map(|entry| {
                    debug!("Loading {}", entry.path.display());
                    self.reader.read_image(&entry.path)
                })
                .collect::<Result<Vec<_>>>()?
        };

        let master = self.combine_frames(&frames)?;

        {
            let _span = tracing::info_span!("write_fits").entered();
            self.writer.write_image(&master, output, self.overwrite)?;
        }

        info!(
            output = %output.display(),
            frames = frames.len(),
            rows = master.shape().0,
            cols = master.shape().1,
            "Master frame written"
        );
        Ok(master)
    }
}
