//! Reduction pipelines
//!
//! Orchestration of the calibration steps over files and collections:
//! read, subtract overscan, trim, write; and stacking of calibration frames
//! into a master frame.

mod overscan_trim;
mod master_frame;
pub mod types;

use crate::image_pipeline::collection::{CollectionEntry, ImageCollection};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::FrameType;


pub use overscan_trim::{OverscanTrimPipeline, reduce_image};
pub use master_frame::MasterFramePipeline;
pub use types::{ReducedImage, ReductionConfig, ReductionConfigBuilder, ReductionReport};

/// Entries of `collection` with the given frame type (all entries when `None`).
fn select_entries<'a>(
    collection: &'a ImageCollection,
    frame_type: Option<&FrameType>,
) -> Result<Vec<&'a CollectionEntry>> {
    let selected: Vec<&CollectionEntry> = match frame_type {
        Some(wanted) => collection.filter_frame_type(wanted),
        None => collection.entries().iter().collect(),
    };
    if selected.is_empty() {
        let what = frame_type.map_or_else(|| "images".to_string(), |t| format!("{t} frames"));
        return Err(CalibrationError::EmptySelection(format!(
            "no {} in {}",
            what,
            collection.location().display()
        )));
    }
    Ok(selected)
}
