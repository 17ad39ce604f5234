//! Calibration operations
//!
//! The stateless per-image steps (overscan subtraction, trimming) and the
//! combination of a stack of frames into a master frame.

mod overscan;
mod trim;
mod combine;
pub mod types;

pub use overscan::{OVERSCAN_KEYWORD, OverscanResult, subtract_overscan};
pub use trim::{TRIM_KEYWORD, trim_image, trim_region_for, trim_to_region};
pub use combine::combine_images;
pub use types::{
    CombineMethod, CombineOptions, OverscanLevel, OverscanModel, OverscanOptions,
    OverscanStatistic, SigmaClip,
};
