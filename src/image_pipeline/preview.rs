//! TIFF preview module
//!
//! Stretched 16-bit grayscale previews of calibration images, used in place of
//! on-screen plots when inspecting frames before and after each step.

mod writer;
mod standard_tiff_writer;
pub mod types;

pub use writer::TiffPreviewWriter;
pub use standard_tiff_writer::{StandardTiffPreviewWriter, stretch_limits};
pub use types::{TiffCompression, PreviewConfig, PreviewConfigBuilder};
