//! FITS image I/O module
//!
//! Reading and writing of calibration images. The container format itself is
//! handled by cfitsio; this module maps it onto [`CcdImage`].

mod reader;
mod writer;
mod fitsio_reader;
mod fitsio_writer;
pub mod types;

#[cfg(test)]
mod tests;

pub use reader::FitsReader;
pub use writer::FitsWriter;
pub use fitsio_reader::FitsioReader;
pub use fitsio_writer::FitsioWriter;
pub use types::{CcdImage, FrameType, HeaderCard, HeaderInfo, HeaderValue, ImageHeader};
