use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::fits::types::{CcdImage, HeaderInfo};

pub trait FitsReader {
    fn read_image(&self, path: &Path) -> Result<CcdImage>;
    fn read_header(&self, path: &Path) -> Result<HeaderInfo>;
}
