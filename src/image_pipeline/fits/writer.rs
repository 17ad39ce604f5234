use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::fits::types::CcdImage;

pub trait FitsWriter {
    fn write_image(&self, image: &CcdImage, path: &Path, overwrite: bool) -> Result<()>;
}
