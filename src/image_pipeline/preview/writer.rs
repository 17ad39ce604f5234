use std::io::Write;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::preview::types::PreviewConfig;

pub trait TiffPreviewWriter {
    fn write_preview(&self, image: &CcdImage, output: &mut dyn Write, config: &PreviewConfig) -> Result<()>;
}
