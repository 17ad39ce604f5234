use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::fits::types::CcdImage;
use crate::image_pipeline::region::{Region, Section};

/// Header keyword recording the crop.
pub const TRIM_KEYWORD: &str = "TRIMIMA";

/// Section keywords that no longer describe a trimmed image.
const SECTION_KEYWORDS: &[&str] = &["BIASSEC", "TRIMSEC", "DATASEC"];

/// Crops `image` to the region described by `section`.
pub fn trim_image(image: &CcdImage, section: &Section) -> Result<CcdImage> {
    let region = section.resolve(image.shape())?;
    trim_to_region(image, &region)
}

/// Crops `image` to `region`. The output shape is exactly the region's shape.
#[instrument(skip_all, fields(image = %image.display_name(), region = %region.to_fits_section()))]
pub fn trim_to_region(image: &CcdImage, region: &Region) -> Result<CcdImage> {
    let (rows, cols) = image.shape();
    if region.is_empty() || region.rows.end > rows || region.cols.end > cols {
        return Err(CalibrationError::SectionOutOfBounds {
            section: region.to_fits_section(),
            rows,
            cols,
        });
    }

    let data = region.view(&image.data).to_owned();
    let mut header = image.header.clone();
    for key in SECTION_KEYWORDS {
        header.remove(key);
    }
    header.set(TRIM_KEYWORD, format!("trimmed to {}", region.to_fits_section()));

    debug!("Trimmed {}x{} -> {}x{}", rows, cols, region.height(), region.width());

    Ok(CcdImage {
        data,
        header,
        source: image.source.clone(),
    })
}

/// Region to keep when trimming.
///
/// Precedence: the explicit section, then the `TRIMSEC` and `DATASEC`
/// keywords, then whatever is left when the overscan strip is cut away.
pub fn trim_region_for(
    image: &CcdImage,
    overscan: Option<&Region>,
    explicit: Option<&Section>,
) -> Result<Region> {
    let shape = image.shape();

    if let Some(section) = explicit {
        return section.resolve(shape);
    }

    for key in ["TRIMSEC", "DATASEC"] {
        if let Some(text) = image.header.get_str(key) {
            return Section::from_fits(text)?.resolve(shape);
        }
    }

    overscan
        .and_then(|region| region.complement_strip(shape))
        .ok_or_else(|| {
            CalibrationError::MissingKeyword(
                "TRIMSEC (the overscan region is not an edge strip, so the data region cannot be inferred)"
                    .to_string(),
            )
        })
}
