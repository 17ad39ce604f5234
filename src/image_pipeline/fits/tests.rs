use ndarray::Array2;
use tempfile::tempdir;

use crate::image_pipeline::common::error::CalibrationError;
use crate::image_pipeline::fits::{
    CcdImage, FitsReader, FitsWriter, FitsioReader, FitsioWriter, FrameType, ImageHeader,
};

fn sample_image() -> CcdImage {
    let data = Array2::from_shape_fn((4, 6), |(r, c)| (r * 10 + c) as f32 - 3.5);
    let mut header = ImageHeader::new();
    header.set("IMAGETYP", "Bias Frame");
    header.set("EXPTIME", 0.0);
    header.set("BIASSEC", "[5:6,1:4]");
    header.set("XBINNING", 2i64);
    CcdImage::new(data, header)
}

#[test]
fn test_write_then_read_preserves_pixels_and_keywords() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bias_001.fits");
    let image = sample_image();

    FitsioWriter.write_image(&image, &path, false).unwrap();
    let loaded = FitsioReader.read_image(&path).unwrap();

    assert_eq!(loaded.shape(), (4, 6));
    assert_eq!(loaded.data, image.data);
    assert_eq!(loaded.frame_type(), Some(FrameType::Bias));
    assert_eq!(loaded.header.get_str("BIASSEC"), Some("[5:6,1:4]"));
    assert_eq!(loaded.header.get("XBINNING").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(loaded.exposure_time(), Some(0.0));
    assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
}

#[test]
fn test_read_header_reports_shape() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.fits");
    FitsioWriter.write_image(&sample_image(), &path, false).unwrap();

    let info = FitsioReader.read_header(&path).unwrap();
    assert_eq!(info.shape, (4, 6));
    assert_eq!(info.header.get_str("IMAGETYP"), Some("Bias Frame"));
}

#[test]
fn test_existing_file_requires_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("frame.fits");
    let image = sample_image();

    FitsioWriter.write_image(&image, &path, false).unwrap();
    let result = FitsioWriter.write_image(&image, &path, false);
    assert!(matches!(result, Err(CalibrationError::OutputWriteError(_))));

    FitsioWriter.write_image(&image, &path, true).unwrap();
}

#[test]
fn test_missing_file_is_input_error() {
    let dir = tempdir().unwrap();
    let result = FitsioReader.read_image(&dir.path().join("absent.fits"));
    assert!(matches!(result, Err(CalibrationError::InputReadError(_))));
}

#[test]
fn test_garbage_file_is_fits_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("notes.fits");
    std::fs::write(&path, b"this is not a FITS file").unwrap();

    let result = FitsioReader.read_header(&path);
    assert!(matches!(result, Err(CalibrationError::Fits { .. })));
}

#[test]
fn test_unsigned_short_pixels_read_as_f32() {
    use fitsio::FitsFile;
    use fitsio::images::{ImageDescription, ImageType};

    let dir = tempdir().unwrap();
    let path = dir.path().join("raw_u16.fits");
    {
        let description = ImageDescription {
            data_type: ImageType::UnsignedShort,
            dimensions: &[2, 3],
        };
        let mut fptr = FitsFile::create(&path)
            .with_custom_primary(&description)
            .open()
            .unwrap();
        let hdu = fptr.primary_hdu().unwrap();
        hdu.write_image(&mut fptr, &[0u16, 1, 40000, 65535, 32768, 7]).unwrap();
    }

    let image = FitsioReader.read_image(&path).unwrap();
    assert_eq!(image.shape(), (2, 3));
    assert_eq!(
        image.data,
        Array2::from_shape_vec((2, 3), vec![0.0, 1.0, 40000.0, 65535.0, 32768.0, 7.0]).unwrap()
    );
}

#[test]
fn test_empty_primary_falls_back_to_first_extension() {
    use fitsio::FitsFile;
    use fitsio::images::{ImageDescription, ImageType};

    let dir = tempdir().unwrap();
    let path = dir.path().join("extension.fits");
    {
        let mut fptr = FitsFile::create(&path).open().unwrap();
        let description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[2, 2],
        };
        let hdu = fptr.create_image("SCI".to_string(), &description).unwrap();
        hdu.write_image(&mut fptr, &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
    }

    let info = FitsioReader.read_header(&path).unwrap();
    assert_eq!(info.shape, (2, 2));

    let image = FitsioReader.read_image(&path).unwrap();
    assert_eq!(image.data[[0, 1]], 2.0);
    assert_eq!(image.data[[1, 0]], 3.0);
}

#[test]
fn test_failed_write_leaves_no_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("master.fits");
    let mut image = sample_image();
    image.header.set("BAD\0KEY", "x");

    let result = FitsioWriter.write_image(&image, &path, false);
    assert!(matches!(result, Err(CalibrationError::Fits { .. })));
    assert!(!path.exists());

    image.header.remove("BAD\0KEY");
    FitsioWriter.write_image(&image, &path, false).unwrap();
    assert!(path.exists());
}

#[test]
fn test_only_recognised_keywords_are_carried() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("light.fits");
    let mut image = sample_image();
    image.header.set("AIRMASS", 1.25);
    image.header.set("OBSERVER", "night crew");

    FitsioWriter.write_image(&image, &path, false).unwrap();
    let loaded = FitsioReader.read_image(&path).unwrap();

    assert_eq!(loaded.header.get("AIRMASS"), None);
    assert_eq!(loaded.header.get("OBSERVER"), None);
    assert_eq!(loaded.header.get_str("IMAGETYP"), Some("Bias Frame"));
}
