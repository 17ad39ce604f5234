//! CCD calibration pipeline module
//!
//! FITS reading and writing, section handling, the per-image calibration
//! steps, frame combination, statistics, previews, and the pipelines that
//! run them over directories of images.

pub mod common;
pub mod fits;
pub mod region;
pub mod collection;
pub mod calibration;
pub mod stats;
pub mod preview;
pub mod reductions;

pub use common::{
    CalibrationError,
    Result,
};

pub use fits::{
    CcdImage,
    FitsReader,
    FitsWriter,
    FitsioReader,
    FitsioWriter,
    FrameType,
    ImageHeader,
};

pub use region::{Notation, Region, Section};

pub use collection::{CollectionEntry, ImageCollection, SummaryRow};

pub use calibration::{
    CombineMethod,
    CombineOptions,
    OverscanModel,
    OverscanOptions,
    OverscanStatistic,
    SigmaClip,
};

pub use stats::{Histogram, ImageStatistics};

pub use preview::{
    PreviewConfig,
    StandardTiffPreviewWriter,
    TiffCompression,
    TiffPreviewWriter,
};

pub use reductions::{
    MasterFramePipeline,
    OverscanTrimPipeline,
    ReductionConfig,
    ReductionReport,
};
