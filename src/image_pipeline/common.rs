//! Common utilities module
//!
//! This module contains the error type shared across the calibration pipeline.

pub mod error;

pub use error::{CalibrationError, Result};
