//! TIFF preview configuration types

use std::str::FromStr;

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - best compression (slower)
    DeflateBest,
    /// Deflate compression - balanced
    DeflateBalanced,
}

impl FromStr for TiffCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(TiffCompression::None),
            "lzw" => Ok(TiffCompression::Lzw),
            "deflate-fast" => Ok(TiffCompression::DeflateFast),
            "deflate" | "deflate-balanced" => Ok(TiffCompression::DeflateBalanced),
            "deflate-best" => Ok(TiffCompression::DeflateBest),
            other => Err(format!("unknown compression '{other}'")),
        }
    }
}

/// Configuration for writing a stretched preview
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    pub predictor: Option<u16>,
    /// Percentile mapped to black
    pub low_percentile: f32,
    /// Percentile mapped to white
    pub high_percentile: f32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::DeflateBalanced,
            predictor: Some(2),
            low_percentile: 0.5,
            high_percentile: 99.5,
        }
    }
}

impl PreviewConfig {
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }
}

/// Builder for PreviewConfig
#[derive(Default)]
pub struct PreviewConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    low_percentile: Option<f32>,
    high_percentile: Option<f32>,
}

impl PreviewConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Percentiles (0..=100) mapped to black and white. Out-of-range values are clamped.
    pub fn stretch(mut self, low: f32, high: f32) -> Self {
        self.low_percentile = Some(low.clamp(0.0, 100.0));
        self.high_percentile = Some(high.clamp(0.0, 100.0));
        self
    }

    pub fn build(self) -> PreviewConfig {
        let default = PreviewConfig::default();
        PreviewConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            low_percentile: self.low_percentile.unwrap_or(default.low_percentile),
            high_percentile: self.high_percentile.unwrap_or(default.high_percentile),
        }
    }
}
