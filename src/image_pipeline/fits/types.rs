//! Calibration image and FITS header types

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::Array2;
use serde::Serialize;

/// Value of a single header card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(s) => f.write_str(s),
            HeaderValue::Integer(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Text(value)
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Integer(value)
    }
}

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    pub key: String,
    pub value: HeaderValue,
}

/// Ordered set of header cards. Keys are stored upper-case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageHeader {
    cards: Vec<HeaderCard>,
}

impl ImageHeader {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.cards
            .iter()
            .position(|card| card.key.eq_ignore_ascii_case(key))
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.position(key).map(|idx| &self.cards[idx].value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    /// Sets a card, replacing an existing value in place so card order is kept.
    pub fn set(&mut self, key: &str, value: impl Into<HeaderValue>) {
        let value = value.into();
        match self.position(key) {
            Some(idx) => self.cards[idx].value = value,
            None => self.cards.push(HeaderCard {
                key: key.to_ascii_uppercase(),
                value,
            }),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        self.position(key).map(|idx| self.cards.remove(idx).value)
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// How a recognised keyword is read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Text,
    Float,
    Integer,
}

/// Keywords loaded by the FITS reader. Everything else in the file header is ignored.
pub const KNOWN_KEYWORDS: &[(&str, KeywordKind)] = &[
    ("IMAGETYP", KeywordKind::Text),
    ("OBJECT", KeywordKind::Text),
    ("FILTER", KeywordKind::Text),
    ("DATE-OBS", KeywordKind::Text),
    ("INSTRUME", KeywordKind::Text),
    ("TELESCOP", KeywordKind::Text),
    ("BIASSEC", KeywordKind::Text),
    ("TRIMSEC", KeywordKind::Text),
    ("DATASEC", KeywordKind::Text),
    ("EXPTIME", KeywordKind::Float),
    ("EXPOSURE", KeywordKind::Float),
    ("CCD-TEMP", KeywordKind::Float),
    ("GAIN", KeywordKind::Float),
    ("RDNOISE", KeywordKind::Float),
    ("XBINNING", KeywordKind::Integer),
    ("YBINNING", KeywordKind::Integer),
    ("NCOMBINE", KeywordKind::Integer),
    ("SUBOVSCN", KeywordKind::Text),
    ("TRIMIMA", KeywordKind::Text),
    ("COMBTYPE", KeywordKind::Text),
];

/// Image type as recorded in `IMAGETYP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameType {
    Bias,
    Dark,
    Flat,
    Light,
    Unknown(String),
}

impl FrameType {
    /// Parses an `IMAGETYP` value. Matching ignores case and surrounding whitespace.
    pub fn from_imagetyp(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "bias" | "zero" | "bias frame" => FrameType::Bias,
            "dark" | "dark frame" => FrameType::Dark,
            "flat" | "flat field" | "flat frame" | "skyflat" | "domeflat" => FrameType::Flat,
            "light" | "object" | "light frame" | "science" => FrameType::Light,
            _ => FrameType::Unknown(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FrameType::Bias => "bias",
            FrameType::Dark => "dark",
            FrameType::Flat => "flat",
            FrameType::Light => "light",
            FrameType::Unknown(s) => s.as_str(),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = String;

    /// Strict parse used for user input: unknown types are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match FrameType::from_imagetyp(s) {
            FrameType::Unknown(other) => Err(format!(
                "unknown frame type '{other}' (expected bias, dark, flat or light)"
            )),
            known => Ok(known),
        }
    }
}

/// A calibration image: detector counts (rows x columns) plus header metadata.
#[derive(Debug, Clone)]
pub struct CcdImage {
    pub data: Array2<f32>,
    pub header: ImageHeader,
    /// File the image was read from, if any
    pub source: Option<PathBuf>,
}

impl CcdImage {
    pub fn new(data: Array2<f32>, header: ImageHeader) -> Self {
        Self {
            data,
            header,
            source: None,
        }
    }

    pub fn with_source(mut self, path: impl AsRef<Path>) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn frame_type(&self) -> Option<FrameType> {
        self.header.get_str("IMAGETYP").map(FrameType::from_imagetyp)
    }

    pub fn exposure_time(&self) -> Option<f64> {
        self.header
            .get_f64("EXPTIME")
            .or_else(|| self.header.get_f64("EXPOSURE"))
    }

    pub fn filter(&self) -> Option<&str> {
        self.header.get_str("FILTER")
    }

    pub fn display_name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}

/// Header and pixel shape of a file, read without its pixel data.
#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub header: ImageHeader,
    /// `(rows, cols)`
    pub shape: (usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_type_spellings() {
        assert_eq!(FrameType::from_imagetyp("BIAS"), FrameType::Bias);
        assert_eq!(FrameType::from_imagetyp(" Bias Frame "), FrameType::Bias);
        assert_eq!(FrameType::from_imagetyp("zero"), FrameType::Bias);
        assert_eq!(FrameType::from_imagetyp("Dark Frame"), FrameType::Dark);
        assert_eq!(FrameType::from_imagetyp("FLAT FIELD"), FrameType::Flat);
        assert_eq!(FrameType::from_imagetyp("object"), FrameType::Light);
        assert_eq!(
            FrameType::from_imagetyp(" arc "),
            FrameType::Unknown("arc".to_string())
        );
    }

    #[test]
    fn test_frame_type_from_str_rejects_unknown() {
        assert_eq!("light".parse::<FrameType>(), Ok(FrameType::Light));
        assert!("arc".parse::<FrameType>().is_err());
    }

    #[test]
    fn test_header_set_replaces_in_place() {
        let mut header = ImageHeader::new();
        header.set("imagetyp", "BIAS");
        header.set("EXPTIME", 0.0);
        header.set("IMAGETYP", "DARK");

        assert_eq!(header.len(), 2);
        assert_eq!(header.cards()[0].key, "IMAGETYP");
        assert_eq!(header.get_str("imagetyp"), Some("DARK"));
    }

    #[test]
    fn test_header_remove() {
        let mut header = ImageHeader::new();
        header.set("BIASSEC", "[1:2,1:2]");
        assert_eq!(header.remove("biassec"), Some(HeaderValue::from("[1:2,1:2]")));
        assert!(header.is_empty());
        assert_eq!(header.remove("BIASSEC"), None);
    }

    #[test]
    fn test_exposure_time_falls_back_to_exposure() {
        let mut header = ImageHeader::new();
        header.set("EXPOSURE", 30i64);
        let image = CcdImage::new(Array2::zeros((2, 2)), header);
        assert_eq!(image.exposure_time(), Some(30.0));
    }
}
