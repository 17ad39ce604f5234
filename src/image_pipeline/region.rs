//! Rectangular image regions and section descriptors
//!
//! Two textual notations are accepted:
//!
//! * FITS/IRAF sections such as `BIASSEC = '[2049:2080,1:2048]'`: 1-based,
//!   inclusive, columns (NAXIS1) first. `*` selects a whole axis.
//! * Array slices such as `[0:2048, 2048:2080]`: 0-based, end-exclusive,
//!   rows first. Bounds may be omitted or negative (counted from the end).
//!
//! Both resolve to the same [`Region`] against a concrete image shape.

use std::fmt;
use std::ops::Range;

use ndarray::{ArrayView2, Array2, s};

use crate::image_pipeline::common::error::{CalibrationError, Result};

/// A resolved region: 0-based, half-open row and column ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Region {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    /// The whole of an image with the given `(rows, cols)` shape.
    pub fn full(shape: (usize, usize)) -> Self {
        Self::new(0..shape.0, 0..shape.1)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    /// Renders the region as a FITS section, e.g. `[2049:2080,1:2048]`.
    pub fn to_fits_section(&self) -> String {
        format!(
            "[{}:{},{}:{}]",
            self.cols.start + 1,
            self.cols.end,
            self.rows.start + 1,
            self.rows.end
        )
    }

    pub fn view<'a>(&self, data: &'a Array2<f32>) -> ArrayView2<'a, f32> {
        data.slice(s![self.rows.clone(), self.cols.clone()])
    }

    /// Data region left over when this region is an overscan strip along one edge.
    ///
    /// The strip must span the full height at the left or right edge, or the
    /// full width at the top or bottom edge. Returns `None` otherwise.
    pub fn complement_strip(&self, shape: (usize, usize)) -> Option<Region> {
        let (rows, cols) = shape;

        if self.rows == (0..rows) {
            if self.cols.end == cols && self.cols.start > 0 {
                return Some(Region::new(0..rows, 0..self.cols.start));
            }
            if self.cols.start == 0 && self.cols.end < cols {
                return Some(Region::new(0..rows, self.cols.end..cols));
            }
        }

        if self.cols == (0..cols) {
            if self.rows.end == rows && self.rows.start > 0 {
                return Some(Region::new(0..self.rows.start, 0..cols));
            }
            if self.rows.start == 0 && self.rows.end < rows {
                return Some(Region::new(self.rows.end..rows, 0..cols));
            }
        }

        None
    }
}

/// Textual convention a [`Section`] was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Notation {
    #[default]
    Fits,
    Python,
}

/// One axis of an unresolved section, already in 0-based half-open form.
/// Negative bounds count from the end of the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisBounds {
    start: Option<i64>,
    end: Option<i64>,
}

impl AxisBounds {
    const ALL: AxisBounds = AxisBounds {
        start: None,
        end: None,
    };

    fn resolve(&self, len: usize) -> Option<Range<usize>> {
        let len = len as i64;
        let normalize = |v: i64| if v < 0 { len + v } else { v };
        let start = self.start.map(normalize).unwrap_or(0);
        let end = self.end.map(normalize).unwrap_or(len);
        if start < 0 || end > len || start >= end {
            return None;
        }
        Some(start as usize..end as usize)
    }
}

/// A region descriptor not yet checked against an image shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    rows: AxisBounds,
    cols: AxisBounds,
    notation: Notation,
    text: String,
}

impl Section {
    pub fn parse(text: &str, notation: Notation) -> Result<Self> {
        match notation {
            Notation::Fits => Self::from_fits(text),
            Notation::Python => Self::from_python(text),
        }
    }

    /// Parses a FITS section `[x1:x2,y1:y2]` (1-based, inclusive, columns first).
    pub fn from_fits(text: &str) -> Result<Self> {
        let (first, second) = split_brackets(text)?;
        let invalid = || CalibrationError::InvalidSection(text.trim().to_string());

        let parse_axis = |part: &str| -> Result<AxisBounds> {
            if part == "*" {
                return Ok(AxisBounds::ALL);
            }
            let (lo, hi) = match part.split_once(':') {
                Some((lo, hi)) => (parse_index(lo, text)?, parse_index(hi, text)?),
                None => {
                    let idx = parse_index(part, text)?;
                    (idx, idx)
                }
            };
            if lo < 1 || hi < lo {
                return Err(invalid());
            }
            Ok(AxisBounds {
                start: Some(lo - 1),
                end: Some(hi),
            })
        };

        Ok(Self {
            cols: parse_axis(first)?,
            rows: parse_axis(second)?,
            notation: Notation::Fits,
            text: text.trim().to_string(),
        })
    }

    /// Parses an array slice `[r1:r2, c1:c2]` (0-based, end-exclusive, rows first).
    pub fn from_python(text: &str) -> Result<Self> {
        let (first, second) = split_brackets(text)?;

        let parse_bound = |raw: &str| -> Result<Option<i64>> {
            let raw = raw.trim();
            if raw.is_empty() {
                Ok(None)
            } else {
                parse_index(raw, text).map(Some)
            }
        };

        let parse_axis = |part: &str| -> Result<AxisBounds> {
            let pieces: Vec<&str> = part.split(':').collect();
            match pieces.as_slice() {
                [single] => {
                    let idx = parse_index(single, text)?;
                    let end = if idx == -1 { None } else { Some(idx + 1) };
                    Ok(AxisBounds {
                        start: Some(idx),
                        end,
                    })
                }
                [lo, hi] => Ok(AxisBounds {
                    start: parse_bound(lo)?,
                    end: parse_bound(hi)?,
                }),
                _ => Err(CalibrationError::InvalidSection(text.trim().to_string())),
            }
        };

        Ok(Self {
            rows: parse_axis(first)?,
            cols: parse_axis(second)?,
            notation: Notation::Python,
            text: text.trim().to_string(),
        })
    }

    pub fn notation(&self) -> Notation {
        self.notation
    }

    /// Checks the section against a `(rows, cols)` shape. Empty regions are rejected.
    pub fn resolve(&self, shape: (usize, usize)) -> Result<Region> {
        let (rows, cols) = shape;
        let out_of_bounds = || CalibrationError::SectionOutOfBounds {
            section: self.text.clone(),
            rows,
            cols,
        };
        let row_range = self.rows.resolve(rows).ok_or_else(out_of_bounds)?;
        let col_range = self.cols.resolve(cols).ok_or_else(out_of_bounds)?;
        Ok(Region::new(row_range, col_range))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn split_brackets(text: &str) -> Result<(&str, &str)> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| CalibrationError::InvalidSection(trimmed.to_string()))?;

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [first, second] if !first.is_empty() && !second.is_empty() => Ok((first, second)),
        _ => Err(CalibrationError::InvalidSection(trimmed.to_string())),
    }
}

fn parse_index(raw: &str, text: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CalibrationError::InvalidSection(text.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: (usize, usize) = (2048, 2080);

    #[test]
    fn test_fits_section_resolves_columns_first() {
        let region = Section::from_fits("[2049:2080,1:2048]")
            .unwrap()
            .resolve(SHAPE)
            .unwrap();
        assert_eq!(region, Region::new(0..2048, 2048..2080));
        assert_eq!(region.to_fits_section(), "[2049:2080,1:2048]");
    }

    #[test]
    fn test_fits_and_python_notations_agree() {
        let fits = Section::from_fits(" [2049:2080, 1:2048] ").unwrap();
        let python = Section::from_python("[0:2048, 2048:2080]").unwrap();
        assert_eq!(fits.resolve(SHAPE).unwrap(), python.resolve(SHAPE).unwrap());
    }

    #[test]
    fn test_fits_star_and_single_index() {
        let region = Section::from_fits("[*,5]").unwrap().resolve((10, 8)).unwrap();
        assert_eq!(region, Region::new(4..5, 0..8));
    }

    #[test]
    fn test_python_open_and_negative_bounds() {
        let region = Section::from_python("[:, -32:]").unwrap().resolve(SHAPE).unwrap();
        assert_eq!(region, Region::new(0..2048, 2048..2080));

        let region = Section::from_python("[10:-10, 3]").unwrap().resolve((100, 8)).unwrap();
        assert_eq!(region, Region::new(10..90, 3..4));

        let region = Section::from_python("[-1, :]").unwrap().resolve((100, 8)).unwrap();
        assert_eq!(region, Region::new(99..100, 0..8));
    }

    #[test]
    fn test_invalid_sections_are_rejected() {
        for text in ["", "2049:2080,1:2048", "[1:2]", "[a:b,1:2]", "[0:5,1:2]", "[5:1,1:2]"] {
            assert!(
                matches!(Section::from_fits(text), Err(CalibrationError::InvalidSection(_))),
                "{text} should not parse"
            );
        }
        assert!(Section::from_python("[0:4:2, :]").is_err());
    }

    #[test]
    fn test_out_of_bounds_and_empty_sections() {
        let result = Section::from_fits("[1:3000,1:10]").unwrap().resolve(SHAPE);
        assert!(matches!(result, Err(CalibrationError::SectionOutOfBounds { .. })));

        let result = Section::from_python("[5:5, :]").unwrap().resolve(SHAPE);
        assert!(matches!(result, Err(CalibrationError::SectionOutOfBounds { .. })));
    }

    #[test]
    fn test_complement_of_edge_strips() {
        let shape = (100, 120);
        let right = Region::new(0..100, 110..120);
        assert_eq!(right.complement_strip(shape), Some(Region::new(0..100, 0..110)));

        let left = Region::new(0..100, 0..10);
        assert_eq!(left.complement_strip(shape), Some(Region::new(0..100, 10..120)));

        let top = Region::new(95..100, 0..120);
        assert_eq!(top.complement_strip(shape), Some(Region::new(0..95, 0..120)));

        let interior = Region::new(10..20, 10..20);
        assert_eq!(interior.complement_strip(shape), None);
        assert_eq!(Region::full(shape).complement_strip(shape), None);
    }
}
