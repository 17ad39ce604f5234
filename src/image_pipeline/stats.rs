//! Pixel statistics and histograms for inspecting frames before and after calibration.

use std::fmt::Write as _;

use ndarray::ArrayView2;
use serde::Serialize;

/// Median of a slice, reordering it in place. Even lengths average the two middle values.
pub fn median_in_place(values: &mut [f32]) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return Some(upper);
    }
    let lower_max = lower.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    Some(((lower_max as f64 + upper as f64) / 2.0) as f32)
}

/// Arithmetic mean accumulated in `f64`.
pub fn mean_of(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some((sum / values.len() as f64) as f32)
}

/// Population standard deviation around a given centre.
pub fn std_dev_about(values: &[f32], centre: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let centre = centre as f64;
    let sum_sq: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - centre;
            d * d
        })
        .sum();
    (sum_sq / values.len() as f64).sqrt() as f32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageStatistics {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub median: f32,
    pub std_dev: f32,
}

impl ImageStatistics {
    /// Statistics over the finite pixels of a view; `None` if there are none.
    pub fn compute(view: ArrayView2<f32>) -> Option<Self> {
        let mut values: Vec<f32> = view.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = mean_of(&values)?;
        let std_dev = std_dev_about(&values, mean);
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let count = values.len();
        let median = median_in_place(&mut values)?;

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            std_dev,
        })
    }
}

/// Equal-width histogram of pixel values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub lower: f32,
    pub upper: f32,
    pub counts: Vec<usize>,
    /// Values below `lower`
    pub underflow: usize,
    /// Values above `upper`
    pub overflow: usize,
}

impl Histogram {
    /// Bins the finite values of `view`. Without an explicit range the data's
    /// min/max are used. A value equal to the upper bound lands in the last bin.
    pub fn compute(view: ArrayView2<f32>, bins: usize, range: Option<(f32, f32)>) -> Option<Self> {
        let bins = bins.max(1);
        let (lower, upper) = match range {
            Some(range) => range,
            None => {
                let (lo, hi) = view
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                if !lo.is_finite() {
                    return None;
                }
                (lo, hi)
            }
        };
        // Degenerate range: a single bin of width one
        let upper = if upper > lower { upper } else { lower + 1.0 };
        let width = (upper - lower) as f64 / bins as f64;

        let mut counts = vec![0usize; bins];
        let mut underflow = 0;
        let mut overflow = 0;
        for &v in view.iter().filter(|v| v.is_finite()) {
            if v < lower {
                underflow += 1;
            } else if v > upper {
                overflow += 1;
            } else {
                let idx = (((v - lower) as f64) / width) as usize;
                counts[idx.min(bins - 1)] += 1;
            }
        }

        Some(Self {
            lower,
            upper,
            counts,
            underflow,
            overflow,
        })
    }

    pub fn bin_width(&self) -> f32 {
        (self.upper - self.lower) / self.counts.len() as f32
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum::<usize>() + self.underflow + self.overflow
    }

    /// Text bar chart, one line per bin, bars scaled to `width` characters.
    pub fn render(&self, width: usize) -> String {
        let peak = self.counts.iter().copied().max().unwrap_or(0).max(1);
        let bin_width = self.bin_width();
        let mut out = String::new();

        for (i, &count) in self.counts.iter().enumerate() {
            let lo = self.lower + bin_width * i as f32;
            let bar = count * width / peak;
            let _ = writeln!(
                out,
                "{:>12.2} .. {:>12.2} | {:<width$} {}",
                lo,
                lo + bin_width,
                "#".repeat(bar),
                count,
                width = width
            );
        }
        if self.underflow > 0 || self.overflow > 0 {
            let _ = writeln!(out, "underflow: {}, overflow: {}", self.underflow, self.overflow);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median_in_place(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_in_place(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_in_place(&mut []), None);
    }

    #[test]
    fn test_statistics_ignore_nan() {
        let data = array![[1.0, 2.0], [3.0, f32::NAN]];
        let stats = ImageStatistics::compute(data.view()).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.median, 2.0);
        assert!((stats.std_dev - (2.0f32 / 3.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_statistics_of_all_nan_is_none() {
        let data = Array2::from_elem((2, 2), f32::NAN);
        assert!(ImageStatistics::compute(data.view()).is_none());
    }

    #[test]
    fn test_histogram_bins_and_overflow() {
        let data = array![[0.0, 1.0, 2.0, 3.0], [4.0, 5.0, -1.0, 10.0]];
        let hist = Histogram::compute(data.view(), 5, Some((0.0, 5.0))).unwrap();
        assert_eq!(hist.counts, vec![1, 1, 1, 1, 2]);
        assert_eq!(hist.underflow, 1);
        assert_eq!(hist.overflow, 1);
        assert_eq!(hist.total(), 8);
    }

    #[test]
    fn test_histogram_constant_image() {
        let data = Array2::from_elem((3, 3), 7.0f32);
        let hist = Histogram::compute(data.view(), 4, None).unwrap();
        assert_eq!(hist.counts[0], 9);
        assert!(hist.render(20).lines().count() >= 4);
    }
}
