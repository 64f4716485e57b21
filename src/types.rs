//! Fundamental types shared across the editing engine.

use serde::{Deserialize, Serialize};

/// Tag distinguishing the kind of sample a [`crate::Sample`] carries.
///
/// `Data` and `Caption` samples pass through Trim/Stitch untouched; `Video`
/// and `Audio` are the editable types the engines reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    Video,
    Audio,
    Data,
    Caption,
}

impl SampleType {
    pub fn is_editable(self) -> bool {
        matches!(self, SampleType::Video | SampleType::Audio)
    }
}

/// `round_divide(a, new, old) = (a * new + old / 2) / old`, the symmetric
/// rounding convention used for every inter-timescale conversion.
pub fn round_divide(a: u64, new: u64, old: u64) -> u64 {
    (a * new + old / 2) / old
}

/// Signed variant of [`round_divide`], used when the value being rescaled
/// may be negative (e.g. a dts already shifted by a prior splice).
pub fn round_divide_i64(a: i64, new: u32, old: u32) -> i64 {
    let (new, old) = (new as i64, old as i64);
    if a >= 0 {
        (a * new + old / 2) / old
    } else {
        -(((-a) * new + old / 2) / old)
    }
}

/// `ceil_divide(a, b) = ceil(a / b)` for non-negative integers.
pub fn ceil_divide(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// Median of a slice of deltas, used to approximate the duration of the last
/// sample in a track (there is no dts delta following it to measure).
///
/// Mirrors the "median dts delta" convention used throughout the original
/// duration-calculation code: an even-length slice averages its two middle
/// elements via integer division.
pub fn median(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_divide_matches_half_up_rounding() {
        assert_eq!(round_divide(1, 3, 2), 2); // 1*3=3, (3+1)/2=2
        assert_eq!(round_divide(90000, 1000, 90000), 1000);
        assert_eq!(round_divide(0, 1000, 90000), 0);
    }

    #[test]
    fn ceil_divide_rounds_up() {
        assert_eq!(ceil_divide(60, 2), 30);
        assert_eq!(ceil_divide(61, 2), 31);
        assert_eq!(ceil_divide(0, 2), 0);
    }

    #[test]
    fn median_of_empty_is_zero() {
        assert_eq!(median(&[]), 0);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3000, 3000, 3000]), 3000);
        assert_eq!(median(&[3000, 3000, 3000, 3001]), 3000);
    }
}
