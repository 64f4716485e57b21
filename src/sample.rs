//! A single decodable unit of a track.

use std::fmt;
use std::sync::Arc;

use crate::types::SampleType;

/// Where a sample's payload lives in the backing container, for diagnostic
/// tooling. Not consulted by Trim/Stitch/Mux themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub position: u64,
    pub size: u64,
    pub available: bool,
}

/// A lazily-materialized payload accessor.
///
/// The closure owns (via `Arc`) whatever keeps the backing bytes alive, so a
/// `Sample` can be cloned and outlive the track view that produced it as long
/// as the originating reader is still alive somewhere.
pub type PayloadFn = Arc<dyn Fn() -> Vec<u8> + Send + Sync>;

/// An immutable sample record.
///
/// `dts` is the decode timestamp and must be `<= pts`; within a track, `dts`
/// is strictly non-decreasing when samples are enumerated in track order.
/// The engines never look inside `payload`; it is carried through unchanged.
#[derive(Clone)]
pub struct Sample {
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
    pub sample_type: SampleType,
    pub payload: PayloadFn,
    pub byte_range: Option<ByteRange>,
}

impl Sample {
    pub fn new(pts: i64, dts: i64, keyframe: bool, sample_type: SampleType, payload: PayloadFn) -> Sample {
        Sample { pts, dts, keyframe, sample_type, payload, byte_range: None }
    }

    /// Every audio sample is a keyframe by definition.
    pub fn audio(pts: i64, dts: i64, payload: PayloadFn) -> Sample {
        Sample::new(pts, dts, true, SampleType::Audio, payload)
    }

    pub fn with_byte_range(mut self, byte_range: ByteRange) -> Sample {
        self.byte_range = Some(byte_range);
        self
    }

    /// Return a copy with both timestamps shifted by `offset`.
    pub fn shift(&self, offset: i64) -> Sample {
        Sample {
            pts: self.pts.saturating_add(offset),
            dts: self.dts.saturating_add(offset),
            keyframe: self.keyframe,
            sample_type: self.sample_type,
            payload: self.payload.clone(),
            byte_range: self.byte_range,
        }
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("keyframe", &self.keyframe)
            .field("sample_type", &self.sample_type)
            .field("byte_range", &self.byte_range)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(pts: i64, dts: i64) -> Sample {
        Sample::new(pts, dts, dts == 0, SampleType::Video, Arc::new(|| Vec::new()))
    }

    #[test]
    fn shift_moves_both_timestamps() {
        let s = sample(1000, 900).shift(-900);
        assert_eq!((s.pts, s.dts), (100, 0));
    }

    #[test]
    fn shift_saturates_instead_of_overflowing() {
        let s = sample(i64::MAX - 1, i64::MAX - 1).shift(100);
        assert_eq!(s.pts, i64::MAX);
        assert_eq!(s.dts, i64::MAX);
    }
}
