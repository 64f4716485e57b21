//! Extract a `[start_ms, start_ms + duration_ms)` window from a track,
//! realigned to a keyframe, with rewritten edit boxes.

use crate::editbox::{self, EditBox};
use crate::error::Result;
use crate::sample::Sample;
use crate::types::{median, SampleType};

/// Result of trimming one track: the rewritten samples, edit boxes and
/// reported duration.
pub struct Trimmed {
    pub samples: Vec<Sample>,
    pub edit_boxes: Vec<EditBox>,
    pub duration: u64,
}

/// Sum of DTS deltas plus the median delta, approximating the duration of
/// the last sample (which has no following delta to measure). Mirrors the
/// container-writer convention the design calls out as worth preserving even
/// though it can exceed the edit-box coverage.
pub fn calculate_duration(samples: &[Sample]) -> Result<u64> {
    if samples.is_empty() {
        return Err(error!(InvalidArguments, "cannot calculate duration of an empty sample list"));
    }
    let mut deltas = Vec::with_capacity(samples.len().saturating_sub(1));
    let mut duration: u64 = 0;
    let mut prev_dts = samples[0].dts;
    for sample in &samples[1..] {
        if sample.dts < prev_dts {
            return Err(error!(Invalid, "dts must be non-decreasing: {} < {}", sample.dts, prev_dts));
        }
        let delta = (sample.dts - prev_dts) as u64;
        duration += delta;
        deltas.push(delta);
        prev_dts = sample.dts;
    }
    duration += median(&deltas);
    Ok(duration)
}

/// Pop a leading empty edit box (if any) and return its duration as the
/// track's leading silence offset.
fn extract_offset(boxes: &mut Vec<EditBox>) -> Result<u64> {
    if !editbox::valid(boxes) {
        return Err(error!(Invalid, "edit-box list fails validation"));
    }
    if let Some(first) = boxes.first() {
        if first.is_empty() {
            let offset = first.duration_pts;
            boxes.remove(0);
            return Ok(offset);
        }
    }
    Ok(0)
}

/// Rewrite `in_boxes` to cover `[start_pts, start_pts + duration_pts)` of the
/// *playback* timeline.
fn trim_edit_boxes(
    mut in_boxes: Vec<EditBox>,
    sample_type: SampleType,
    mut start_pts: u64,
    mut duration_pts: u64,
) -> Result<Vec<EditBox>> {
    if !editbox::valid(&in_boxes) {
        return Err(error!(Invalid, "edit-box list fails validation"));
    }
    let mut track_offset = extract_offset(&mut in_boxes)?;
    let end_pts = start_pts + duration_pts;

    if start_pts >= track_offset {
        start_pts -= track_offset;
        track_offset = 0;
    } else if end_pts > track_offset {
        track_offset -= start_pts;
        start_pts = 0;
        duration_pts -= track_offset;
    } else {
        // trim falls entirely within the leading silence: no playable output
        return Ok(Vec::new());
    }

    let mut out_boxes = Vec::new();
    if in_boxes.is_empty() {
        if start_pts > i64::MAX as u64 {
            return Err(error!(Overflow, "start_pts {} exceeds i64 range", start_pts));
        }
        out_boxes.push(EditBox::new(start_pts as i64, duration_pts, 1.0, sample_type));
    } else {
        let mut offset = start_pts;
        let mut remaining = duration_pts;
        for b in in_boxes {
            if b.sample_type != sample_type {
                return Err(error!(Invalid, "edit box type mismatch"));
            }
            if b.is_empty() {
                return Err(error!(Invalid, "non-leading empty edit box"));
            }
            if offset >= b.duration_pts {
                offset -= b.duration_pts;
            } else {
                let out_start = b.start_pts.checked_add(offset as i64).ok_or_else(|| error!(Overflow, "edit box start overflow"))?;
                let out_duration = (b.duration_pts - offset).min(remaining);
                out_boxes.push(EditBox::new(out_start, out_duration, 1.0, sample_type));
                offset = 0;
                remaining -= out_duration;
                if remaining == 0 {
                    break;
                }
            }
        }
    }
    if track_offset != 0 {
        out_boxes.insert(0, EditBox::empty(track_offset, sample_type));
    }
    Ok(out_boxes)
}

struct Gop {
    start_keyframe_index: i64,
    start_index: i64,
    end_index: i64,
}

impl Gop {
    /// The GOP(s) needed to play samples in `[start_pts, start_pts + duration_pts)`.
    fn find(samples: &[Sample], start_pts: u64, duration_pts: u64) -> Gop {
        let mut start_keyframe_index: i64 = -1;
        let mut start_index: i64 = -1;
        let mut end_index: i64 = -1;
        let end_pts = (start_pts + duration_pts) as i64;
        let start_pts = start_pts as i64;

        for (index, sample) in samples.iter().enumerate() {
            let index = index as i64;
            if sample.keyframe {
                if start_keyframe_index < 0 {
                    start_keyframe_index = index;
                } else if start_index < 0 && sample.pts <= start_pts {
                    start_keyframe_index = index;
                }
            }
            if start_index < 0 && sample.pts >= start_pts {
                start_index = index;
            }
            if sample.pts < end_pts {
                end_index = index;
            }
        }
        Gop { start_keyframe_index, start_index, end_index }
    }

    fn valid(&self) -> bool {
        self.start_keyframe_index >= 0 && self.start_index >= self.start_keyframe_index && self.end_index >= self.start_index
    }
}

/// Trim `samples` (all of one `sample_type`) according to `edit_boxes`,
/// extracting `[start_ms, start_ms + duration_ms)` of the playback timeline.
pub fn trim(
    samples: &[Sample],
    edit_boxes: Vec<EditBox>,
    sample_type: SampleType,
    timescale: u32,
    start_ms: u64,
    duration_ms: u64,
) -> Result<Trimmed> {
    if duration_ms == 0 {
        return Err(error!(InvalidArguments, "duration_ms must be nonzero"));
    }
    if samples.is_empty() {
        if edit_boxes.is_empty() {
            return Ok(Trimmed { samples: Vec::new(), edit_boxes: Vec::new(), duration: 0 });
        }
        return Err(error!(InvalidArguments, "non-empty edit boxes require non-empty samples"));
    }

    let start_pts = start_ms * timescale as u64 / 1000;
    let mut duration_pts = (duration_ms * timescale as u64 + 999) / 1000;
    if edit_boxes.is_empty() {
        duration_pts = duration_pts.min(calculate_duration(samples)?);
    }

    let trimmed_boxes = trim_edit_boxes(edit_boxes, sample_type, start_pts, duration_pts)?;

    let mut min_start_pts = u64::MAX;
    let mut max_end_pts = 0u64;
    for b in &trimmed_boxes {
        if b.sample_type != sample_type {
            return Err(error!(Invalid, "edit box type mismatch"));
        }
        if !b.is_empty() {
            let end = b.start_pts as u64 + b.duration_pts;
            min_start_pts = min_start_pts.min(b.start_pts as u64);
            max_end_pts = max_end_pts.max(end);
        }
    }

    if min_start_pts >= max_end_pts {
        // no non-empty box survived trimming (e.g. trim fell entirely in silence)
        return Ok(Trimmed { samples: Vec::new(), edit_boxes: Vec::new(), duration: 0 });
    }

    let gop = Gop::find(samples, min_start_pts, max_end_pts - min_start_pts);
    if !gop.valid() {
        log::debug!("trim: no GOP covers [{}, {}), returning empty output", min_start_pts, max_end_pts);
        return Ok(Trimmed { samples: Vec::new(), edit_boxes: Vec::new(), duration: 0 });
    }

    let first_dts = samples[gop.start_keyframe_index as usize].dts;
    if first_dts > min_start_pts as i64 {
        return Err(error!(Unsupported, "first keyframe dts {} exceeds trim start {}", first_dts, min_start_pts));
    }

    let out_boxes: Vec<EditBox> = trimmed_boxes.iter().map(|b| b.shift(-first_dts)).collect();

    let mut out_samples = Vec::new();
    for index in gop.start_keyframe_index as usize..=gop.end_index as usize {
        let sample = &samples[index];
        if sample.sample_type != sample_type {
            return Err(error!(Invalid, "sample type mismatch"));
        }
        out_samples.push(sample.shift(-first_dts));
    }

    let duration = calculate_duration(&out_samples)?;
    Ok(Trimmed { samples: out_samples, edit_boxes: out_boxes, duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;
    use crate::types::SampleType::Video;
    use std::sync::Arc;

    fn video_sample(pts: i64, dts: i64, keyframe: bool) -> Sample {
        Sample::new(pts, dts, keyframe, Video, Arc::new(|| Vec::new()))
    }

    /// Keyframes at {0, 90000, 180000}, 30fps @ timescale 90000, no edit
    /// boxes; Trim(1000ms, 2000ms) starts at pts=90000.
    #[test]
    fn trim_exact_keyframe() {
        let timescale = 90000;
        let frame = timescale / 30;
        let samples: Vec<Sample> = (0..270)
            .map(|i| video_sample(i as i64 * frame as i64, i as i64 * frame as i64, i % 90 == 0))
            .collect();
        let result = trim(&samples, Vec::new(), Video, timescale, 1000, 2000).unwrap();
        assert_eq!(result.samples.first().unwrap().pts, 0);
        assert_eq!(result.samples.first().unwrap().dts, 0);
        assert_eq!(result.edit_boxes.len(), 1);
        assert_eq!(result.edit_boxes[0], EditBox::new(0, 180000, 1.0, Video));
        let expected_count = 180000 / frame as i64;
        assert_eq!(result.samples.len() as i64, expected_count);
    }

    /// Edit boxes `[{-1, 1000}, {0, 500}]` in timescale=1000; Trim(0ms, 200ms)
    /// lands entirely within the leading silence.
    #[test]
    fn trim_inside_silence_yields_no_samples() {
        let timescale = 1000;
        let boxes = vec![EditBox::empty(1000, Video), EditBox::new(0, 500, 1.0, Video)];
        let samples = vec![video_sample(0, 0, true), video_sample(100, 100, false)];
        let result = trim(&samples, boxes, Video, timescale, 0, 200).unwrap();
        assert!(result.samples.is_empty());
        assert!(result.edit_boxes.is_empty());
    }

    #[test]
    fn zero_duration_is_invalid_arguments() {
        let samples = vec![video_sample(0, 0, true)];
        let err = trim(&samples, Vec::new(), Video, 1000, 0, 0).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArguments(_)));
    }

    #[test]
    fn start_beyond_track_duration_yields_empty_output() {
        let timescale = 1000;
        let samples = vec![video_sample(0, 0, true), video_sample(100, 100, false)];
        let result = trim(&samples, Vec::new(), Video, timescale, 10_000, 100).unwrap();
        assert!(result.samples.is_empty());
    }

    #[test]
    fn duration_exceeding_track_clamps_to_tail() {
        let timescale = 1000;
        let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100, i * 100, i == 0)).collect();
        let result = trim(&samples, Vec::new(), Video, timescale, 0, 100_000).unwrap();
        // clamps to the track's inherent duration rather than erroring
        assert_eq!(result.samples.len(), samples.len());
    }

    #[test]
    fn idempotent_trim_to_full_duration_preserves_sample_count() {
        let timescale = 1000;
        let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100, i * 100, i == 0)).collect();
        let duration = calculate_duration(&samples).unwrap();
        let duration_ms = duration * 1000 / timescale as u64;
        let result = trim(&samples, Vec::new(), Video, timescale, 0, duration_ms).unwrap();
        assert_eq!(result.samples.len(), samples.len());
        assert_eq!(result.samples[0].dts, 0);
    }
}
