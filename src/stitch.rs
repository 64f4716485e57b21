//! Concatenate N video (+ optional audio, + optional edit boxes) tracks
//! end-to-end into one video track and one audio track.
//!
//! A [`StitchInput`] is one clip's worth of already-vectorized samples plus
//! settings; [`stitch`] walks the inputs in order, rebasing every sample and
//! edit box onto the growing output timeline.

use crate::editbox::EditBox;
use crate::error::Result;
use crate::sample::Sample;
use crate::settings::{AudioSettings, Settings, VideoSettings};
use crate::types::{round_divide, round_divide_i64, SampleType};

/// One clip to be appended, already vectorized out of its [`crate::TrackView`]s.
pub struct StitchInput {
    pub video_settings: VideoSettings,
    pub video_samples: Vec<Sample>,
    pub audio_settings: Option<AudioSettings>,
    pub audio_samples: Vec<Sample>,
    pub edit_boxes: Vec<EditBox>,
}

/// The concatenated result: two flat sample vectors plus their edit boxes,
/// ready to be wrapped in [`crate::TrackView`]s over an in-memory track.
pub struct Stitched {
    pub video_settings: VideoSettings,
    pub video_samples: Vec<Sample>,
    pub video_edit_boxes: Vec<EditBox>,
    pub video_duration: u64,
    pub audio_settings: Option<AudioSettings>,
    pub audio_samples: Vec<Sample>,
    pub audio_edit_boxes: Vec<EditBox>,
    pub audio_duration: u64,
}

fn adjust_sample_timescale(sample: &Sample, new_timescale: u32, org_timescale: u32) -> Sample {
    if new_timescale == org_timescale {
        return sample.clone();
    }
    let mut out = sample.clone();
    out.pts = round_divide(sample.pts as u64, new_timescale as u64, org_timescale as u64) as i64;
    out.dts = round_divide(sample.dts as u64, new_timescale as u64, org_timescale as u64) as i64;
    out
}

fn adjust_editbox_timescale(b: &EditBox, new_timescale: u32, org_timescale: u32) -> EditBox {
    if new_timescale == org_timescale {
        return *b;
    }
    EditBox {
        start_pts: if b.is_empty() { b.start_pts } else { round_divide(b.start_pts as u64, new_timescale as u64, org_timescale as u64) as i64 },
        duration_pts: round_divide(b.duration_pts, new_timescale as u64, org_timescale as u64),
        rate: b.rate,
        sample_type: b.sample_type,
    }
}

/// Append `in_samples` shifted by `offset` into `out_samples`, dropping any
/// sample that would land before time zero (only expected for a leading
/// audio sample that starts earlier than its paired video sample).
fn shift_and_append_samples(in_samples: &[Sample], out_samples: &mut Vec<Sample>, offset: i64) {
    for sample in in_samples {
        if offset < 0 && -offset > sample.pts && -offset > sample.dts {
            debug_assert_eq!(sample.sample_type, SampleType::Audio);
            continue;
        }
        out_samples.push(sample.shift(offset));
    }
}

fn shift_and_append_editboxes(in_boxes: &[EditBox], out_boxes: &mut Vec<EditBox>, offset: i64) {
    for b in in_boxes {
        out_boxes.push(b.shift(offset));
    }
}

/// Reverse-scan from the last sample, keeping only samples whose pts *and*
/// dts are strictly less than the sample already kept; drops stale audio
/// overhang left behind at a splice point.
pub fn remove_overlapping_samples(samples: &[Sample]) -> Vec<Sample> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut filtered = Vec::new();
    let mut last = samples.last().unwrap().clone();
    filtered.push(last.clone());
    for sample in samples.iter().rev() {
        if sample.pts < last.pts && sample.dts < last.dts {
            filtered.push(sample.clone());
            last = sample.clone();
        }
    }
    filtered.reverse();
    filtered
}

fn filter_by_sample_type(boxes: &[EditBox], sample_type: SampleType) -> Vec<EditBox> {
    boxes.iter().filter(|b| b.sample_type == sample_type).copied().collect()
}

/// Concatenate `inputs` in order. At least one input is required; audio and
/// edit boxes are optional per-input but must be present in either none or
/// all inputs.
pub fn stitch(inputs: &[StitchInput]) -> Result<Stitched> {
    if inputs.is_empty() {
        return Err(error!(InvalidArguments, "at least one input is required"));
    }

    let video_settings = inputs[0].video_settings.clone();
    let input_has_audio = inputs.iter().any(|i| i.audio_settings.is_some() && !i.audio_samples.is_empty());
    let audio_settings = if input_has_audio { inputs[0].audio_settings.clone() } else { None };
    let input_has_edit_boxes = inputs.iter().any(|i| !i.edit_boxes.is_empty());

    let mut out_video_samples = Vec::new();
    let mut out_video_boxes = Vec::new();
    let mut video_duration: u64 = 0;
    let mut out_audio_samples = Vec::new();
    let mut out_audio_boxes = Vec::new();
    let mut audio_duration: u64 = 0;

    for (i, input) in inputs.iter().enumerate() {
        if !input.video_settings.compatible_with(&video_settings) {
            return Err(error!(SettingsMismatch, "video settings of input {} do not match", i));
        }
        if input.video_samples.is_empty() {
            return Err(error!(InvalidArguments, "every video track must contain data"));
        }
        let video_samples: Vec<Sample> = input
            .video_samples
            .iter()
            .map(|s| adjust_sample_timescale(s, video_settings.timescale, input.video_settings.timescale))
            .collect();

        let mut audio_samples = Vec::new();
        if input_has_audio {
            let audio_settings = audio_settings.as_ref().expect("input_has_audio implies Some");
            let input_audio_settings = input
                .audio_settings
                .as_ref()
                .ok_or_else(|| error!(NoTrack, "input {} is missing an audio track", i))?;
            if !input_audio_settings.compatible_with(audio_settings) {
                return Err(error!(SettingsMismatch, "audio settings of input {} do not match", i));
            }
            if input.audio_samples.is_empty() {
                return Err(error!(InvalidArguments, "every audio track must contain data"));
            }
            audio_samples = input.audio_samples.clone();
        }

        let mut video_edit_boxes = Vec::new();
        let mut audio_edit_boxes = Vec::new();
        if input_has_edit_boxes {
            video_edit_boxes = filter_by_sample_type(&input.edit_boxes, SampleType::Video);
            if !crate::editbox::valid(&video_edit_boxes) {
                return Err(error!(Invalid, "video edit boxes of input {} are invalid", i));
            }
            if !video_edit_boxes.is_empty() && i != 0 && video_edit_boxes[0].is_empty() {
                return Err(error!(InvalidArguments, "only the first clip may carry a leading empty edit box"));
            }
            video_edit_boxes = video_edit_boxes
                .iter()
                .map(|b| adjust_editbox_timescale(b, video_settings.timescale, input.video_settings.timescale))
                .collect();

            audio_edit_boxes = filter_by_sample_type(&input.edit_boxes, SampleType::Audio);
            if !crate::editbox::valid(&audio_edit_boxes) {
                return Err(error!(Invalid, "audio edit boxes of input {} are invalid", i));
            }
            if !audio_edit_boxes.is_empty() && i != 0 && audio_edit_boxes[0].is_empty() {
                return Err(error!(InvalidArguments, "only the first clip may carry a leading empty edit box"));
            }
        }

        let clip_video_duration = crate::trim::calculate_duration(&video_samples)?;
        if clip_video_duration == 0 && video_samples.len() == 1 {
            return Err(error!(Unsupported, "single-frame video inputs are not supported"));
        }

        let first_video_sample = video_samples[0].clone();
        let video_offset = video_duration as i64 - first_video_sample.dts;
        shift_and_append_samples(&video_samples, &mut out_video_samples, video_offset);
        if input_has_edit_boxes {
            if !video_edit_boxes.is_empty() {
                shift_and_append_editboxes(&video_edit_boxes, &mut out_video_boxes, video_offset);
            } else {
                out_video_boxes.push(EditBox::new(
                    first_video_sample.dts + video_offset,
                    clip_video_duration,
                    1.0,
                    SampleType::Video,
                ));
            }
        }
        video_duration += clip_video_duration;

        if input_has_audio {
            let audio_settings = audio_settings.as_ref().expect("input_has_audio implies Some");
            let clip_audio_duration = if !audio_edit_boxes.is_empty() {
                crate::trim::calculate_duration(&audio_samples)?
            } else if !video_edit_boxes.is_empty() {
                let edit_box_duration: u64 = video_edit_boxes.iter().map(|b| b.duration_pts).sum();
                round_divide(edit_box_duration, audio_settings.timescale as u64, video_settings.timescale as u64)
            } else {
                round_divide(clip_video_duration, audio_settings.timescale as u64, video_settings.timescale as u64)
            };

            let first_audio_sample = audio_samples[0].clone();
            if first_video_sample.dts < 0 {
                return Err(error!(Unsupported, "negative video dts is not supported"));
            }
            let video_dts_in_audio_scale =
                round_divide_i64(first_video_sample.dts, audio_settings.timescale, video_settings.timescale);
            let audio_video_gap = first_audio_sample.dts - video_dts_in_audio_scale;
            let audio_offset = audio_duration as i64 - first_audio_sample.dts + audio_video_gap;
            shift_and_append_samples(&audio_samples, &mut out_audio_samples, audio_offset);
            if input_has_edit_boxes {
                if !audio_edit_boxes.is_empty() {
                    shift_and_append_editboxes(&audio_edit_boxes, &mut out_audio_boxes, audio_offset);
                } else {
                    out_audio_boxes.push(EditBox::new(
                        first_audio_sample.dts + audio_offset,
                        clip_audio_duration,
                        1.0,
                        SampleType::Audio,
                    ));
                }
            }
            audio_duration += clip_audio_duration;
        }
    }

    let pre_overlap_count = out_audio_samples.len();
    out_audio_samples = remove_overlapping_samples(&out_audio_samples);
    if out_audio_samples.len() != pre_overlap_count {
        log::debug!(
            "stitch: dropped {} overlapping audio sample(s) at splice boundaries",
            pre_overlap_count - out_audio_samples.len()
        );
    }

    Ok(Stitched {
        video_settings,
        video_samples: out_video_samples,
        video_edit_boxes: out_video_boxes,
        video_duration,
        audio_settings,
        audio_samples: out_audio_samples,
        audio_edit_boxes: out_audio_boxes,
        audio_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn video_settings() -> VideoSettings {
        VideoSettings {
            codec: "h264".into(),
            width: 1920,
            height: 1080,
            timescale: 90000,
            orientation: crate::settings::Orientation::Landscape,
            sps_pps: vec![],
        }
    }

    fn audio_settings() -> AudioSettings {
        AudioSettings { codec: "aac".into(), timescale: 48000, sample_rate: 48000, channels: 2 }
    }

    fn video_track(n: i64, frame: i64) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(i * frame, i * frame, i == 0, SampleType::Video, Arc::new(|| Vec::new()))).collect()
    }

    fn audio_track(n: i64, frame: i64) -> Vec<Sample> {
        (0..n).map(|i| Sample::audio(i * frame, i * frame, Arc::new(|| Vec::new()))).collect()
    }

    fn audio_track_starting_at(n: i64, frame: i64, start: i64) -> Vec<Sample> {
        (0..n).map(|i| Sample::audio(start + i * frame, start + i * frame, Arc::new(|| Vec::new()))).collect()
    }

    #[test]
    fn stitches_two_video_only_clips_back_to_back() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let clip_duration = crate::trim::calculate_duration(&video_track(10, 3000)).unwrap();
        let result = stitch(&[input_a, input_b]).unwrap();
        assert_eq!(result.video_samples.len(), 20);
        assert_eq!(result.video_samples[0].dts, 0);
        // second clip's first sample picks up exactly where the first left off
        assert_eq!(result.video_samples[10].dts, result.video_samples[9].dts + 3000);
        assert_eq!(result.video_duration, 2 * clip_duration);
    }

    #[test]
    fn stitching_a_single_input_is_a_no_op() {
        let samples = video_track(10, 3000);
        let input = StitchInput {
            video_settings: video_settings(),
            video_samples: samples.clone(),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let result = stitch(&[input]).unwrap();
        assert_eq!(result.video_samples.len(), samples.len());
        for (out, original) in result.video_samples.iter().zip(samples.iter()) {
            assert_eq!(out.pts, original.pts);
            assert_eq!(out.dts, original.dts);
            assert_eq!(out.keyframe, original.keyframe);
        }
    }

    #[test]
    fn rejects_empty_input_list() {
        let err = stitch(&[]).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArguments(_)));
    }

    #[test]
    fn rejects_incompatible_video_dimensions() {
        let mut mismatched = video_settings();
        mismatched.width = 1280;
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(5, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let input_b = StitchInput {
            video_settings: mismatched,
            video_samples: video_track(5, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let err = stitch(&[input_a, input_b]).unwrap_err();
        assert!(matches!(err, crate::Error::SettingsMismatch(_)));
    }

    #[test]
    fn rejects_single_frame_clip() {
        let input = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(1, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let err = stitch(&[input]).unwrap_err();
        assert!(matches!(err, crate::Error::Unsupported(_)));
    }

    #[test]
    fn audio_tracks_concatenate_alongside_video() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track(20, 1024),
            edit_boxes: Vec::new(),
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track(20, 1024),
            edit_boxes: Vec::new(),
        };
        let result = stitch(&[input_a, input_b]).unwrap();
        assert!(!result.audio_samples.is_empty());
        assert!(result.audio_samples.windows(2).all(|w| w[0].dts < w[1].dts));
        assert!(result.audio_samples.windows(2).all(|w| w[0].pts < w[1].pts));
    }

    /// Clip A has first audio dts=1024, first video dts=0 (gap 1024); clip B
    /// is appended verbatim with its own gap of 2048. At the B splice,
    /// `audio_video_gap` must reflect B's own offset, not A's.
    #[test]
    fn stitch_preserves_each_clips_own_audio_video_gap() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track_starting_at(5, 1024, 1024),
            edit_boxes: Vec::new(),
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track_starting_at(5, 1024, 2048),
            edit_boxes: Vec::new(),
        };
        let result = stitch(&[input_a, input_b]).unwrap();

        // clip B's video picks up exactly where clip A's video ends.
        let video_b_first_dts = result.video_samples[10].dts;
        assert_eq!(video_b_first_dts, 30000);

        // clip B's audio samples were not dropped as overlap (they land well
        // after clip A's last audio sample) and its first one sits at
        // audio_duration_after_a + its own 2048 gap, not clip A's 1024 gap.
        let audio_b_first_dts = result.audio_samples[5].dts;
        assert_eq!(audio_b_first_dts, 18048);

        let video_ts = video_settings().timescale as i64;
        let audio_ts = audio_settings().timescale as i64;
        let video_b_dts_in_audio_scale = round_divide_i64(video_b_first_dts, audio_ts as u32, video_ts as u32);
        let preserved_gap = audio_b_first_dts - video_b_dts_in_audio_scale;
        assert_eq!(preserved_gap, 2048);
    }

    #[test]
    fn remove_overlapping_samples_drops_trailing_overhang() {
        // index 1 is a stale overhang sample from a prior clip whose splice
        // left it reaching past the next clip's first sample (index 2).
        let samples = vec![
            Sample::audio(0, 0, Arc::new(|| Vec::new())),
            Sample::audio(1000, 1000, Arc::new(|| Vec::new())),
            Sample::audio(900, 900, Arc::new(|| Vec::new())),
        ];
        let filtered = remove_overlapping_samples(&samples);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].dts, 0);
        assert_eq!(filtered[1].dts, 900);
    }

    #[test]
    fn rejects_leading_empty_edit_box_on_non_first_input() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video)],
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: vec![EditBox::empty(1000, SampleType::Video), EditBox::new(0, 30000, 1.0, SampleType::Video)],
        };
        let err = stitch(&[input_a, input_b]).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArguments(_)));
    }

    /// Per-input edit boxes are shifted onto the growing output timeline the
    /// same way bare samples are: the second clip's box starts where the
    /// first clip's video duration ends.
    #[test]
    fn stitch_shifts_supplied_edit_boxes_across_the_splice() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video)],
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video)],
        };
        let result = stitch(&[input_a, input_b]).unwrap();
        assert_eq!(result.video_edit_boxes.len(), 2);
        assert_eq!(result.video_edit_boxes[0], EditBox::new(0, 30000, 1.0, SampleType::Video));
        assert_eq!(result.video_edit_boxes[1].start_pts, 30000);
        assert_eq!(result.video_edit_boxes[1].duration_pts, 30000);
    }

    /// When one input supplies edit boxes but a sibling does not, the
    /// sibling gets a synthesized box covering its raw (not edit-trimmed)
    /// sample span.
    #[test]
    fn stitch_synthesizes_a_missing_edit_box_from_the_raw_span() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video)],
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: None,
            audio_samples: Vec::new(),
            edit_boxes: Vec::new(),
        };
        let clip_duration = crate::trim::calculate_duration(&video_track(10, 3000)).unwrap();
        let result = stitch(&[input_a, input_b]).unwrap();
        assert_eq!(result.video_edit_boxes.len(), 2);
        assert_eq!(result.video_edit_boxes[1].start_pts, 30000);
        assert_eq!(result.video_edit_boxes[1].duration_pts, clip_duration);
    }

    /// Audio edit boxes follow the same all-or-nothing shifting, keyed off
    /// audio timescale rather than video.
    #[test]
    fn stitch_carries_audio_edit_boxes_alongside_video_ones() {
        let input_a = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track(20, 1024),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video), EditBox::new(0, 20480, 1.0, SampleType::Audio)],
        };
        let input_b = StitchInput {
            video_settings: video_settings(),
            video_samples: video_track(10, 3000),
            audio_settings: Some(audio_settings()),
            audio_samples: audio_track(20, 1024),
            edit_boxes: vec![EditBox::new(0, 30000, 1.0, SampleType::Video), EditBox::new(0, 20480, 1.0, SampleType::Audio)],
        };
        let result = stitch(&[input_a, input_b]).unwrap();
        assert_eq!(result.audio_edit_boxes.len(), 2);
        assert_eq!(result.audio_edit_boxes[0].sample_type, SampleType::Audio);
        assert!(result.audio_edit_boxes[1].start_pts > result.audio_edit_boxes[0].start_pts);
    }
}
