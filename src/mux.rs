//! Replace a video track's samples with externally-decoded H.264 frames
//! while keeping audio and edit boxes aligned to the new, possibly
//! frame-decimated, video timeline.

use std::sync::Arc;

use crate::demux::ByteStreamDecoder;
use crate::editbox::{self, EditBox};
use crate::error::Result;
use crate::sample::Sample;
use crate::settings::{AudioSettings, Orientation, VideoSettings};
use crate::track_view::TrackView;
use crate::types::{ceil_divide, SampleType};

pub struct Muxed {
    pub video_settings: VideoSettings,
    pub video_samples: Vec<Sample>,
    pub audio_settings: Option<AudioSettings>,
    pub audio_samples: Vec<Sample>,
    pub edit_boxes: Vec<EditBox>,
}

/// Replace `video`'s samples with frames from `decoder`, keeping every
/// `fps_factor`-th decoded pts (decimation) and carrying `audio` along,
/// realigned to the new first video pts. `output_dimensions` overrides the
/// width/height carried in the output settings; `None` keeps the original.
pub fn mux(
    video: &TrackView,
    audio: Option<&TrackView>,
    decoder: &dyn ByteStreamDecoder,
    fps_factor: u32,
    output_dimensions: Option<(u16, u16)>,
) -> Result<Muxed> {
    if decoder.count() == 0 {
        return Err(error!(Invalid, "byte-stream decoder produced no frames"));
    }
    if fps_factor == 0 {
        return Err(error!(InvalidArguments, "fps_factor must be nonzero"));
    }

    let video_settings = match video.settings() {
        crate::settings::Settings::Video(s) => s,
        _ => return Err(error!(NoTrack, "mux requires a video track")),
    };

    // every pts the edit boxes actually let play, in presentation order
    let mut valid_pts: Vec<u64> = Vec::new();
    for sample in video.iter() {
        let sample = sample?;
        let new_pts = editbox::real_pts(&video.edit_boxes(), sample.pts);
        if new_pts != editbox::EMPTY_EDIT_BOX {
            valid_pts.push(new_pts as u64);
        }
    }
    valid_pts.sort_unstable();
    if valid_pts.is_empty() {
        return Err(error!(Invalid, "video track has no playable samples"));
    }

    let num_frames = ceil_divide(valid_pts.len() as u64, fps_factor as u64);
    if num_frames != decoder.count() as u64 {
        return Err(error!(Invalid, "decoder frame count {} does not match expected {}", decoder.count(), num_frames));
    }

    let video_first_pts = valid_pts[0] as i64;

    let (audio_settings, audio_timescale, audio_edit_boxes) = match audio {
        Some(a) => match a.settings() {
            crate::settings::Settings::Audio(s) => (Some(s.clone()), s.timescale, a.edit_boxes()),
            _ => return Err(error!(NoTrack, "audio argument must be an audio track")),
        },
        None => (None, 0, Vec::new()),
    };

    let audio_pts_offset = if audio.is_some() { video_first_pts * audio_timescale as i64 / video_settings.timescale as i64 } else { 0 };

    let mut video_samples = Vec::with_capacity(decoder.count() as usize);
    let mut audio_samples = Vec::new();
    let mut video_sample_index: usize = 0;
    let mut audio_sample_index: u32 = 0;
    let mut audio_first_dts: Option<i64> = None;

    for frame_index in 0..decoder.count() {
        let (keyframe, payload) = decoder.frame(frame_index)?;
        let pts = valid_pts[video_sample_index] as i64 - video_first_pts;
        let payload = Arc::new(payload);
        video_samples.push(Sample::new(pts, pts, keyframe, SampleType::Video, Arc::new(move || (*payload).clone())));
        let v_dts = pts as f64 / video_settings.timescale as f64;

        if let Some(audio) = audio {
            while audio_sample_index < audio.count() {
                let a_sample = audio.sample(audio_sample_index)?;
                let a_dts = a_sample.dts as f64 / audio_timescale as f64;
                if a_dts < v_dts {
                    if a_sample.dts >= audio_pts_offset {
                        let first_dts = *audio_first_dts.get_or_insert(a_sample.dts);
                        audio_samples.push(a_sample.shift(-first_dts));
                    }
                    audio_sample_index += 1;
                } else {
                    break;
                }
            }
        }

        video_sample_index += fps_factor as usize;
        if video_sample_index >= valid_pts.len() && frame_index + 1 < decoder.count() {
            return Err(error!(Invalid, "decoder produced more frames than decimated video samples"));
        }
    }

    let mut edit_boxes = Vec::new();
    if let Some(first_dts) = audio_first_dts {
        for (i, edit_box) in audio_edit_boxes.iter().enumerate() {
            if i == 0 {
                let start_pts = edit_box.start_pts + audio_pts_offset - first_dts;
                let duration_pts = (edit_box.duration_pts as i64 - audio_pts_offset)
                    .try_into()
                    .map_err(|_| error!(Overflow, "audio edit box duration underflowed after mux realignment"))?;
                edit_boxes.push(EditBox::new(start_pts, duration_pts, edit_box.rate, SampleType::Audio));
            } else {
                edit_boxes.push(EditBox::new(edit_box.start_pts - first_dts, edit_box.duration_pts, edit_box.rate, SampleType::Audio));
            }
        }
    }

    let output_settings = VideoSettings {
        codec: "h264".into(),
        width: output_dimensions.map(|(w, _)| w).unwrap_or(video_settings.width),
        height: output_dimensions.map(|(_, h)| h).unwrap_or(video_settings.height),
        timescale: video_settings.timescale,
        orientation: video_settings.orientation,
        sps_pps: decoder.sps_pps(),
    };

    Ok(Muxed { video_settings: output_settings, video_samples, audio_settings, audio_samples, edit_boxes })
}
