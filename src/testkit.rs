//! Minimal in-memory container implementation of [`crate::demux::DemuxedTrack`],
//! [`crate::demux::ByteStreamDecoder`] and [`crate::demux::Muxer`].
//!
//! Real ISOBMFF/byte-stream parsing is out of scope for this crate; this
//! module is the toy stand-in used by the test suite and by [`crate::main`]
//! so the engines have something concrete to run against. The wire format is
//! a flat JSON document (one object per track) serialized with `serde_json`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::demux::{ByteStreamDecoder, DemuxedTrack, Muxer};
use crate::editbox::EditBox;
use crate::error::Result;
use crate::sample::Sample;
use crate::settings::Settings;
use crate::track_view::TrackView;

/// One sample as it appears on the wire: no payload bytes, just a hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireSample {
    pts: i64,
    dts: i64,
    keyframe: bool,
    payload: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireTrack {
    settings: Settings,
    edit_boxes: Vec<EditBox>,
    samples: Vec<WireSample>,
}

/// A whole in-memory movie: an optional audio track and exactly one video
/// track, each independently edit-boxed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMovie {
    video: WireTrack,
    audio: Option<WireTrack>,
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(error!(Invalid, "hex payload has odd length"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| error!(Invalid, "invalid hex payload: {}", e)))
        .collect()
}

/// A fully materialized in-memory track. Implements [`DemuxedTrack`]
/// directly since every sample is already resident.
pub struct MemoryTrack {
    settings: Settings,
    edit_boxes: Vec<EditBox>,
    samples: Vec<Sample>,
}

impl MemoryTrack {
    pub fn new(settings: Settings, edit_boxes: Vec<EditBox>, samples: Vec<Sample>) -> MemoryTrack {
        MemoryTrack { settings, edit_boxes, samples }
    }

    fn from_wire(wire: WireTrack) -> Result<MemoryTrack> {
        let sample_type = match &wire.settings {
            Settings::Video(_) => crate::types::SampleType::Video,
            Settings::Audio(_) => crate::types::SampleType::Audio,
            Settings::Caption(_) => crate::types::SampleType::Caption,
        };
        let samples = wire
            .samples
            .into_iter()
            .map(|s| {
                let payload = Arc::new(hex_decode(&s.payload)?);
                Ok(Sample::new(s.pts, s.dts, s.keyframe, sample_type, Arc::new(move || (*payload).clone())))
            })
            .collect::<Result<Vec<Sample>>>()?;
        Ok(MemoryTrack { settings: wire.settings, edit_boxes: wire.edit_boxes, samples })
    }

    fn to_wire(&self) -> WireTrack {
        WireTrack {
            settings: self.settings.clone(),
            edit_boxes: self.edit_boxes.clone(),
            samples: self.samples.iter().map(|s| WireSample { pts: s.pts, dts: s.dts, keyframe: s.keyframe, payload: hex_encode(&(s.payload)()) }).collect(),
        }
    }

    pub fn view(self: Arc<Self>) -> TrackView {
        TrackView::new(self)
    }
}

impl DemuxedTrack for MemoryTrack {
    fn settings(&self) -> Settings {
        self.settings.clone()
    }
    fn count(&self) -> u32 {
        self.samples.len() as u32
    }
    fn duration(&self) -> u64 {
        if self.samples.is_empty() {
            0
        } else {
            crate::trim::calculate_duration(&self.samples).unwrap_or(0)
        }
    }
    fn edit_boxes(&self) -> Vec<EditBox> {
        self.edit_boxes.clone()
    }
    fn sample(&self, index: u32) -> Result<Sample> {
        self.samples
            .get(index as usize)
            .cloned()
            .ok_or_else(|| error!(OutOfRange, "index {} out of range [0, {})", index, self.samples.len()))
    }
}

/// Parse a [`WireMovie`] JSON document into `(video, audio)` tracks.
pub fn load(json: &str) -> Result<(Arc<MemoryTrack>, Option<Arc<MemoryTrack>>)> {
    let wire: WireMovie = serde_json::from_str(json).map_err(|e| error!(Invalid, "malformed movie document: {}", e))?;
    let video = Arc::new(MemoryTrack::from_wire(wire.video)?);
    let audio = wire.audio.map(MemoryTrack::from_wire).transpose()?.map(Arc::new);
    Ok((video, audio))
}

/// Serialize a `(video, audio, edit_boxes)` triple back to a [`WireMovie`]
/// JSON document, splitting `edit_boxes` by sample type as
/// [`Muxer::write`] receives them combined.
pub struct MemoryMuxer {
    pub document: Option<String>,
}

impl MemoryMuxer {
    pub fn new() -> MemoryMuxer {
        MemoryMuxer { document: None }
    }
}

impl Default for MemoryMuxer {
    fn default() -> MemoryMuxer {
        MemoryMuxer::new()
    }
}

impl Muxer for MemoryMuxer {
    fn write(&mut self, audio: &TrackView, video: &TrackView, edit_boxes: &[EditBox]) -> Result<()> {
        let video_boxes: Vec<EditBox> = edit_boxes.iter().filter(|b| b.sample_type == crate::types::SampleType::Video).copied().collect();
        let audio_boxes: Vec<EditBox> = edit_boxes.iter().filter(|b| b.sample_type == crate::types::SampleType::Audio).copied().collect();

        let video_samples = video.vectorize()?;
        let video_track = MemoryTrack::new(video.settings(), video_boxes, video_samples);

        let audio_track = if audio.count() > 0 {
            let audio_samples = audio.vectorize()?;
            Some(MemoryTrack::new(audio.settings(), audio_boxes, audio_samples))
        } else {
            None
        };

        let wire = WireMovie { video: video_track.to_wire(), audio: audio_track.map(|t| t.to_wire()) };
        self.document = Some(serde_json::to_string_pretty(&wire).map_err(|e| error!(Invalid, "failed to serialize movie: {}", e))?);
        Ok(())
    }
}

/// A decoder over an already-decoded sequence of frames, standing in for a
/// real hardware/software H.264 decoder for tests and the CLI's mux command.
pub struct MemoryByteStreamDecoder {
    sps_pps: Vec<u8>,
    frames: Vec<(bool, Vec<u8>)>,
}

impl MemoryByteStreamDecoder {
    pub fn new(sps_pps: Vec<u8>, frames: Vec<(bool, Vec<u8>)>) -> MemoryByteStreamDecoder {
        MemoryByteStreamDecoder { sps_pps, frames }
    }
}

impl ByteStreamDecoder for MemoryByteStreamDecoder {
    fn count(&self) -> u32 {
        self.frames.len() as u32
    }
    fn sps_pps(&self) -> Vec<u8> {
        self.sps_pps.clone()
    }
    fn frame(&self, index: u32) -> Result<(bool, Vec<u8>)> {
        self.frames
            .get(index as usize)
            .cloned()
            .ok_or_else(|| error!(OutOfRange, "frame index {} out of range [0, {})", index, self.frames.len()))
    }
}
