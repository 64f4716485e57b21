//! Map a video track's edit boxes onto `[start_index, num_frames)` sample
//! ranges, for callers (e.g. a hardware decoder front-end) that need to know
//! which samples actually play without walking edit-box arithmetic themselves.

use crate::error::Result;
use crate::track_view::TrackView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInterval {
    pub start_index: u32,
    pub num_frames: u32,
}

/// One interval per non-empty edit box, in edit-box order. An empty track
/// yields a single zero-length interval; a track with no edit boxes yields a
/// single interval covering every sample.
pub fn frame_intervals(track: &TrackView) -> Result<Vec<FrameInterval>> {
    if track.count() == 0 {
        return Ok(vec![FrameInterval { start_index: 0, num_frames: 0 }]);
    }
    let edit_boxes = track.edit_boxes();
    if edit_boxes.is_empty() {
        return Ok(vec![FrameInterval { start_index: 0, num_frames: track.count() }]);
    }

    let samples = track.vectorize()?;
    let mut intervals = Vec::new();
    for edit_box in &edit_boxes {
        if edit_box.is_empty() {
            continue;
        }
        let start_pts = edit_box.start_pts;
        let end_pts = edit_box.end_pts();
        let mut start_index: i64 = -1;
        let mut end_index: i64 = -1;
        for (index, sample) in samples.iter().enumerate() {
            let index = index as i64;
            if start_index < 0 && sample.pts >= start_pts {
                start_index = index;
            }
            if sample.pts < end_pts {
                end_index = index;
            }
        }
        if start_index < 0 || end_index < start_index {
            return Err(error!(Invalid, "edit box [{}, {}) matches no samples", start_pts, end_pts));
        }
        intervals.push(FrameInterval { start_index: start_index as u32, num_frames: (end_index - start_index + 1) as u32 });
    }
    Ok(intervals)
}
