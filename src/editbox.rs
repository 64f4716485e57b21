//! Edit-box arithmetic: validating edit-box lists and mapping a
//! container-timeline pts to the pts a player would actually show.
//!
//! An edit box is a container-level directive `{start_pts, duration_pts,
//! rate, type}` describing a `[start_pts, start_pts+duration_pts)` half-open
//! interval of the container timeline that plays back-to-back with its
//! neighbors. `start_pts == EMPTY_EDIT_BOX` is the sentinel for an *empty*
//! edit box: a playback-start delay during which nothing plays.

use crate::types::SampleType;

/// Sentinel `start_pts` denoting an empty (track-start-delay) edit box.
pub const EMPTY_EDIT_BOX: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditBox {
    pub start_pts: i64,
    pub duration_pts: u64,
    pub rate: f32,
    pub sample_type: SampleType,
}

impl EditBox {
    pub fn new(start_pts: i64, duration_pts: u64, rate: f32, sample_type: SampleType) -> EditBox {
        EditBox { start_pts, duration_pts, rate, sample_type }
    }

    pub fn empty(duration_pts: u64, sample_type: SampleType) -> EditBox {
        EditBox { start_pts: EMPTY_EDIT_BOX, duration_pts, rate: 1.0, sample_type }
    }

    pub fn is_empty(&self) -> bool {
        self.start_pts == EMPTY_EDIT_BOX
    }

    /// `start_pts += offset`; a no-op on an empty box besides its duration,
    /// which is preserved (an empty box carries no start position to shift).
    pub fn shift(&self, offset: i64) -> EditBox {
        EditBox {
            start_pts: if self.is_empty() { self.start_pts } else { self.start_pts.saturating_add(offset) },
            duration_pts: self.duration_pts,
            rate: self.rate,
            sample_type: self.sample_type,
        }
    }

    /// `[start_pts, start_pts + duration_pts)`, only meaningful when not empty.
    pub fn end_pts(&self) -> i64 {
        self.start_pts.saturating_add(self.duration_pts as i64)
    }
}

/// Validate an edit-box list's invariants:
/// 1. At most one empty edit box, and if present it is first.
/// 2. All non-empty boxes share the same `type`.
/// 3. Non-empty boxes are ascending and non-overlapping.
/// 4. An empty list means "no editing".
pub fn valid(boxes: &[EditBox]) -> bool {
    let mut seen_empty = false;
    let mut sample_type: Option<SampleType> = None;
    let mut prev_end: Option<i64> = None;
    for (i, b) in boxes.iter().enumerate() {
        if b.is_empty() {
            if i != 0 || seen_empty {
                return false;
            }
            seen_empty = true;
            continue;
        }
        match sample_type {
            None => sample_type = Some(b.sample_type),
            Some(t) if t != b.sample_type => return false,
            _ => {}
        }
        if let Some(prev_end) = prev_end {
            if b.start_pts < prev_end {
                return false;
            }
        }
        prev_end = Some(b.end_pts());
    }
    true
}

/// Map a container pts to its playback pts, or `-1` if the sample at
/// `container_pts` is not visible. Returns `container_pts` unchanged when
/// `boxes` is empty (no editing).
pub fn real_pts(boxes: &[EditBox], container_pts: i64) -> i64 {
    if boxes.is_empty() {
        return container_pts;
    }
    let mut output_offset: i64 = 0;
    for b in boxes {
        if b.is_empty() {
            output_offset = output_offset.saturating_add(b.duration_pts as i64);
            continue;
        }
        if container_pts >= b.start_pts && container_pts < b.end_pts() {
            let within = container_pts - b.start_pts;
            return output_offset.saturating_add(within);
        }
        output_offset = output_offset.saturating_add(b.duration_pts as i64);
    }
    EMPTY_EDIT_BOX
}

/// `real_pts(boxes, container_pts) != -1`. Always `true` for an empty list.
pub fn plays(boxes: &[EditBox], container_pts: i64) -> bool {
    real_pts(boxes, container_pts) != EMPTY_EDIT_BOX
}
