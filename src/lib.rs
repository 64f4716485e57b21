//! Sample-level editing engine for edited-container video tracks.
//!
//! This crate is the part of a video-container toolchain that reasons about
//! presentation/decode timestamps, keyframe-aligned GOP boundaries and
//! edit-box semantics. It does not parse or write any container bit format:
//! callers hand it [`TrackView`](crate::track_view::TrackView)s backed by
//! their own demuxer (see [`demux`]) and get back new track views to feed to
//! their own muxer.
//!
//! Three operations make up the public surface:
//!
//! - [`trim::trim`] extracts a `[start_ms, start_ms + duration_ms)` window
//!   from one track, realigned to a keyframe.
//! - [`stitch::stitch`] concatenates compatible audio+video tracks end to end.
//! - [`mux::mux`] replaces a track's video samples with an externally decoded
//!   byte-stream while preserving audio and edit boxes.
//!
//! [`editbox`] underlies both Trim and Stitch: it is the arithmetic of
//! mapping a container-timeline pts to a playback-timeline pts through a list
//! of edit boxes, including the empty edit box used for track-start delay.
#[macro_use]
mod error;

pub mod demux;
pub mod editbox;
pub mod frame_intervals;
pub mod mux;
pub mod reader;
pub mod sample;
pub mod settings;
pub mod stitch;
pub mod testkit;
pub mod trim;
pub mod track_view;
pub mod types;

pub use crate::editbox::EditBox;
pub use crate::error::{Error, Result};
pub use crate::sample::{ByteRange, Sample};
pub use crate::track_view::TrackView;
pub use crate::types::SampleType;
