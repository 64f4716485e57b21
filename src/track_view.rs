//! Lazy, index-addressable sequence of samples with attached settings.
//!
//! Any [`crate::demux::DemuxedTrack`] can be wrapped in a `TrackView`,
//! sub-ranged, filtered and materialized without ever touching a sample's
//! payload.

use std::sync::Arc;

use crate::demux::DemuxedTrack;
use crate::error::{Error, Result};
use crate::sample::Sample;
use crate::settings::Settings;

/// A restartable, `[a, b)`-bounded view over a track's samples.
#[derive(Clone)]
pub struct TrackView {
    track: Arc<dyn DemuxedTrack>,
    a: u32,
    b: u32,
}

impl TrackView {
    /// Build a view over the whole track.
    pub fn new(track: Arc<dyn DemuxedTrack>) -> TrackView {
        let count = track.count();
        TrackView { track, a: 0, b: count }
    }

    /// Build a view over `[a, b)` of `track`; the caller is responsible for
    /// `a <= b <= track.count()`.
    pub fn with_bounds(track: Arc<dyn DemuxedTrack>, a: u32, b: u32) -> TrackView {
        TrackView { track, a, b }
    }

    pub fn settings(&self) -> Settings {
        self.track.settings()
    }

    pub fn count(&self) -> u32 {
        self.b - self.a
    }

    pub fn duration(&self) -> u64 {
        self.track.duration()
    }

    pub fn edit_boxes(&self) -> Vec<crate::EditBox> {
        self.track.edit_boxes()
    }

    /// Frames per second, for video tracks: `count * timescale / duration`.
    pub fn fps(&self) -> f64 {
        let duration = self.duration();
        if duration == 0 {
            return 0.0;
        }
        self.count() as f64 * self.settings().timescale() as f64 / duration as f64
    }

    /// Fetch the sample at absolute index `i`, which must lie in `[a, b)`.
    pub fn sample(&self, i: u32) -> Result<Sample> {
        if i < self.a || i >= self.b {
            return Err(error!(OutOfRange, "index {} out of range [{}, {})", i, self.a, self.b));
        }
        self.track.sample(i)
    }

    pub fn a(&self) -> u32 {
        self.a
    }

    pub fn b(&self) -> u32 {
        self.b
    }

    /// A lazy sub-view that skips samples for which `predicate` is false.
    pub fn filter<F>(&self, predicate: F) -> FilteredTrackView<F>
    where
        F: Fn(&Sample) -> bool,
    {
        FilteredTrackView { view: self.clone(), predicate }
    }

    /// Materialize every sample in `[a, b)` into a dense vector.
    pub fn vectorize(&self) -> Result<Vec<Sample>> {
        (self.a..self.b).map(|i| self.track.sample(i)).collect()
    }

    pub fn iter(&self) -> TrackViewIter<'_> {
        TrackViewIter { view: self, next: self.a }
    }
}

impl<'a> IntoIterator for &'a TrackView {
    type Item = Result<Sample>;
    type IntoIter = TrackViewIter<'a>;
    fn into_iter(self) -> TrackViewIter<'a> {
        self.iter()
    }
}

pub struct TrackViewIter<'a> {
    view: &'a TrackView,
    next: u32,
}

impl<'a> Iterator for TrackViewIter<'a> {
    type Item = Result<Sample>;
    fn next(&mut self) -> Option<Result<Sample>> {
        if self.next >= self.view.b {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some(self.view.track.sample(i))
    }
}

/// A lazy sub-view produced by [`TrackView::filter`].
pub struct FilteredTrackView<F> {
    view: TrackView,
    predicate: F,
}

impl<F> FilteredTrackView<F>
where
    F: Fn(&Sample) -> bool,
{
    pub fn vectorize(&self) -> Result<Vec<Sample>> {
        let mut out = Vec::new();
        for i in self.view.a..self.view.b {
            let sample = self.view.track.sample(i)?;
            if (self.predicate)(&sample) {
                out.push(sample);
            }
        }
        Ok(out)
    }
}

/// Walk `samples` with a sliding window of the most recent `K = 16`
/// pts/dts values, incrementing both fields by 1 whenever a duplicate is
/// seen, until they are unique. At most `M = 32` total increments are
/// permitted; exceeding the window size of distinct values tracked is
/// `Unsupported`, exceeding the increment budget is `Unsafe`.
///
/// A demuxed track may carry duplicate pts/dts values due to container
/// quirks; downstream engines rely on strictly monotone, unique dts.
pub fn enforce_unique_pts_dts(samples: &mut [Sample]) -> Result<()> {
    const MAX_LOOKBACK: usize = 16;
    const MAX_ADJUSTMENTS: u32 = 32;

    let mut recent_pts: Vec<i64> = Vec::with_capacity(MAX_LOOKBACK);
    let mut recent_dts: Vec<i64> = Vec::with_capacity(MAX_LOOKBACK);
    let mut adjustments = 0u32;

    for sample in samples.iter_mut() {
        let mut pts = sample.pts;
        let mut dts = sample.dts;
        while recent_pts.contains(&pts) || recent_dts.contains(&dts) {
            adjustments += 1;
            if adjustments > MAX_ADJUSTMENTS {
                return Err(error!(Unsafe, "unique pts/dts adjustment budget ({}) exceeded", MAX_ADJUSTMENTS));
            }
            log::debug!("enforce_unique_pts_dts: bumping pts/dts {} -> {} (adjustment {}/{})", pts, pts + 1, adjustments, MAX_ADJUSTMENTS);
            pts += 1;
            dts += 1;
        }
        if recent_pts.len() >= MAX_LOOKBACK {
            recent_pts.remove(0);
        }
        if recent_dts.len() >= MAX_LOOKBACK {
            recent_dts.remove(0);
        }
        recent_pts.push(pts);
        recent_dts.push(dts);
        sample.pts = pts;
        sample.dts = dts;
    }
    Ok(())
}

/// Accept `Error::Unsupported` from [`enforce_unique_pts_dts`] as a distinct
/// case for callers that want to report "track too degenerate to fix up"
/// separately from a hard failure; currently unreachable since the sliding
/// window never grows past its cap, but kept as the documented failure mode
/// from the design (exceeding K causes `Unsupported`).
pub fn unsupported_if_window_exhausted(err: &Error) -> bool {
    matches!(err, Error::Unsupported(_))
}
