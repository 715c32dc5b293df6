//! Upload progress reporting.
//!
//! Adapters report 0..=100 for their own transfer. A multi-stage operation
//! gives the transfer a slice of its overall bar (upload is 10..80 of a
//! document upload) with [`scale_progress`], and [`ProgressTracker`] keeps
//! the reported values monotonic.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Stage of the overall document-upload bar occupied by the transfer.
pub const UPLOAD_STAGE: (u8, u8) = (10, 80);

/// Map `percent` (clamped to 0..=100) into the range `from..=to`.
#[must_use]
pub fn scale_progress(percent: u8, from: u8, to: u8) -> u8 {
    let percent = u16::from(percent.min(100));
    let (from, to) = (u16::from(from), u16::from(to.max(from)));
    let scaled = from + (percent * (to - from) + 50) / 100;
    u8::try_from(scaled).unwrap_or(u8::MAX)
}

/// Forwards progress to a sink, scaled into a stage, dropping any value
/// that is not strictly greater than the last one reported.
pub struct ProgressTracker<'a> {
    from: u8,
    to: u8,
    last: AtomicU8,
    reported_any: AtomicBool,
    sink: &'a (dyn Fn(u8) + Send + Sync),
}

impl<'a> ProgressTracker<'a> {
    pub fn new(from: u8, to: u8, sink: &'a (dyn Fn(u8) + Send + Sync)) -> Self {
        Self {
            from,
            to,
            last: AtomicU8::new(0),
            reported_any: AtomicBool::new(false),
            sink,
        }
    }

    /// Report a stage-local percentage.
    pub fn report(&self, percent: u8) {
        self.emit(scale_progress(percent, self.from, self.to));
    }

    /// Report an absolute position on the overall bar.
    pub fn set(&self, overall: u8) {
        self.emit(overall.min(100));
    }

    /// Last value forwarded to the sink.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    fn emit(&self, value: u8) {
        let first = !self.reported_any.swap(true, Ordering::SeqCst);
        let previous = self.last.fetch_max(value, Ordering::SeqCst);
        if first || value > previous {
            (self.sink)(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;

    #[rstest]
    #[case(0, 10)]
    #[case(50, 45)]
    #[case(100, 80)]
    #[case(150, 80)]
    fn upload_stage_scaling(#[case] percent: u8, #[case] expected: u8) {
        let (from, to) = UPLOAD_STAGE;
        assert_eq!(scale_progress(percent, from, to), expected);
    }

    #[test]
    fn tracker_is_monotonic_and_deduplicated() {
        let seen = Mutex::new(Vec::new());
        let sink = |p: u8| seen.lock().unwrap().push(p);
        let tracker = ProgressTracker::new(10, 80, &sink);

        tracker.set(0);
        for p in [0, 0, 20, 10, 50, 50, 100] {
            tracker.report(p);
        }
        tracker.set(90);
        tracker.set(85);
        tracker.set(100);

        assert_eq!(*seen.lock().unwrap(), vec![0, 10, 24, 45, 80, 90, 100]);
        assert_eq!(tracker.last(), 100);
    }
}
