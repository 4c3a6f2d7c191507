//! Movie playback statistics
//!
//! Frame counts come from the decoder; elapsed time is measured here.

use common::FinishReason;
use std::time::{Duration, Instant};

use super::codec::FrameCounts;

/// Tracks one session's playback statistics
#[derive(Debug)]
pub struct PlaybackStats {
    path: String,
    counts: FrameCounts,
    started: Instant,

    /// Steps that produced no frame on screen (profiling only)
    #[cfg(feature = "profiling")]
    empty_steps: u64,
}

impl PlaybackStats {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            counts: FrameCounts::default(),
            started: Instant::now(),
            #[cfg(feature = "profiling")]
            empty_steps: 0,
        }
    }

    /// Latest counters reported by the decoder
    pub fn record(&mut self, counts: FrameCounts) {
        self.counts = counts;
    }

    #[cfg(feature = "profiling")]
    pub fn record_empty_step(&mut self) {
        self.empty_steps += 1;
    }

    pub fn frames_shown(&self) -> u64 {
        self.counts.shown
    }

    pub fn frames_dropped(&self) -> u64 {
        self.counts.dropped
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Get current drop rate as percentage
    pub fn drop_rate(&self) -> f64 {
        let total = self.counts.shown + self.counts.dropped;
        if total == 0 {
            0.0
        } else {
            (self.counts.dropped as f64 / total as f64) * 100.0
        }
    }

    /// Log the end-of-session summary
    pub fn log_summary(&self, reason: FinishReason) {
        log::info!(
            "Movie {} finished ({:?}): {} frames, {} dropped ({:.1}% drop rate) in {:.1?}",
            self.path,
            reason,
            self.counts.shown,
            self.counts.dropped,
            self.drop_rate(),
            self.elapsed()
        );

        #[cfg(feature = "profiling")]
        log::debug!("{} decoder steps produced no frame", self.empty_steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_rate() {
        let mut stats = PlaybackStats::new("intro.mve");
        assert_eq!(stats.drop_rate(), 0.0);

        stats.record(FrameCounts {
            shown: 90,
            dropped: 10,
        });
        assert_eq!(stats.frames_shown(), 90);
        assert_eq!(stats.frames_dropped(), 10);
        assert!((stats.drop_rate() - 10.0).abs() < f64::EPSILON);
    }
}
