//! Watermark-based downloader flow control.
//!
//! The downloader is pushed Pause/Resume signals based on FIFO occupancy.
//! Signals are level-triggered for the downloader but deduplicated here:
//! one Pause per upward crossing of the high watermark, one Resume per
//! downward crossing of the low watermark.

use tracing::debug;

/// Occupancy below which the downloader is resumed (10 MiB).
pub const LOW_WATERMARK: usize = 10 * 1024 * 1024;

/// Occupancy above which the downloader is paused (18 MiB).
pub const HIGH_WATERMARK: usize = 18 * 1024 * 1024;

/// Control signal sent to the external downloader. Fire-and-forget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowSignal {
    Pause,
    Resume,
}

/// Capability interface implemented by whoever owns the downloader.
pub trait DownloaderControl {
    fn control(&mut self, signal: FlowSignal);
}

/// Watches FIFO occupancy and emits watermark crossings.
#[derive(Debug)]
pub struct FlowController {
    low: usize,
    high: usize,
    above_high: bool,
    below_low: bool,
}

impl FlowController {
    pub fn new() -> Self {
        Self::with_watermarks(LOW_WATERMARK, HIGH_WATERMARK)
    }

    /// Custom watermarks, mainly for tests. `low` must be below `high`.
    pub fn with_watermarks(low: usize, high: usize) -> Self {
        debug_assert!(low < high);
        Self {
            low,
            high,
            above_high: false,
            below_low: false,
        }
    }

    /// Feed a new occupancy reading, emitting at most one signal.
    pub fn on_occupancy(&mut self, used: usize, ctrl: &mut dyn DownloaderControl) {
        if used > self.high {
            if !self.above_high {
                debug!(used, high = self.high, "pausing downloader");
                ctrl.control(FlowSignal::Pause);
            }
            self.above_high = true;
            self.below_low = false;
        } else if used < self.low {
            if !self.below_low {
                debug!(used, low = self.low, "resuming downloader");
                ctrl.control(FlowSignal::Resume);
            }
            self.below_low = true;
            self.above_high = false;
        } else {
            // Between the watermarks: the next crossing fires again.
            self.above_high = false;
            self.below_low = false;
        }
    }

    /// Forget crossing state (used on session reset).
    pub fn reset(&mut self) {
        self.above_high = false;
        self.below_low = false;
    }
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCtrl {
        signals: Vec<FlowSignal>,
    }

    impl DownloaderControl for RecordingCtrl {
        fn control(&mut self, signal: FlowSignal) {
            self.signals.push(signal);
        }
    }

    const MIB: usize = 1024 * 1024;

    #[test]
    fn test_pause_once_while_above_high() {
        let mut flow = FlowController::new();
        let mut ctrl = RecordingCtrl::default();

        flow.on_occupancy(19 * MIB, &mut ctrl);
        flow.on_occupancy(20 * MIB, &mut ctrl);
        flow.on_occupancy(19 * MIB, &mut ctrl);

        assert_eq!(ctrl.signals, vec![FlowSignal::Pause]);
    }

    #[test]
    fn test_resume_once_while_below_low() {
        let mut flow = FlowController::new();
        let mut ctrl = RecordingCtrl::default();

        flow.on_occupancy(5 * MIB, &mut ctrl);
        flow.on_occupancy(2 * MIB, &mut ctrl);

        assert_eq!(ctrl.signals, vec![FlowSignal::Resume]);
    }

    #[test]
    fn test_oscillation_between_watermarks() {
        // Crossing above 18 MiB then oscillating 16 <-> 19 MiB: one Pause
        // per upward crossing, no Resume until occupancy drops below 10 MiB.
        let mut flow = FlowController::new();
        let mut ctrl = RecordingCtrl::default();

        flow.on_occupancy(19 * MIB, &mut ctrl);
        flow.on_occupancy(16 * MIB, &mut ctrl);
        flow.on_occupancy(19 * MIB, &mut ctrl);
        flow.on_occupancy(16 * MIB, &mut ctrl);

        assert_eq!(ctrl.signals, vec![FlowSignal::Pause, FlowSignal::Pause]);

        flow.on_occupancy(9 * MIB, &mut ctrl);
        flow.on_occupancy(8 * MIB, &mut ctrl);
        assert_eq!(
            ctrl.signals,
            vec![FlowSignal::Pause, FlowSignal::Pause, FlowSignal::Resume]
        );
    }

    #[test]
    fn test_middle_band_emits_nothing() {
        let mut flow = FlowController::new();
        let mut ctrl = RecordingCtrl::default();

        flow.on_occupancy(12 * MIB, &mut ctrl);
        flow.on_occupancy(15 * MIB, &mut ctrl);

        assert!(ctrl.signals.is_empty());
    }
}
