use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Monotonic clock driving frame presentation.
pub trait Timer: Send {
    /// Time since the clock started.
    fn now(&self) -> Duration;
    fn elapsed(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
    fn sleep(&mut self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub frames: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    fn from_samples(samples: &VecDeque<Duration>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            frames: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone)]
struct FrameSamples {
    times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameSamples {
    fn new(max_samples: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn push(&mut self, d: Duration) {
        if self.times.len() >= self.max_samples {
            self.times.pop_front();
        }
        self.times.push_back(d);
    }
}

/// Wall-clock timer. With the `high_precision_timer` feature on Linux,
/// sleeps go through `clock_nanosleep` on the monotonic clock.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    samples: FrameSamples,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            samples: FrameSamples::new(1000),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(all(feature = "high_precision_timer", target_os = "linux"))]
        Self::linux_sleep(duration);
        #[cfg(not(all(feature = "high_precision_timer", target_os = "linux")))]
        std::thread::sleep(duration);
    }

    #[cfg(all(feature = "high_precision_timer", target_os = "linux"))]
    fn linux_sleep(duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, d: Duration) {
        self.high_precision_sleep(d)
    }

    fn record_frame(&mut self, d: Duration) {
        self.samples.push(d);
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.samples.times)
    }
}

/// Deterministic clock that only moves when told to. Used by simulated
/// stations, where every flip advances time by exactly one frame period.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now: Duration,
    samples: FrameSamples,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            samples: FrameSamples::new(1000),
        }
    }

    pub fn advance(&mut self, d: Duration) {
        self.now += d;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for VirtualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, d: Duration) {
        self.advance(d);
    }

    fn record_frame(&mut self, d: Duration) {
        self.samples.push(d);
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_samples(&self.samples.times)
    }
}

/// Paces a loop to a fixed refresh rate on top of any [`Timer`].
#[derive(Debug, Clone)]
pub struct FramePacer<T: Timer> {
    timer: T,
    period: Duration,
    last_flip: Duration,
}

impl<T: Timer> FramePacer<T> {
    pub fn new(timer: T, refresh_hz: f64) -> Self {
        let period = if refresh_hz > 0.0 {
            Duration::from_secs_f64(1.0 / refresh_hz)
        } else {
            Duration::ZERO
        };
        let last_flip = timer.now();
        Self {
            timer,
            period,
            last_flip,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn now(&self) -> Duration {
        self.timer.now()
    }

    /// Block until the next frame boundary and record the frame time.
    pub fn wait_for_frame(&mut self) {
        let spent = self.timer.elapsed(self.last_flip);
        if spent < self.period {
            self.timer.sleep(self.period - spent);
        }
        let now = self.timer.now();
        self.timer.record_frame(now.saturating_sub(self.last_flip));
        self.last_flip = now;
    }

    pub fn calibration_stats(&self) -> CalibrationStats {
        self.timer.calibration_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_pacer_advances_one_period_per_frame() {
        let mut pacer = FramePacer::new(VirtualClock::new(), 50.0);
        for _ in 0..10 {
            pacer.wait_for_frame();
        }
        assert_eq!(pacer.now(), Duration::from_millis(200));
        let stats = pacer.calibration_stats();
        assert_eq!(stats.frames, 10);
        assert!((stats.effective_fps - 50.0).abs() < 1e-6);
        assert_eq!(stats.jitter_ns, 0.0);
    }

    #[test]
    fn empty_stats_are_zero() {
        assert_eq!(VirtualClock::new().calibration_stats(), CalibrationStats::default());
    }

    #[test]
    fn sample_window_is_bounded() {
        let mut clock = VirtualClock::new();
        for i in 0..1500u64 {
            clock.record_frame(Duration::from_micros(i));
        }
        assert_eq!(clock.calibration_stats().frames, 1000);
    }

    #[test]
    fn wall_timer_is_monotonic() {
        let mut t = HighPrecisionTimer::new();
        let a = t.now();
        t.sleep(Duration::from_millis(1));
        assert!(t.now() >= a + Duration::from_millis(1));
    }
}
