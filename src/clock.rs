//! Simulation time driven by the host.
//!
//! The host passes a frame delta to `update`; [`SimClock`] sanitizes it and
//! keeps elapsed time, the frame count and the turbulence time that scrolls
//! the noise field. [`EmissionTimer`] turns accumulated time into automatic
//! emission bursts.
//!
//! ```ignore
//! let mut clock = SimClock::new();
//! let dt = clock.advance(frame_dt);
//! println!("Elapsed: {:.2}s, frame {}", clock.elapsed(), clock.frame());
//! ```

/// Largest delta a single frame may advance by, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Bursts a single frame may emit after a long stall.
pub const MAX_BURSTS_PER_FRAME: u32 = 16;

/// Host-driven simulation clock.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Total simulated seconds.
    elapsed_secs: f32,
    /// Last sanitized delta.
    delta_secs: f32,
    /// Frames advanced.
    frame_count: u64,
    /// Time fed to the turbulence field.
    turbulence_secs: f32,
    /// Multiplier applied to every delta.
    time_scale: f32,
    /// Upper bound of a single delta.
    max_delta: f32,
    /// Whether time is paused.
    paused: bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    /// Clock at time zero.
    pub fn new() -> Self {
        Self {
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            turbulence_secs: 0.0,
            time_scale: 1.0,
            max_delta: DEFAULT_MAX_DELTA,
            paused: false,
        }
    }

    /// Advance by a host delta and return the sanitized delta.
    ///
    /// Negative or non-finite deltas count as zero; large ones are clamped
    /// to the max delta after scaling.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let raw = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        if raw == 0.0 && dt != 0.0 {
            log::debug!("ignoring invalid frame delta {dt}");
        }

        self.delta_secs = if self.paused {
            0.0
        } else {
            (raw * self.time_scale).min(self.max_delta)
        };
        self.elapsed_secs += self.delta_secs;
        self.turbulence_secs += self.delta_secs;
        self.frame_count += 1;
        self.delta_secs
    }

    /// Total simulated seconds.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Last sanitized delta.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Frames advanced.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Time fed to the turbulence field.
    #[inline]
    pub fn turbulence_time(&self) -> f32 {
        self.turbulence_secs
    }

    /// Whether time is paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume; paused frames advance by zero.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Scale every delta (1.0 = real time). Negative values are treated as 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    /// Current time scale.
    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Bound on a single delta.
    pub fn set_max_delta(&mut self, max_delta: f32) {
        self.max_delta = if max_delta.is_finite() && max_delta > 0.0 {
            max_delta
        } else {
            DEFAULT_MAX_DELTA
        };
    }

    /// Reset to time zero, keeping scale and bounds.
    pub fn reset(&mut self) {
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.turbulence_secs = 0.0;
    }
}

/// Accumulates frame time into automatic emission bursts.
#[derive(Debug, Clone, Default)]
pub struct EmissionTimer {
    accumulator: f32,
}

impl EmissionTimer {
    /// Number of bursts due after `dt` seconds with `delay` between bursts.
    ///
    /// A zero delay fires once per frame.
    pub fn tick(&mut self, dt: f32, delay: f32) -> u32 {
        if delay <= 0.0 {
            self.accumulator = 0.0;
            return 1;
        }
        self.accumulator += dt;
        let due = (self.accumulator / delay).floor();
        if due < 1.0 {
            return 0;
        }
        self.accumulator -= due * delay;
        if due > MAX_BURSTS_PER_FRAME as f32 {
            log::debug!("dropping {} overdue emission bursts", due as u32 - MAX_BURSTS_PER_FRAME);
            self.accumulator = 0.0;
            return MAX_BURSTS_PER_FRAME;
        }
        due as u32
    }

    /// Seconds accumulated toward the next burst.
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Drop accumulated time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut clock = SimClock::new();
        clock.advance(0.1);
        clock.advance(0.2);
        assert!((clock.elapsed() - 0.3).abs() < 1e-6);
        assert!((clock.turbulence_time() - 0.3).abs() < 1e-6);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_invalid_delta_is_zero() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.advance(f32::NAN), 0.0);
        assert_eq!(clock.advance(f32::INFINITY), 0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(5.0), DEFAULT_MAX_DELTA);
        clock.set_max_delta(1.0);
        assert_eq!(clock.advance(5.0), 1.0);
    }

    #[test]
    fn test_pause_and_scale() {
        let mut clock = SimClock::new();
        clock.set_paused(true);
        assert_eq!(clock.advance(0.1), 0.0);
        clock.set_paused(false);
        clock.set_time_scale(0.5);
        assert!((clock.advance(0.1) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut clock = SimClock::new();
        clock.advance(0.1);
        clock.reset();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.frame(), 0);
    }

    #[test]
    fn test_zero_delay_fires_every_frame() {
        let mut timer = EmissionTimer::default();
        assert_eq!(timer.tick(0.016, 0.0), 1);
        assert_eq!(timer.tick(0.0, 0.0), 1);
    }

    #[test]
    fn test_delay_accumulates() {
        let mut timer = EmissionTimer::default();
        assert_eq!(timer.tick(0.3, 0.5), 0);
        assert_eq!(timer.tick(0.3, 0.5), 1);
        assert!((timer.accumulated() - 0.1).abs() < 1e-5);
        assert_eq!(timer.tick(1.0, 0.5), 2);
    }

    #[test]
    fn test_stall_is_capped() {
        let mut timer = EmissionTimer::default();
        assert_eq!(timer.tick(100.0, 0.01), MAX_BURSTS_PER_FRAME);
        assert_eq!(timer.accumulated(), 0.0);
    }
}
