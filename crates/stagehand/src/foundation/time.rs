//! Frame timing utilities

use std::time::{Duration, Instant};

/// Frame timer driving the engine loop
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Sleeps out the remainder of a frame so the loop never exceeds a max FPS
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    frame_budget: Option<Duration>,
    frame_start: Instant,
}

impl FrameLimiter {
    /// Create a limiter; `None` or `Some(0)` means unlimited
    pub fn new(max_fps: Option<u32>) -> Self {
        Self {
            frame_budget: max_fps
                .filter(|fps| *fps > 0)
                .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps))),
            frame_start: Instant::now(),
        }
    }

    /// Duration of one frame at the configured cap
    pub fn frame_budget(&self) -> Option<Duration> {
        self.frame_budget
    }

    /// Mark the start of a frame
    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Time left in the current frame's budget
    pub fn remaining(&self) -> Duration {
        self.frame_budget
            .map_or(Duration::ZERO, |budget| budget.saturating_sub(self.frame_start.elapsed()))
    }

    /// Sleep until the frame budget is used up
    pub fn end_frame(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_counts_frames() {
        let mut timer = Timer::new();
        timer.update();
        timer.update();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.total_time() >= timer.delta_time());
    }

    #[test]
    fn test_unlimited_limiter_never_waits() {
        let limiter = FrameLimiter::new(None);
        assert!(limiter.frame_budget().is_none());
        assert_eq!(limiter.remaining(), Duration::ZERO);

        let zero = FrameLimiter::new(Some(0));
        assert!(zero.frame_budget().is_none());
    }

    #[test]
    fn test_limiter_budget_matches_fps() {
        let limiter = FrameLimiter::new(Some(50));
        assert_eq!(limiter.frame_budget(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut stopwatch = Stopwatch::start_new();
        stopwatch.stop();
        let first = stopwatch.elapsed();
        assert_eq!(stopwatch.elapsed(), first);
    }
}
