// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-timestep playback clock.

/// Limit on fixed steps per frame to avoid a spiral of death
const MAX_STEPS_PER_FRAME: u32 = 8;

/// Slowest allowed playback; a zero scale would stop the clock for good
pub const MIN_TIME_SCALE: f32 = 0.01;

/// Fastest allowed playback
pub const MAX_TIME_SCALE: f32 = 10.0;

/// Converts variable frame deltas into fixed sequencer ticks
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Seconds per fixed step
    pub fixed_timestep: f64,
    /// Time scale (1.0 = normal speed)
    time_scale: f32,
    /// Accumulated unprocessed time
    accumulated_time: f64,
    /// Frames processed since the clock started
    pub frame_count: u64,
    /// Scaled time since the clock started, excluding time dropped by the
    /// step limit
    pub elapsed_time: f64,
}

impl PlaybackClock {
    /// Create a clock ticking at the given rate
    pub fn new(tick_rate_hz: f64) -> Self {
        Self {
            fixed_timestep: 1.0 / tick_rate_hz.max(1.0),
            time_scale: 1.0,
            accumulated_time: 0.0,
            frame_count: 0,
            elapsed_time: 0.0,
        }
    }

    /// Set time scale (clamped to reasonable range)
    pub fn set_time_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            tracing::warn!("Ignoring non-finite time scale {}", scale);
            return;
        }
        self.time_scale = scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
    }

    /// Feed a frame delta, returning the number of fixed steps to run
    pub fn advance(&mut self, delta_time: f64) -> u32 {
        let scaled_delta = delta_time * f64::from(self.time_scale);
        self.elapsed_time += scaled_delta;
        self.accumulated_time += scaled_delta;
        self.frame_count += 1;

        let mut steps = 0;
        while self.accumulated_time >= self.fixed_timestep {
            self.accumulated_time -= self.fixed_timestep;
            steps += 1;

            if steps >= MAX_STEPS_PER_FRAME {
                // Dropped time never reaches the sequencer, so it must not
                // count as elapsed either
                self.elapsed_time -= self.accumulated_time;
                self.accumulated_time = 0.0;
                break;
            }
        }

        steps
    }

    /// Current time scale
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Fixed step length in seconds
    pub fn step_secs(&self) -> f32 {
        self.fixed_timestep as f32
    }
}
