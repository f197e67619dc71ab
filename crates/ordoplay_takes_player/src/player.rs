// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless host loop for a take sequencer.
//!
//! The player plays the role of the experience runtime: it owns the
//! sequencer, feeds it fixed ticks, and replays scripted input (signals and
//! skips) at their playback times.

use crate::cli::SignalCue;
use crate::clock::PlaybackClock;
use ordoplay_takes::{ScriptError, SequencerError, SequencerState, Take, TakeScript, TakeSequencer};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Player errors
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Script could not be loaded or built
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Sequencer failed
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// Playback did not complete in time
    #[error("Playback did not complete within {0}s")]
    TimedOut(f64),
}

/// Scripted host input
#[derive(Debug, Clone, PartialEq)]
pub enum CueAction {
    /// Raise a signal
    Raise(String),
    /// Skip the current take
    Skip,
}

/// Host input scheduled at a playback time
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    /// Playback time in seconds
    pub at_secs: f64,
    /// What to do
    pub action: CueAction,
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy)]
pub struct PlayerReport {
    /// Final sequencer state
    pub state: SequencerState,
    /// Playback time consumed
    pub elapsed_secs: f64,
    /// Sequencer ticks issued
    pub ticks: u64,
    /// Host frames processed
    pub frames: u64,
}

/// Drives a sequencer from a playback clock
pub struct Player {
    sequencer: TakeSequencer,
    clock: PlaybackClock,
    cues: Vec<Cue>,
    next_cue: usize,
    ticks: u64,
}

impl Player {
    /// Create a player for a script
    pub fn from_script(script: &TakeScript, clock: PlaybackClock) -> Result<Self, PlayerError> {
        let mut takes = script.build()?;
        for take in &mut takes {
            attach_logging(take);
        }
        Ok(Self::new(TakeSequencer::new(takes), clock))
    }

    /// Create a player for a prepared sequencer
    pub fn new(sequencer: TakeSequencer, clock: PlaybackClock) -> Self {
        Self {
            sequencer,
            clock,
            cues: Vec::new(),
            next_cue: 0,
            ticks: 0,
        }
    }

    /// Schedule signals and skips
    pub fn with_cues(mut self, signals: &[SignalCue], skips: &[f64]) -> Self {
        self.cues.extend(signals.iter().map(|cue| Cue {
            at_secs: cue.at_secs,
            action: CueAction::Raise(cue.name.clone()),
        }));
        self.cues.extend(skips.iter().map(|&at_secs| Cue {
            at_secs,
            action: CueAction::Skip,
        }));
        self.cues.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        self
    }

    /// Get the sequencer
    pub fn sequencer(&self) -> &TakeSequencer {
        &self.sequencer
    }

    /// Play until the sequence completes or `max_secs` of playback pass
    pub fn run(&mut self, max_secs: f64, realtime: bool) -> Result<PlayerReport, PlayerError> {
        self.sequencer.start()?;

        let frame = Duration::from_secs_f64(self.clock.fixed_timestep);
        let mut last_frame = Instant::now();

        while !self.sequencer.state().is_terminal() {
            if self.clock.elapsed_time >= max_secs {
                return Err(PlayerError::TimedOut(max_secs));
            }

            let delta = if realtime {
                std::thread::sleep(frame);
                let now = Instant::now();
                let delta = now.duration_since(last_frame).as_secs_f64();
                last_frame = now;
                delta
            } else {
                self.clock.fixed_timestep
            };

            self.frame(delta)?;
        }

        let report = PlayerReport {
            state: self.sequencer.state(),
            elapsed_secs: self.clock.elapsed_time,
            ticks: self.ticks,
            frames: self.clock.frame_count,
        };
        tracing::info!(
            "Playback {} after {:.2}s ({} ticks, {} frames)",
            report.state.status_text(),
            report.elapsed_secs,
            report.ticks,
            report.frames
        );
        Ok(report)
    }

    /// Process one host frame
    pub fn frame(&mut self, delta_time: f64) -> Result<(), PlayerError> {
        let steps = self.clock.advance(delta_time);
        self.fire_due_cues();

        let step_secs = self.clock.step_secs();
        for _ in 0..steps {
            self.sequencer.tick(step_secs)?;
            self.ticks += 1;
            if self.sequencer.state().is_terminal() {
                break;
            }
        }
        Ok(())
    }

    fn fire_due_cues(&mut self) {
        while let Some(cue) = self.cues.get(self.next_cue) {
            if cue.at_secs > self.clock.elapsed_time {
                break;
            }
            match &cue.action {
                CueAction::Raise(name) => {
                    tracing::info!("[{:.2}s] Raising signal '{}'", self.clock.elapsed_time, name);
                    self.sequencer.signals_mut().raise(name.clone());
                }
                CueAction::Skip => {
                    tracing::info!("[{:.2}s] Skip requested", self.clock.elapsed_time);
                    self.sequencer.skip_current_take();
                }
            }
            self.next_cue += 1;
        }
    }
}

/// Log each take's lifecycle
fn attach_logging(take: &mut Take) {
    let name = take.name.clone();
    take.on_start
        .add_infallible(move || tracing::info!("Take '{}' started", name));
    let name = take.name.clone();
    take.on_finish
        .add_infallible(move || tracing::info!("Take '{}' finished", name));
}
