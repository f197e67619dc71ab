// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line options.

use clap::Parser;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

/// Plays a take script headlessly
#[derive(Debug, Parser)]
#[command(name = "takes_player", version, about)]
pub struct Args {
    /// Take script (RON)
    pub script: PathBuf,

    /// Sequencer ticks per second
    #[arg(long, default_value_t = 60.0, value_parser = parse_positive::<f64>)]
    pub tick_rate: f64,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0, value_parser = parse_positive::<f32>)]
    pub time_scale: f32,

    /// Raise a signal at a playback time, as NAME@SECS (repeatable)
    #[arg(long = "raise", value_name = "NAME@SECS", value_parser = parse_signal_cue)]
    pub raises: Vec<SignalCue>,

    /// Skip the current take at a playback time (repeatable)
    #[arg(long = "skip-at", value_name = "SECS")]
    pub skips: Vec<f64>,

    /// Give up after this much playback time
    #[arg(long, default_value_t = 600.0, value_parser = parse_positive::<f64>)]
    pub max_secs: f64,

    /// Pace ticks against the wall clock instead of simulating
    #[arg(long)]
    pub realtime: bool,
}

/// A signal raised at a playback time
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCue {
    /// Signal name
    pub name: String,
    /// Playback time in seconds
    pub at_secs: f64,
}

/// Parse a finite number greater than zero
fn parse_positive<T>(value: &str) -> Result<T, String>
where
    T: FromStr + Into<f64> + Copy,
    T::Err: Display,
{
    let parsed: T = value
        .parse()
        .map_err(|e| format!("invalid number '{value}': {e}"))?;
    let number: f64 = parsed.into();
    if !number.is_finite() || number <= 0.0 {
        return Err(format!("expected a finite number above zero, got '{value}'"));
    }
    Ok(parsed)
}

fn parse_signal_cue(value: &str) -> Result<SignalCue, String> {
    let (name, secs) = value
        .rsplit_once('@')
        .ok_or_else(|| format!("expected NAME@SECS, got '{value}'"))?;
    if name.is_empty() {
        return Err("signal name is empty".to_string());
    }
    let at_secs: f64 = secs
        .parse()
        .map_err(|e| format!("invalid time '{secs}': {e}"))?;
    if !at_secs.is_finite() || at_secs < 0.0 {
        return Err(format!("invalid time '{secs}'"));
    }

    Ok(SignalCue {
        name: name.to_string(),
        at_secs,
    })
}
