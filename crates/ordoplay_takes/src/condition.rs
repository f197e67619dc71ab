// SPDX-License-Identifier: MIT OR Apache-2.0
//! Completion conditions for takes.
//!
//! A condition is a predicate gating the end of a take. The sequencer
//! evaluates every condition of the active take after each update; the take
//! finishes once all of them hold.

use crate::error::HandlerError;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Named boolean flags shared between the host and take conditions
#[derive(Debug, Clone, Default)]
pub struct Signals {
    flags: IndexMap<String, bool>,
}

impl Signals {
    /// Create an empty signal board
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a signal
    pub fn raise(&mut self, name: impl Into<String>) {
        self.set(name, true);
    }

    /// Lower a signal
    pub fn clear(&mut self, name: &str) {
        if let Some(flag) = self.flags.get_mut(name) {
            *flag = false;
        }
    }

    /// Set a signal to a value
    pub fn set(&mut self, name: impl Into<String>, raised: bool) {
        let name = name.into();
        tracing::debug!("Signal '{}' = {}", name, raised);
        self.flags.insert(name, raised);
    }

    /// Check whether a signal is raised
    pub fn is_raised(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Iterate over all known signals in first-set order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(name, raised)| (name.as_str(), *raised))
    }
}

/// World state visible to conditions during evaluation
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    /// Seconds the take has been active (excluding its start delay)
    pub take_elapsed_secs: f32,
    /// Host signal board
    pub signals: &'a Signals,
}

/// A predicate gating a take's completion
pub trait Condition {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Evaluate the condition against the current world state
    fn evaluate(&mut self, ctx: &ConditionContext<'_>) -> Result<bool, HandlerError>;

    /// Reset internal state when the owning take becomes active
    fn reset(&mut self) {}
}

/// Holds once the take has been active for a duration
#[derive(Debug, Clone)]
pub struct Elapsed {
    secs: f32,
    name: String,
}

impl Elapsed {
    /// Create a timer condition
    pub fn new(secs: f32) -> Self {
        Self {
            secs,
            name: format!("elapsed {secs}s"),
        }
    }
}

impl Condition for Elapsed {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, ctx: &ConditionContext<'_>) -> Result<bool, HandlerError> {
        Ok(ctx.take_elapsed_secs >= self.secs)
    }
}

/// Holds while every named signal is raised
#[derive(Debug, Clone)]
pub struct SignalRaised {
    names: Vec<String>,
    name: String,
}

impl SignalRaised {
    /// Wait for a single signal
    pub fn new(signal: impl Into<String>) -> Self {
        Self::all([signal.into()])
    }

    /// Wait for several signals at once
    pub fn all<I, S>(signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = signals.into_iter().map(Into::into).collect();
        let name = format!("signal {}", names.join(" + "));
        Self { names, name }
    }
}

impl Condition for SignalRaised {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, ctx: &ConditionContext<'_>) -> Result<bool, HandlerError> {
        Ok(self.names.iter().all(|name| ctx.signals.is_raised(name)))
    }
}

/// Holds while an externally owned flag is set
#[derive(Debug, Clone)]
pub struct SharedFlag {
    flag: Arc<AtomicBool>,
    name: String,
}

impl SharedFlag {
    /// Create a condition and the flag handle that controls it
    pub fn new(name: impl Into<String>) -> (Self, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (Self::watching(name, Arc::clone(&flag)), flag)
    }

    /// Watch an existing flag
    pub fn watching(name: impl Into<String>, flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            name: name.into(),
        }
    }
}

impl Condition for SharedFlag {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, _ctx: &ConditionContext<'_>) -> Result<bool, HandlerError> {
        Ok(self.flag.load(Ordering::Acquire))
    }
}

/// Closure-backed condition
pub struct Predicate<F> {
    name: String,
    predicate: F,
}

impl<F> Predicate<F>
where
    F: FnMut(&ConditionContext<'_>) -> Result<bool, HandlerError>,
{
    /// Wrap a closure as a condition
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Condition for Predicate<F>
where
    F: FnMut(&ConditionContext<'_>) -> Result<bool, HandlerError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, ctx: &ConditionContext<'_>) -> Result<bool, HandlerError> {
        (self.predicate)(ctx)
    }
}
