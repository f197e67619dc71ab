// SPDX-License-Identifier: MIT OR Apache-2.0
//! Take definitions for the sequencer.

use crate::callback::Callbacks;
use crate::condition::{Condition, ConditionContext};
use crate::error::{SequencerError, TakeHook};
use uuid::Uuid;

/// Unique identifier for a take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TakeId(pub Uuid);

impl TakeId {
    /// Create a new random take ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TakeId {
    fn default() -> Self {
        Self::new()
    }
}

/// One beat of the experience.
///
/// A take finishes when it is auto-finishing, when every condition holds, or
/// when it has been force-finished with [`Take::finish_take`]. A take with no
/// conditions and `auto_finish` unset only ends through a forced finish.
pub struct Take {
    /// Unique take ID
    pub id: TakeId,
    /// Display name
    pub name: String,
    /// Finish as soon as the take is active, ignoring conditions
    pub auto_finish: bool,
    /// Wait before activating the take
    pub start_delay_secs: f32,
    /// Wait between finishing and running the finish handlers
    pub finish_delay_secs: f32,
    /// Handlers fired when the take becomes active
    pub on_start: Callbacks,
    /// Handlers fired on every tick while the take is active
    pub on_update: Callbacks,
    /// Handlers fired when the take's finish sequence completes
    pub on_finish: Callbacks,
    conditions: Vec<Box<dyn Condition>>,
    force_finished: bool,
}

impl Take {
    /// Create a take that waits for conditions (none yet)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TakeId::new(),
            name: name.into(),
            auto_finish: false,
            start_delay_secs: 0.0,
            finish_delay_secs: 0.0,
            on_start: Callbacks::new(),
            on_update: Callbacks::new(),
            on_finish: Callbacks::new(),
            conditions: Vec::new(),
            force_finished: false,
        }
    }

    /// Create an auto-finishing take
    pub fn auto(name: impl Into<String>) -> Self {
        Self::new(name).with_auto_finish(true)
    }

    /// Set auto-finish
    pub fn with_auto_finish(mut self, auto_finish: bool) -> Self {
        self.auto_finish = auto_finish;
        self
    }

    /// Set start and finish delays
    pub fn with_delays(mut self, start_delay_secs: f32, finish_delay_secs: f32) -> Self {
        self.start_delay_secs = start_delay_secs;
        self.finish_delay_secs = finish_delay_secs;
        self
    }

    /// Add a completion condition
    pub fn with_condition(mut self, condition: impl Condition + 'static) -> Self {
        self.add_condition(condition);
        self
    }

    /// Add a completion condition
    pub fn add_condition(&mut self, condition: impl Condition + 'static) {
        self.conditions.push(Box::new(condition));
    }

    /// Get condition count
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Get condition names in declared order
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|c| c.name())
    }

    /// Whether the take was force-finished
    pub fn is_force_finished(&self) -> bool {
        self.force_finished
    }

    /// Force the take to report finished on its next check
    pub fn finish_take(&mut self) {
        self.force_finished = true;
    }

    /// Clear the forced-finish flag before a new run
    pub fn reset(&mut self) {
        self.force_finished = false;
    }

    /// Check whether the take is finished.
    ///
    /// Conditions are all evaluated in declared order, even after one
    /// returns false, so stateful conditions observe every check.
    pub fn is_finished(&mut self, ctx: &ConditionContext<'_>) -> Result<bool, SequencerError> {
        if self.auto_finish || self.force_finished {
            return Ok(true);
        }
        if self.conditions.is_empty() {
            return Ok(false);
        }

        let mut all_hold = true;
        for condition in &mut self.conditions {
            let holds = condition
                .evaluate(ctx)
                .map_err(|source| SequencerError::Condition {
                    take: self.name.clone(),
                    condition: condition.name().to_string(),
                    source,
                })?;
            all_hold &= holds;
        }
        Ok(all_hold)
    }

    /// Fire the start handlers
    pub fn on_take_start(&mut self) -> Result<(), SequencerError> {
        for condition in &mut self.conditions {
            condition.reset();
        }
        let result = self.on_start.invoke();
        self.hook_result(TakeHook::Start, result)
    }

    /// Fire the update handlers
    pub fn on_take_update(&mut self) -> Result<(), SequencerError> {
        let result = self.on_update.invoke();
        self.hook_result(TakeHook::Update, result)
    }

    /// Fire the finish handlers
    pub fn on_take_finish(&mut self) -> Result<(), SequencerError> {
        let result = self.on_finish.invoke();
        self.hook_result(TakeHook::Finish, result)
    }

    fn hook_result(
        &self,
        hook: TakeHook,
        result: Result<(), crate::error::HandlerError>,
    ) -> Result<(), SequencerError> {
        result.map_err(|source| SequencerError::Callback {
            take: self.name.clone(),
            hook,
            source,
        })
    }
}

impl std::fmt::Debug for Take {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Take")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("auto_finish", &self.auto_finish)
            .field("start_delay_secs", &self.start_delay_secs)
            .field("finish_delay_secs", &self.finish_delay_secs)
            .field("conditions", &self.condition_names().collect::<Vec<_>>())
            .field("force_finished", &self.force_finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Predicate, SignalRaised, Signals};
    use std::cell::Cell;
    use std::rc::Rc;

    fn ctx(signals: &Signals) -> ConditionContext<'_> {
        ConditionContext {
            take_elapsed_secs: 0.0,
            signals,
        }
    }

    #[test]
    fn test_auto_finish_ignores_conditions() {
        let signals = Signals::new();
        let mut take = Take::auto("Intro").with_condition(SignalRaised::new("never"));
        assert!(take.is_finished(&ctx(&signals)).unwrap());
    }

    #[test]
    fn test_empty_conditions_never_finish() {
        let signals = Signals::new();
        let mut take = Take::new("Wait for skip");
        for _ in 0..1000 {
            assert!(!take.is_finished(&ctx(&signals)).unwrap());
        }

        take.finish_take();
        assert!(take.is_finished(&ctx(&signals)).unwrap());

        take.reset();
        assert!(!take.is_finished(&ctx(&signals)).unwrap());
    }

    #[test]
    fn test_conditions_fully_evaluated() {
        let signals = Signals::new();
        let calls = Rc::new(Cell::new(0));

        let counter = Rc::clone(&calls);
        let mut take = Take::new("Gate")
            .with_condition(Predicate::new("always false", |_ctx: &ConditionContext<'_>| Ok(false)))
            .with_condition(Predicate::new("counted", move |_ctx: &ConditionContext<'_>| {
                counter.set(counter.get() + 1);
                Ok(true)
            }));

        assert!(!take.is_finished(&ctx(&signals)).unwrap());
        assert!(!take.is_finished(&ctx(&signals)).unwrap());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_all_conditions_required() {
        let mut signals = Signals::new();
        let mut take = Take::new("Door")
            .with_condition(SignalRaised::new("key"))
            .with_condition(SignalRaised::new("door"));

        signals.raise("key");
        assert!(!take.is_finished(&ctx(&signals)).unwrap());
        signals.raise("door");
        assert!(take.is_finished(&ctx(&signals)).unwrap());
    }

    #[test]
    fn test_condition_error_names_take() {
        let signals = Signals::new();
        let mut take = Take::new("Broken")
            .with_condition(Predicate::new("sensor", |_ctx: &ConditionContext<'_>| Err("offline".into())));

        let err = take.is_finished(&ctx(&signals)).unwrap_err();
        assert_eq!(err.to_string(), "Take 'Broken' condition 'sensor' failed: offline");
    }

    #[test]
    fn test_hooks_fire_handlers() {
        let started = Rc::new(Cell::new(false));
        let mut take = Take::auto("Intro");

        let flag = Rc::clone(&started);
        take.on_start.add_infallible(move || flag.set(true));
        take.on_finish.add(|| Err("no audio device".into()));

        take.on_take_start().unwrap();
        assert!(started.get());
        take.on_take_update().unwrap();

        let err = take.on_take_finish().unwrap_err();
        assert!(matches!(err, SequencerError::Callback { hook: TakeHook::Finish, .. }));
    }
}
