// SPDX-License-Identifier: MIT OR Apache-2.0
//! Take sequencer state machine.
//!
//! The sequencer owns an ordered list of takes and runs them one at a time:
//!
//! ```text
//! Idle -> Starting -> Active -> Finishing -> (next take | Completed)
//! ```
//!
//! `Starting` and `Finishing` are skipped when the corresponding delay is
//! zero. The host drives everything through [`TakeSequencer::tick`].

use crate::condition::{ConditionContext, Signals};
use crate::delay::{DelayHandle, DelayKind, DelayScheduler};
use crate::error::{Result, SequencerError};
use crate::take::{Take, TakeId};

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// Not started
    #[default]
    Idle,
    /// Waiting out the current take's start delay
    Starting,
    /// Current take is running and receiving updates
    Active,
    /// Waiting out the current take's finish delay
    Finishing,
    /// Every take has finished
    Completed,
    /// Stopped on a configuration error
    Halted,
}

impl SequencerState {
    /// Check if a take is in flight
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Starting | Self::Active | Self::Finishing)
    }

    /// Check if the run is over, normally or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted)
    }

    /// Get a status string for display
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Active => "Active",
            Self::Finishing => "Finishing",
            Self::Completed => "Completed",
            Self::Halted => "Halted",
        }
    }
}

/// Runs takes in list order, one at a time.
///
/// A hook or condition error is returned from the call that triggered it
/// and the failed step is retried on the next tick. Configuration errors
/// (empty list, unresolvable current take) halt the sequencer for good.
#[derive(Debug)]
pub struct TakeSequencer {
    takes: Vec<Take>,
    current: Option<TakeId>,
    current_index: usize,
    state: SequencerState,
    delays: DelayScheduler,
    pending_delay: Option<DelayHandle>,
    signals: Signals,
    take_elapsed_secs: f32,
}

impl TakeSequencer {
    /// Create an idle sequencer over a take list
    pub fn new(takes: Vec<Take>) -> Self {
        Self {
            takes,
            current: None,
            current_index: 0,
            state: SequencerState::Idle,
            delays: DelayScheduler::new(),
            pending_delay: None,
            signals: Signals::new(),
            take_elapsed_secs: 0.0,
        }
    }

    /// Create a sequencer and start it immediately
    pub fn started(takes: Vec<Take>) -> Result<Self> {
        let mut sequencer = Self::new(takes);
        sequencer.start()?;
        Ok(sequencer)
    }

    /// Start the run with the first take
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SequencerState::Idle => {}
            SequencerState::Halted => return Err(SequencerError::Halted),
            _ => return Err(SequencerError::AlreadyStarted),
        }

        if self.takes.is_empty() {
            return Err(self.halt(SequencerError::EmptyTakeList));
        }

        for take in &mut self.takes {
            take.reset();
        }

        tracing::info!("Starting take sequence ({} takes)", self.takes.len());
        self.begin_take(0)
    }

    /// Advance the sequencer by one host tick.
    ///
    /// While a delay is outstanding only the delay clock moves; the current
    /// take receives no update. Idle and completed sequencers ignore ticks.
    pub fn tick(&mut self, delta_secs: f32) -> Result<()> {
        match self.state {
            SequencerState::Idle | SequencerState::Completed => Ok(()),
            SequencerState::Halted => Err(SequencerError::Halted),
            SequencerState::Starting | SequencerState::Finishing => {
                let elapsed = self.delays.advance(delta_secs);
                if elapsed.is_some() {
                    self.pending_delay = None;
                }
                match elapsed {
                    Some(DelayKind::Start) => self.activate_current(),
                    Some(DelayKind::Finish) => self.complete_current(),
                    None => Ok(()),
                }
            }
            SequencerState::Active => self.update_current(delta_secs),
        }
    }

    /// Force the current take to finish on its next check.
    ///
    /// Takes that are still waiting out their start delay are started first;
    /// their finish delay still applies. Returns false when nothing was
    /// skipped.
    pub fn skip_current_take(&mut self) -> bool {
        if !matches!(
            self.state,
            SequencerState::Starting | SequencerState::Active
        ) {
            tracing::debug!("Skip ignored while {}", self.state.status_text());
            return false;
        }

        let Some(id) = self.current else {
            return false;
        };
        let Some(take) = self.take_mut(id) else {
            return false;
        };
        tracing::info!("Skipping take '{}'", take.name);
        take.finish_take();
        true
    }

    /// Get the current state
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Whether a start or finish delay is outstanding
    pub fn is_delaying(&self) -> bool {
        self.delays.is_pending()
    }

    /// Seconds left on the outstanding delay
    pub fn delay_remaining(&self) -> Option<f32> {
        self.delays.remaining()
    }

    /// Get the current take
    pub fn current_take(&self) -> Option<&Take> {
        self.current.and_then(|id| self.take(id))
    }

    /// Position of the current take, derived from the list
    pub fn current_index(&self) -> Option<usize> {
        let id = self.current?;
        self.takes.iter().position(|t| t.id == id)
    }

    /// Seconds the current take has been active
    pub fn elapsed_in_take(&self) -> f32 {
        self.take_elapsed_secs
    }

    /// Get all takes
    pub fn takes(&self) -> &[Take] {
        &self.takes
    }

    /// Get mutable access to the takes (not their order)
    pub fn takes_mut(&mut self) -> &mut [Take] {
        &mut self.takes
    }

    /// Get take count
    pub fn take_count(&self) -> usize {
        self.takes.len()
    }

    /// Get a take
    pub fn take(&self, id: TakeId) -> Option<&Take> {
        self.takes.iter().find(|t| t.id == id)
    }

    /// Get a mutable take
    pub fn take_mut(&mut self, id: TakeId) -> Option<&mut Take> {
        self.takes.iter_mut().find(|t| t.id == id)
    }

    /// Get the signal board
    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Get the signal board for raising and clearing signals
    pub fn signals_mut(&mut self) -> &mut Signals {
        &mut self.signals
    }

    /// Get a status string for display
    pub fn status_text(&self) -> String {
        match (self.state, self.current_take()) {
            (SequencerState::Idle, _) => "Take System is Not Playing".to_string(),
            (state, Some(take)) => {
                format!("Current Take: {} ({})", take.name, state.status_text())
            }
            (state, None) => state.status_text().to_string(),
        }
    }

    fn begin_take(&mut self, index: usize) -> Result<()> {
        let take = &self.takes[index];
        self.current = Some(take.id);
        self.current_index = index;
        self.take_elapsed_secs = 0.0;

        let delay = take.start_delay_secs;
        if delay > 0.0 {
            tracing::debug!("Take '{}' starts in {}s", take.name, delay);
            self.schedule_delay(DelayKind::Start, delay);
            self.state = SequencerState::Starting;
            Ok(())
        } else {
            self.activate_current()
        }
    }

    fn activate_current(&mut self) -> Result<()> {
        let index = self.resolve_current()?;
        self.current_index = index;

        let take = &mut self.takes[index];
        tracing::info!("Starting take {} '{}'", index, take.name);
        if let Err(err) = take.on_take_start() {
            self.retry(DelayKind::Start);
            return Err(err);
        }

        self.take_elapsed_secs = 0.0;
        self.state = SequencerState::Active;
        Ok(())
    }

    fn update_current(&mut self, delta_secs: f32) -> Result<()> {
        let index = self.resolve_current()?;
        self.current_index = index;
        self.take_elapsed_secs += delta_secs.max(0.0);

        let take = &mut self.takes[index];
        take.on_take_update()?;

        let ctx = ConditionContext {
            take_elapsed_secs: self.take_elapsed_secs,
            signals: &self.signals,
        };
        if take.is_finished(&ctx)? {
            if take.is_force_finished() {
                tracing::debug!("Take '{}' finished by skip", take.name);
            }
            self.finish_current()
        } else {
            Ok(())
        }
    }

    fn finish_current(&mut self) -> Result<()> {
        self.cancel_pending_delay();

        let take = &self.takes[self.current_index];
        let delay = take.finish_delay_secs;
        if delay > 0.0 {
            tracing::debug!("Take '{}' finishes in {}s", take.name, delay);
            self.schedule_delay(DelayKind::Finish, delay);
            self.state = SequencerState::Finishing;
            Ok(())
        } else {
            self.complete_current()
        }
    }

    fn complete_current(&mut self) -> Result<()> {
        let index = self.resolve_current()?;
        self.current_index = index;

        let take = &mut self.takes[index];
        if let Err(err) = take.on_take_finish() {
            self.retry(DelayKind::Finish);
            return Err(err);
        }
        tracing::info!("Finished take {} '{}'", index, take.name);

        if index + 1 >= self.takes.len() {
            self.state = SequencerState::Completed;
            tracing::info!("All takes completed");
            return Ok(());
        }

        self.begin_take(index + 1)
    }

    /// Re-enter a delay state with the step due on the next tick
    fn retry(&mut self, kind: DelayKind) {
        self.state = match kind {
            DelayKind::Start => SequencerState::Starting,
            DelayKind::Finish => SequencerState::Finishing,
        };
        self.schedule_delay(kind, 0.0);
    }

    fn schedule_delay(&mut self, kind: DelayKind, secs: f32) {
        self.cancel_pending_delay();
        self.pending_delay = Some(self.delays.schedule(kind, secs));
    }

    /// Cancel the delay owned by the current transition
    fn cancel_pending_delay(&mut self) {
        if let Some(handle) = self.pending_delay.take() {
            self.delays.cancel(handle);
        }
    }

    fn resolve_current(&mut self) -> Result<usize> {
        match self.current_index() {
            Some(index) => Ok(index),
            None => Err(self.halt(SequencerError::MissingCurrentTake)),
        }
    }

    fn halt(&mut self, err: SequencerError) -> SequencerError {
        tracing::error!("{}, halting sequencer", err);
        self.cancel_pending_delay();
        self.state = SequencerState::Halted;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Predicate, SignalRaised};
    use crate::error::TakeHook;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn logged(take: Take, log: &Log) -> Take {
        let mut take = take;
        for (hook, callbacks) in [
            ("start", &mut take.on_start),
            ("finish", &mut take.on_finish),
        ] {
            let log = Rc::clone(log);
            let name = take.name.clone();
            callbacks.add_infallible(move || log.borrow_mut().push(format!("{name}.{hook}")));
        }
        take
    }

    #[test]
    fn test_empty_take_list_halts() {
        let mut sequencer = TakeSequencer::new(Vec::new());
        let err = sequencer.start().unwrap_err();
        assert!(matches!(err, SequencerError::EmptyTakeList));
        assert_eq!(sequencer.state(), SequencerState::Halted);
        assert!(matches!(sequencer.tick(0.1), Err(SequencerError::Halted)));
        assert!(matches!(sequencer.start(), Err(SequencerError::Halted)));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut sequencer = TakeSequencer::started(vec![Take::new("Hold")]).unwrap();
        assert!(matches!(sequencer.start(), Err(SequencerError::AlreadyStarted)));
    }

    #[test]
    fn test_idle_tick_and_skip_are_noops() {
        let mut sequencer = TakeSequencer::new(vec![Take::auto("A")]);
        sequencer.tick(1.0).unwrap();
        assert!(!sequencer.skip_current_take());
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(sequencer.status_text(), "Take System is Not Playing");
    }

    #[test]
    fn test_zero_start_delay_is_active_immediately() {
        let log = Log::default();
        let sequencer = TakeSequencer::started(vec![logged(Take::new("A"), &log)]).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert!(!sequencer.is_delaying());
        assert_eq!(*log.borrow(), vec!["A.start"]);
        assert_eq!(sequencer.status_text(), "Current Take: A (Active)");
    }

    #[test]
    fn test_start_delay() {
        let log = Log::default();
        let take = logged(Take::auto("A").with_delays(2.0, 0.0), &log);
        let mut sequencer = TakeSequencer::started(vec![take]).unwrap();

        assert_eq!(sequencer.state(), SequencerState::Starting);
        assert!(sequencer.is_delaying());
        sequencer.tick(1.0).unwrap();
        assert!(log.borrow().is_empty());

        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(*log.borrow(), vec!["A.start"]);
    }

    #[test]
    fn test_finish_delay_suppresses_updates() {
        let log = Log::default();
        let updates = Rc::new(RefCell::new(0));
        let mut take = logged(Take::auto("A").with_delays(0.0, 5.0), &log);
        let counter = Rc::clone(&updates);
        take.on_update.add_infallible(move || *counter.borrow_mut() += 1);

        let mut sequencer = TakeSequencer::started(vec![take]).unwrap();
        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Finishing);
        assert_eq!(*updates.borrow(), 1);

        for _ in 0..4 {
            sequencer.tick(1.0).unwrap();
            assert_eq!(sequencer.state(), SequencerState::Finishing);
        }
        assert_eq!(*log.borrow(), vec!["A.start"]);

        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Completed);
        assert_eq!(*log.borrow(), vec!["A.start", "A.finish"]);
        assert_eq!(*updates.borrow(), 1);
    }

    #[test]
    fn test_manual_take_waits_for_skip() {
        let mut sequencer = TakeSequencer::started(vec![Take::new("Hold")]).unwrap();
        for _ in 0..1000 {
            sequencer.tick(0.016).unwrap();
        }
        assert_eq!(sequencer.state(), SequencerState::Active);

        assert!(sequencer.skip_current_take());
        sequencer.tick(0.016).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Completed);
        assert!(!sequencer.skip_current_take());
    }

    #[test]
    fn test_skip_during_start_delay_keeps_on_start() {
        let log = Log::default();
        let take = logged(Take::new("A").with_delays(1.0, 0.0), &log);
        let mut sequencer = TakeSequencer::started(vec![take]).unwrap();

        assert!(sequencer.skip_current_take());
        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(*log.borrow(), vec!["A.start"]);

        sequencer.tick(0.1).unwrap();
        assert_eq!(*log.borrow(), vec!["A.start", "A.finish"]);
        assert_eq!(sequencer.state(), SequencerState::Completed);
    }

    #[test]
    fn test_skip_ignored_while_finishing() {
        let mut sequencer =
            TakeSequencer::started(vec![Take::auto("A").with_delays(0.0, 1.0)]).unwrap();
        sequencer.tick(0.1).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Finishing);
        assert!(!sequencer.skip_current_take());
    }

    #[test]
    fn test_index_tracks_current_take() {
        let takes = vec![Take::auto("A"), Take::auto("B"), Take::new("C")];
        let ids: Vec<TakeId> = takes.iter().map(|t| t.id).collect();
        let mut sequencer = TakeSequencer::started(takes).unwrap();

        for (expected, id) in ids.iter().enumerate() {
            assert_eq!(sequencer.state(), SequencerState::Active);
            assert_eq!(sequencer.current_index(), Some(expected));
            assert_eq!(sequencer.current_take().map(|t| t.id), Some(*id));
            sequencer.tick(0.1).unwrap();
        }
        assert_eq!(sequencer.current_index(), Some(2));
    }

    #[test]
    fn test_signal_condition_and_elapsed_time() {
        let take = Take::new("Door").with_condition(SignalRaised::new("door_open"));
        let mut sequencer = TakeSequencer::started(vec![take]).unwrap();

        sequencer.tick(0.5).unwrap();
        sequencer.tick(0.5).unwrap();
        assert_eq!(sequencer.elapsed_in_take(), 1.0);

        sequencer.signals_mut().raise("door_open");
        sequencer.tick(0.5).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Completed);
    }

    #[test]
    fn test_missing_current_take_halts() {
        let mut sequencer = TakeSequencer::started(vec![Take::new("A")]).unwrap();
        sequencer.takes_mut()[0].id = TakeId::new();

        let err = sequencer.tick(0.1).unwrap_err();
        assert!(matches!(err, SequencerError::MissingCurrentTake));
        assert!(err.is_configuration_error());
        assert_eq!(sequencer.state(), SequencerState::Halted);
    }

    #[test]
    fn test_failed_finish_handler_is_retried() {
        let attempts = Rc::new(RefCell::new(0));
        let mut take = Take::auto("A");
        let counter = Rc::clone(&attempts);
        take.on_finish.add(move || {
            *counter.borrow_mut() += 1;
            if *counter.borrow() == 1 {
                Err("first attempt fails".into())
            } else {
                Ok(())
            }
        });

        let mut sequencer = TakeSequencer::started(vec![take, Take::new("B")]).unwrap();
        let err = sequencer.tick(0.1).unwrap_err();
        assert!(matches!(err, SequencerError::Callback { .. }));
        assert_eq!(sequencer.state(), SequencerState::Finishing);
        assert_eq!(sequencer.current_index(), Some(0));

        sequencer.tick(0.1).unwrap();
        assert_eq!(*attempts.borrow(), 2);
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(sequencer.current_index(), Some(1));
    }

    #[test]
    fn test_skip_honours_finish_delay() {
        let takes = vec![Take::new("A").with_delays(0.0, 2.0), Take::new("B")];
        let mut sequencer = TakeSequencer::started(takes).unwrap();

        assert!(sequencer.skip_current_take());
        sequencer.tick(0.1).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Finishing);
        assert_eq!(sequencer.current_index(), Some(0));
        assert_eq!(sequencer.delay_remaining(), Some(2.0));

        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Finishing);
        assert!(sequencer.is_delaying());

        sequencer.tick(1.0).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(sequencer.current_index(), Some(1));
        assert!(!sequencer.is_delaying());
    }

    #[test]
    fn test_failed_start_handler_is_retried() {
        let attempts = Rc::new(RefCell::new(0));
        let mut take = Take::new("A");
        let counter = Rc::clone(&attempts);
        take.on_start.add(move || {
            *counter.borrow_mut() += 1;
            if *counter.borrow() == 1 {
                Err("first attempt fails".into())
            } else {
                Ok(())
            }
        });

        let mut sequencer = TakeSequencer::new(vec![take]);
        let err = sequencer.start().unwrap_err();
        assert!(matches!(err, SequencerError::Callback { hook: TakeHook::Start, .. }));
        assert!(!err.is_configuration_error());
        assert_eq!(sequencer.state(), SequencerState::Starting);
        assert!(sequencer.is_delaying());

        sequencer.tick(0.0).unwrap();
        assert_eq!(*attempts.borrow(), 2);
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(sequencer.current_index(), Some(0));
    }

    #[test]
    fn test_condition_error_keeps_take_active() {
        let mut calls = 0;
        let take = Take::new("A").with_condition(Predicate::new(
            "flaky sensor",
            move |_ctx: &ConditionContext<'_>| {
                calls += 1;
                if calls == 1 {
                    Err("sensor offline".into())
                } else {
                    Ok(false)
                }
            },
        ));
        let mut sequencer = TakeSequencer::started(vec![take]).unwrap();

        let err = sequencer.tick(0.1).unwrap_err();
        match err {
            SequencerError::Condition { take, condition, .. } => {
                assert_eq!(take, "A");
                assert_eq!(condition, "flaky sensor");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sequencer.state(), SequencerState::Active);

        sequencer.tick(0.1).unwrap();
        assert_eq!(sequencer.state(), SequencerState::Active);
        assert_eq!(sequencer.current_index(), Some(0));
    }
}
