// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequential takes runner for `OrdoPlay` experiences.
//!
//! A take is one beat of an experience: it starts (optionally after a
//! delay), receives updates every tick, and finishes when it auto-finishes,
//! when all its conditions hold, or when it is skipped. The sequencer runs
//! takes strictly in list order and stops after the last one.
//!
//! ## Architecture
//!
//! The runtime is built on:
//! - Takes with ordered lifecycle handler lists
//! - Pluggable completion conditions reading a shared signal board
//! - A cooperative, single-slot delay scheduler (no threads, no blocking)
//! - A host-driven sequencer state machine
//! - RON take scripts for authoring

pub mod callback;
pub mod condition;
pub mod delay;
pub mod error;
pub mod script;
pub mod sequencer;
pub mod take;

pub use callback::{Callbacks, Handler};
pub use condition::{Condition, ConditionContext, Elapsed, Predicate, SharedFlag, SignalRaised, Signals};
pub use delay::{DelayHandle, DelayKind, DelayScheduler};
pub use error::{HandlerError, Result, ScriptError, SequencerError, TakeHook};
pub use script::{ConditionDesc, MoveDirection, TakeDesc, TakeScript, SCRIPT_FORMAT_VERSION};
pub use sequencer::{SequencerState, TakeSequencer};
pub use take::{Take, TakeId};
