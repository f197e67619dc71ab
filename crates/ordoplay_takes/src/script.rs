// SPDX-License-Identifier: MIT OR Apache-2.0
//! Take scripts: the authored, serializable form of a take list.
//!
//! This module handles:
//! - Loading and saving scripts as RON
//! - Structural edits between sessions (add, insert, remove, reorder)
//! - Validation and building runtime [`Take`]s

use crate::condition::{Elapsed, SignalRaised};
use crate::error::ScriptError;
use crate::take::Take;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current take script format version
pub const SCRIPT_FORMAT_VERSION: u32 = 1;

/// Result type for script operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Data-driven completion condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionDesc {
    /// Take has been active for a number of seconds
    Elapsed {
        /// Seconds to wait
        secs: f32,
    },
    /// A signal is raised on the sequencer's signal board
    Signal {
        /// Signal name
        name: String,
    },
    /// Every listed signal is raised
    AllSignals {
        /// Signal names
        names: Vec<String>,
    },
}

impl ConditionDesc {
    fn attach(&self, take: &mut Take) {
        match self {
            ConditionDesc::Elapsed { secs } => take.add_condition(Elapsed::new(*secs)),
            ConditionDesc::Signal { name } => take.add_condition(SignalRaised::new(name.clone())),
            ConditionDesc::AllSignals { names } => {
                take.add_condition(SignalRaised::all(names.iter().cloned()));
            }
        }
    }
}

/// Authored take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeDesc {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Finish as soon as the take is active
    #[serde(default = "default_auto_finish")]
    pub auto_finish: bool,
    /// Completion conditions (ignored when auto-finishing)
    #[serde(default)]
    pub conditions: Vec<ConditionDesc>,
    /// Wait before activating the take
    #[serde(default)]
    pub start_delay_secs: f32,
    /// Wait before running the finish handlers
    #[serde(default)]
    pub finish_delay_secs: f32,
}

fn default_auto_finish() -> bool {
    true
}

impl Default for TakeDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            auto_finish: true,
            conditions: Vec::new(),
            start_delay_secs: 0.0,
            finish_delay_secs: 0.0,
        }
    }
}

impl TakeDesc {
    /// Create an auto-finishing take description
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Wait for a condition instead of auto-finishing
    pub fn with_condition(mut self, condition: ConditionDesc) -> Self {
        self.auto_finish = false;
        self.conditions.push(condition);
        self
    }

    /// Set start and finish delays
    pub fn with_delays(mut self, start_delay_secs: f32, finish_delay_secs: f32) -> Self {
        self.start_delay_secs = start_delay_secs;
        self.finish_delay_secs = finish_delay_secs;
        self
    }

    /// Build the runtime take
    pub fn build(&self) -> Take {
        let mut take = Take::new(self.name.clone())
            .with_auto_finish(self.auto_finish)
            .with_delays(self.start_delay_secs, self.finish_delay_secs);

        if !self.auto_finish {
            for condition in &self.conditions {
                condition.attach(&mut take);
            }
        }
        take
    }
}

/// Direction for reordering a take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward the start of the list
    Up,
    /// Toward the end of the list
    Down,
}

/// Complete take script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeScript {
    /// Script format version
    pub version: u32,
    /// Script name
    #[serde(default)]
    pub name: String,
    /// Takes in play order
    #[serde(default)]
    pub takes: Vec<TakeDesc>,
}

impl Default for TakeScript {
    fn default() -> Self {
        Self {
            version: SCRIPT_FORMAT_VERSION,
            name: String::new(),
            takes: Vec::new(),
        }
    }
}

impl TakeScript {
    /// Create an empty script
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a script from RON text
    pub fn from_ron_str(content: &str) -> Result<Self> {
        let script: TakeScript = ron::from_str(content)?;

        if script.version != SCRIPT_FORMAT_VERSION {
            return Err(ScriptError::UnsupportedVersion {
                found: script.version,
                expected: SCRIPT_FORMAT_VERSION,
            });
        }

        Ok(script)
    }

    /// Serialize the script to RON text
    pub fn to_ron_string(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a script from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let script = Self::from_ron_str(&content)?;
        tracing::info!(
            "Loaded take script '{}' ({} takes) from {:?}",
            script.name,
            script.takes.len(),
            path
        );
        Ok(script)
    }

    /// Save the script to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron_string()?)?;
        tracing::info!("Saved take script '{}' to {:?}", self.name, path);
        Ok(())
    }

    /// Append a new auto-finishing take and return its index
    pub fn add_take(&mut self) -> usize {
        self.takes.push(TakeDesc::default());
        self.takes.len() - 1
    }

    /// Insert a take at a position
    pub fn insert_take(&mut self, index: usize, take: TakeDesc) -> Result<()> {
        if index > self.takes.len() {
            return Err(self.out_of_range(index));
        }
        self.takes.insert(index, take);
        Ok(())
    }

    /// Remove a take
    pub fn remove_take(&mut self, index: usize) -> Result<TakeDesc> {
        if index >= self.takes.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.takes.remove(index))
    }

    /// Swap a take with its neighbour, returning its new index
    pub fn move_take(&mut self, index: usize, direction: MoveDirection) -> Result<usize> {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1),
        };

        match target {
            Some(target) if index < self.takes.len() && target < self.takes.len() => {
                self.takes.swap(index, target);
                Ok(target)
            }
            Some(target) => Err(self.out_of_range(target.max(index))),
            None => Err(self.out_of_range(index)),
        }
    }

    /// Get the name shown for a take, falling back for unnamed takes
    pub fn display_name(&self, index: usize) -> Option<String> {
        let take = self.takes.get(index)?;
        if take.name.is_empty() {
            Some(format!("New Take {index}"))
        } else {
            Some(take.name.clone())
        }
    }

    /// Check that the script can be played
    pub fn validate(&self) -> Result<()> {
        if self.takes.is_empty() {
            return Err(ScriptError::Empty);
        }

        for (index, take) in self.takes.iter().enumerate() {
            for (field, value) in [
                ("start_delay_secs", take.start_delay_secs),
                ("finish_delay_secs", take.finish_delay_secs),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(ScriptError::InvalidDelay { index, field, value });
                }
            }
            if !take.auto_finish && take.conditions.is_empty() {
                tracing::debug!("Take {} only finishes when skipped", index);
            }
        }

        Ok(())
    }

    /// Validate and build the runtime takes
    pub fn build(&self) -> Result<Vec<Take>> {
        self.validate()?;

        Ok(self
            .takes
            .iter()
            .enumerate()
            .map(|(index, desc)| {
                let mut take = desc.build();
                if take.name.is_empty() {
                    take.name = format!("New Take {index}");
                }
                take
            })
            .collect())
    }

    fn out_of_range(&self, index: usize) -> ScriptError {
        ScriptError::IndexOutOfRange {
            index,
            len: self.takes.len(),
        }
    }
}
