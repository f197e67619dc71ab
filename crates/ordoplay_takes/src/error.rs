// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the takes runtime.

use thiserror::Error;

/// Error raised by a lifecycle handler or a condition predicate
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle hook of a take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeHook {
    /// `on_start` handlers
    Start,
    /// `on_update` handlers
    Update,
    /// `on_finish` handlers
    Finish,
}

impl TakeHook {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "on_start",
            Self::Update => "on_update",
            Self::Finish => "on_finish",
        }
    }
}

impl std::fmt::Display for TakeHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sequencer errors
#[derive(Debug, Error)]
pub enum SequencerError {
    /// The sequencer was started without any takes
    #[error("No takes configured")]
    EmptyTakeList,

    /// The active take pointer does not resolve to a take in the list
    #[error("Current take is missing from the take list")]
    MissingCurrentTake,

    /// `start` was called on a sequencer that already ran
    #[error("Sequencer already started")]
    AlreadyStarted,

    /// The sequencer stopped on an earlier configuration error
    #[error("Sequencer halted after a configuration error")]
    Halted,

    /// A lifecycle handler failed
    #[error("Take '{take}' {hook} handler failed: {source}")]
    Callback {
        /// Name of the take
        take: String,
        /// Hook that was running
        hook: TakeHook,
        /// Handler error
        #[source]
        source: HandlerError,
    },

    /// A condition predicate failed
    #[error("Take '{take}' condition '{condition}' failed: {source}")]
    Condition {
        /// Name of the take
        take: String,
        /// Name of the condition
        condition: String,
        /// Predicate error
        #[source]
        source: HandlerError,
    },
}

impl SequencerError {
    /// Whether this error stops the session for good
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTakeList | Self::MissingCurrentTake | Self::Halted
        )
    }
}

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Take script errors
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Failed to read or write the script file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the script
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Failed to serialize the script
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Script was written by an incompatible format version
    #[error("Unsupported script version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Script contains no takes
    #[error("Script has no takes")]
    Empty,

    /// A delay is negative or not finite
    #[error("Take {index} has an invalid {field}: {value}")]
    InvalidDelay {
        /// Take position
        index: usize,
        /// Field name
        field: &'static str,
        /// Offending value
        value: f32,
    },

    /// Authoring edit addressed a take that does not exist
    #[error("Take index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of takes
        len: usize,
    },
}
