// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered lifecycle handler lists.

use crate::error::HandlerError;

/// A lifecycle handler
pub type Handler = Box<dyn FnMut() -> Result<(), HandlerError>>;

/// Ordered list of handlers fired together at one lifecycle point.
///
/// An empty list is a valid no-op. Handlers run in insertion order and the
/// first failure stops the invocation and is returned to the caller.
#[derive(Default)]
pub struct Callbacks {
    handlers: Vec<Handler>,
}

impl Callbacks {
    /// Create an empty handler list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fallible handler
    pub fn add<F>(&mut self, handler: F)
    where
        F: FnMut() -> Result<(), HandlerError> + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Add a handler that cannot fail
    pub fn add_infallible<F>(&mut self, mut handler: F)
    where
        F: FnMut() + 'static,
    {
        self.add(move || {
            handler();
            Ok(())
        });
    }

    /// Get handler count
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if there are no handlers
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler in order
    pub fn invoke(&mut self) -> Result<(), HandlerError> {
        for handler in &mut self.handlers {
            handler()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
