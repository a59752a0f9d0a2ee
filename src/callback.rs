//! Single-slot handler binding for pins and timers

use crate::Error;

/// Interrupt-context handler. Receives the context that owns the device.
pub type Handler<C> = fn(&mut C);

/// Holds at most one handler. Once bound it cannot be replaced.
pub struct CallbackRegistry<C> {
    handler: Option<Handler<C>>,
}

impl<C> CallbackRegistry<C> {
    pub const fn new() -> Self {
        Self { handler: None }
    }

    pub fn attach(&mut self, handler: Handler<C>) -> Result<(), Error> {
        if self.handler.is_some() {
            return Err(Error::AlreadyBound);
        }
        self.handler = Some(handler);
        Ok(())
    }

    /// Copy of the bound handler, taken out so the caller can hand the
    /// owning context to it mutably.
    #[inline]
    pub fn handler(&self) -> Option<Handler<C>> {
        self.handler
    }
}

impl<C> Default for CallbackRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
