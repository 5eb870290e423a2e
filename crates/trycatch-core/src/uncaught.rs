//! Uncaught-exception handling
//!
//! A throw with no active protected region is handed to the thread's uncaught handler.
//! Handlers must not return: the default prints a diagnostic and aborts, and a custom
//! handler should terminate the process, the thread, or unwind past the throw site.

use std::io;

use tracing::debug;

use crate::context;
use crate::instance::{ExceptionInstance, write_diagnostic};

/// Terminal hook for exceptions no region handles
pub type UncaughtHandler = fn(&ExceptionInstance) -> !;

/// The handler installed on this thread
pub fn uncaught_handler() -> UncaughtHandler {
    context::uncaught_handler()
}

/// Install `handler` on this thread and return the previous one
pub fn set_uncaught_handler(handler: UncaughtHandler) -> UncaughtHandler {
    context::replace_uncaught_handler(handler)
}

/// Install `handler` until the returned guard is dropped
pub fn scoped_uncaught_handler(handler: UncaughtHandler) -> UncaughtHandlerGuard {
    UncaughtHandlerGuard {
        previous: set_uncaught_handler(handler),
    }
}

/// Restores the previously installed handler on drop
#[must_use = "the handler is restored as soon as the guard is dropped"]
pub struct UncaughtHandlerGuard {
    previous: UncaughtHandler,
}

impl Drop for UncaughtHandlerGuard {
    fn drop(&mut self) {
        set_uncaught_handler(self.previous);
    }
}

/// Print the diagnostic to stderr and abort the process
pub fn default_uncaught_handler(instance: &ExceptionInstance) -> ! {
    let _ = write_diagnostic(instance, &mut io::stderr().lock());
    std::process::abort()
}

pub(crate) fn deliver_uncaught(instance: ExceptionInstance) -> ! {
    debug!(kind = instance.kind().name(), "no active region, invoking uncaught handler");
    let handler = context::uncaught_handler();
    handler(&instance)
}
