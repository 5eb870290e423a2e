//! Control transfer from a throw site to the innermost protected region
//!
//! A throw stores the instance in the innermost context and unwinds to it with
//! [`std::panic::resume_unwind`]. Unwinding runs the destructors of every frame in
//! between, which is what the manual resumption-point bookkeeping of a setjmp-style
//! runtime has to emulate. `resume_unwind` skips the panic hook, so transfers are
//! silent.

use std::panic;

use tracing::trace;

use crate::context::{self, Delivery, RegionStatus};
use crate::instance::{ExceptionInstance, Message};
use crate::types::ExceptionType;
use crate::uncaught;

/// Unwind payload carrying the outcome code to the receiving region
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transfer {
    /// Depth index of the receiving context
    pub depth: usize,
    /// [`RegionStatus::ExceptionOccurred`] or [`RegionStatus::ExceptionRaised`]
    pub outcome: RegionStatus,
}

/// Throw an existing instance.
///
/// The instance is delivered to the innermost active region. With no active region the
/// thread's uncaught handler receives it instead.
pub fn raise(instance: ExceptionInstance) -> ! {
    match context::deliver(instance) {
        Ok(Delivery { depth, outcome }) => {
            trace!(depth, ?outcome, "transferring to region");
            panic::resume_unwind(Box::new(Transfer { depth, outcome }))
        }
        Err(instance) => uncaught::deliver_uncaught(instance),
    }
}

/// Throw a new instance of `kind`, recording the caller as origin
#[track_caller]
pub fn throw(kind: &'static ExceptionType, message: impl Into<Message>) -> ! {
    raise(ExceptionInstance::new(kind, message))
}

/// Throw a new instance of `kind` without a message
#[track_caller]
pub fn throw_bare(kind: &'static ExceptionType) -> ! {
    raise(ExceptionInstance::bare(kind))
}

/// Re-raise a captured instance unchanged, origin included
pub fn rethrow(instance: &ExceptionInstance) -> ! {
    raise(instance.clone())
}

/// Throw an exception of a declared kind.
///
/// ```ignore
/// throw!(IO_ERROR);
/// throw!(IO_ERROR, "disk full");
/// throw!(FILE_NOT_FOUND, "missing {}", path.display());
/// ```
///
/// Constant messages stay borrowed; messages formatted from runtime arguments are owned
/// by the instance.
#[macro_export]
macro_rules! throw {
    ($kind:expr $(,)?) => {
        $crate::throw_bare(&$kind)
    };
    ($kind:expr, $($arg:tt)+) => {
        $crate::throw(&$kind, $crate::Message::from_fmt(::std::format_args!($($arg)+)))
    };
}
