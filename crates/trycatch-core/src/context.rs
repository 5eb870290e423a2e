//! Per-thread protected-region state
//!
//! Each thread owns an independent stack of region contexts and its own uncaught
//! handler. Nothing here is shared between threads, so there is no locking; the state
//! lives in a `thread_local!` and is created on first use.
//!
//! Push and pop must nest exactly with region entry and exit. [`Region::run`] is the
//! only caller of both and upholds this on every exit path, including early exits and
//! foreign panics.
//!
//! [`Region::run`]: crate::Region::run

use std::cell::RefCell;

use smallvec::SmallVec;
use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::instance::ExceptionInstance;
use crate::uncaught::{UncaughtHandler, default_uncaught_handler};

/// Inline capacity of the per-thread context stack
const INLINE_CONTEXTS: usize = 8;

/// Status of a protected region activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionStatus {
    /// Context pushed, body not yet entered
    Start,
    /// Guarded body running
    Trying,
    /// Body completed without a transfer
    NoException,
    /// First throw out of the guarded body; catch clauses are attempted
    ExceptionOccurred,
    /// A catch clause matched and is handling the instance
    CaughtException,
    /// Throw or rethrow during catch, success or finalizer processing
    ExceptionRaised,
    /// An early exit was requested
    Interrupted,
}

impl RegionStatus {
    /// Whether the held instance must propagate when the region exits
    #[inline]
    pub fn is_pending_exception(self) -> bool {
        matches!(
            self,
            RegionStatus::ExceptionOccurred | RegionStatus::ExceptionRaised
        )
    }
}

/// Per-thread counters, mainly for tests and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
    /// Contexts pushed
    pub entered: u64,
    /// Contexts popped
    pub exited: u64,
    /// Owned message buffers released at pop
    pub messages_released: u64,
}

#[derive(Debug)]
struct RegionContext {
    status: RegionStatus,
    held: Option<ExceptionInstance>,
}

/// Where a transfer was delivered
#[derive(Debug, Clone, Copy)]
pub(crate) struct Delivery {
    pub depth: usize,
    pub outcome: RegionStatus,
}

struct ThreadState {
    contexts: SmallVec<[RegionContext; INLINE_CONTEXTS]>,
    uncaught: UncaughtHandler,
    stats: RegionStats,
}

impl ThreadState {
    fn new() -> Self {
        Self {
            contexts: SmallVec::new(),
            uncaught: default_uncaught_handler,
            stats: RegionStats::default(),
        }
    }
}

impl Drop for ThreadState {
    fn drop(&mut self) {
        // A panic here would abort inside the TLS destructor, so only report.
        if !self.contexts.is_empty() {
            error!(
                depth = self.contexts.len(),
                "thread exited with protected regions still active"
            );
        }
    }
}

thread_local! {
    static STATE: RefCell<ThreadState> = RefCell::new(ThreadState::new());
}

fn with_state<R>(f: impl FnOnce(&mut ThreadState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Push a new context and return its depth index
pub(crate) fn push() -> usize {
    with_state(|state| {
        let depth = state.contexts.len();
        state.contexts.push(RegionContext {
            status: RegionStatus::Start,
            held: None,
        });
        state.stats.entered += 1;
        trace!(depth, "region entered");
        depth
    })
}

/// Pop the context at `depth`, releasing any instances the region retained
pub(crate) fn pop(depth: usize, retained: impl IntoIterator<Item = ExceptionInstance>) {
    with_state(|state| {
        debug_assert_eq!(
            state.contexts.len(),
            depth + 1,
            "protected region exit does not match its entry"
        );
        let Some(context) = state.contexts.pop() else {
            return;
        };
        for instance in retained.into_iter().chain(context.held) {
            if instance.owns_message() {
                state.stats.messages_released += 1;
                trace!(depth, kind = instance.kind().name(), "owned message released");
            }
        }
        state.stats.exited += 1;
        trace!(depth, status = ?context.status, "region exited");
    })
}

pub(crate) fn set_status(depth: usize, status: RegionStatus) {
    with_state(|state| {
        if let Some(context) = state.contexts.get_mut(depth) {
            context.status = status;
        }
    })
}

/// Store `instance` in the innermost context, or hand it back if there is none
pub(crate) fn deliver(
    instance: ExceptionInstance,
) -> std::result::Result<Delivery, ExceptionInstance> {
    with_state(|state| {
        let depth = state.contexts.len().checked_sub(1);
        let Some((depth, context)) = depth.zip(state.contexts.last_mut()) else {
            return Err(instance);
        };
        let outcome = if context.status == RegionStatus::Trying {
            RegionStatus::ExceptionOccurred
        } else {
            RegionStatus::ExceptionRaised
        };
        context.held = Some(instance);
        Ok(Delivery { depth, outcome })
    })
}

/// Take the instance delivered to the context at `depth`
pub(crate) fn take_held(depth: usize) -> Option<ExceptionInstance> {
    with_state(|state| {
        state
            .contexts
            .get_mut(depth)
            .and_then(|context| context.held.take())
    })
}

/// Status of the innermost active region
pub fn current_status() -> Option<RegionStatus> {
    with_state(|state| state.contexts.last().map(|context| context.status))
}

/// Number of active protected regions on this thread
pub fn depth() -> usize {
    with_state(|state| state.contexts.len())
}

/// Counters for this thread
pub fn stats() -> RegionStats {
    with_state(|state| state.stats)
}

/// Reset this thread's counters
pub fn reset_stats() {
    with_state(|state| state.stats = RegionStats::default())
}

/// Fails with [`Error::Unbalanced`] if any region is still active on this thread
pub fn check_balanced() -> Result<()> {
    match depth() {
        0 => Ok(()),
        depth => Err(Error::Unbalanced { depth }),
    }
}

pub(crate) fn uncaught_handler() -> UncaughtHandler {
    with_state(|state| state.uncaught)
}

pub(crate) fn replace_uncaught_handler(handler: UncaughtHandler) -> UncaughtHandler {
    with_state(|state| std::mem::replace(&mut state.uncaught, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Origin;
    use crate::types::EXCEPTION;

    fn owned(text: &str) -> ExceptionInstance {
        ExceptionInstance::with_origin(&EXCEPTION, Some(text.to_string().into()), Origin::UNKNOWN)
    }

    #[test]
    fn test_push_pop_nesting() {
        reset_stats();
        let outer = push();
        let inner = push();
        assert_eq!((outer, inner), (0, 1));
        assert_eq!(depth(), 2);
        assert_eq!(current_status(), Some(RegionStatus::Start));
        pop(inner, None);
        pop(outer, None);
        assert_eq!(depth(), 0);
        assert!(check_balanced().is_ok());
        let stats = stats();
        assert_eq!((stats.entered, stats.exited), (2, 2));
    }

    #[test]
    fn test_deliver_outcome_depends_on_status() {
        let depth = push();
        set_status(depth, RegionStatus::Trying);
        let first = deliver(owned("a")).unwrap();
        assert_eq!(first.outcome, RegionStatus::ExceptionOccurred);
        let held = take_held(depth);
        set_status(depth, RegionStatus::CaughtException);
        let second = deliver(owned("b")).unwrap();
        assert_eq!(second.outcome, RegionStatus::ExceptionRaised);
        reset_stats();
        pop(depth, held);
        assert_eq!(stats().messages_released, 2);
    }

    #[test]
    fn test_deliver_without_context_returns_instance() {
        let instance = owned("lost");
        let back = deliver(instance.clone()).unwrap_err();
        assert_eq!(back, instance);
    }

    #[test]
    fn test_unbalanced_reported() {
        let depth = push();
        assert!(matches!(check_balanced(), Err(Error::Unbalanced { depth: 1 })));
        pop(depth, None);
    }
}
