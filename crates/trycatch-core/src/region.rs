//! Protected regions: try / catch / success / finally
//!
//! A [`Region`] is one activation of the try/catch/finally state machine. Entering it
//! pushes a context; each phase (guarded body, matching catch clause, success clause,
//! finalizer) runs under `catch_unwind` while that context is active, so a throw from
//! any depth below a phase lands back here with its outcome code.
//!
//! ```ignore
//! let flow = Region::new(|| {
//!     open(path);
//!     Flow::Normal
//! })
//! .catch(&FILE_NOT_FOUND, |e| {
//!     eprintln!("{e}");
//!     Flow::Return(None)
//! })
//! .finally(|| {
//!     cleanup();
//!     Flow::Normal
//! })
//! .run();
//! exit_region!(flow);
//! ```
//!
//! Early exits are requested by returning [`Flow::Return`], [`Flow::Break`] or
//! [`Flow::Continue`] from a phase. The finalizer still runs (unless the request came
//! from the finalizer itself), the context is popped, and `run` hands the request back
//! so [`exit_region!`](crate::exit_region) can perform it at the call site.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::context::{self, RegionStatus};
use crate::engine::{self, Transfer};
use crate::instance::ExceptionInstance;
use crate::types::ExceptionType;

/// Completion of a region phase, and the exit `run` asks its caller to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow<R> {
    /// Fall through to the next phase
    Normal,
    /// Return `R` from the enclosing function
    Return(R),
    /// Break out of the enclosing loop
    Break,
    /// Continue the enclosing loop
    Continue,
}

impl<R> Flow<R> {
    /// Whether this is [`Flow::Normal`]
    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, Flow::Normal)
    }

    /// The returned value, if this is [`Flow::Return`]
    pub fn into_return(self) -> Option<R> {
        match self {
            Flow::Return(value) => Some(value),
            _ => None,
        }
    }
}

type Phase<'a, R> = Box<dyn FnOnce() -> Flow<R> + 'a>;
type Handler<'a, R> = Box<dyn FnOnce(&ExceptionInstance) -> Flow<R> + 'a>;

struct CatchClause<'a, R> {
    kind: &'static ExceptionType,
    handler: Handler<'a, R>,
}

/// A protected region under construction
///
/// Catch clauses are tested in declaration order and the first match wins. Declare
/// the most specific kinds first: a broader clause declared earlier shadows them.
#[must_use = "a region does nothing until `run` is called"]
pub struct Region<'a, R = ()> {
    body: Phase<'a, R>,
    catches: Vec<CatchClause<'a, R>>,
    on_success: Option<Phase<'a, R>>,
    finalizer: Option<Phase<'a, R>>,
}

/// Start a protected region around `body`
pub fn try_region<'a, R>(body: impl FnOnce() -> Flow<R> + 'a) -> Region<'a, R> {
    Region::new(body)
}

impl<'a, R> Region<'a, R> {
    /// Start a protected region around `body`
    pub fn new(body: impl FnOnce() -> Flow<R> + 'a) -> Self {
        Self {
            body: Box::new(body),
            catches: Vec::new(),
            on_success: None,
            finalizer: None,
        }
    }

    /// Add a catch clause for `kind` and its descendants
    pub fn catch(
        mut self,
        kind: &'static ExceptionType,
        handler: impl FnOnce(&ExceptionInstance) -> Flow<R> + 'a,
    ) -> Self {
        self.catches.push(CatchClause {
            kind,
            handler: Box::new(handler),
        });
        self
    }

    /// Run `f` after the body when no exception occurred
    pub fn on_success(mut self, f: impl FnOnce() -> Flow<R> + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Run `f` exactly once on every exit path
    pub fn finally(mut self, f: impl FnOnce() -> Flow<R> + 'a) -> Self {
        self.finalizer = Some(Box::new(f));
        self
    }

    /// Execute the region.
    ///
    /// Returns the exit to perform once the region is left. An exception that no clause
    /// caught, or one raised while handling, is rethrown to the enclosing region after
    /// the finalizer; this call then does not return. Rust panics that are not
    /// exceptions also run the finalizer and then continue unwinding.
    pub fn run(self) -> Flow<R> {
        let Region {
            body,
            catches,
            on_success,
            finalizer,
        } = self;

        let mut activation = Activation::enter();
        activation.step(body);

        if activation.panic.is_none() {
            if activation.status == RegionStatus::Trying {
                activation.set_status(RegionStatus::NoException);
            }
            if activation.status == RegionStatus::ExceptionOccurred {
                activation.dispatch(catches);
            }
            if activation.status == RegionStatus::NoException
                && let Some(on_success) = on_success
            {
                activation.step(on_success);
            }
        }

        if let Some(finalizer) = finalizer {
            activation.finalize(finalizer);
        }
        activation.leave()
    }
}

/// Local state of one region activation
struct Activation<R> {
    depth: usize,
    status: RegionStatus,
    /// Instance currently owned by the region
    held: Option<ExceptionInstance>,
    /// Instances superseded while handling, released when the context pops
    retained: SmallVec<[ExceptionInstance; 2]>,
    exit: Flow<R>,
    /// First non-exception panic seen, resumed after the context pops
    panic: Option<Box<dyn Any + Send>>,
}

impl<R> Activation<R> {
    fn enter() -> Self {
        let mut activation = Self {
            depth: context::push(),
            status: RegionStatus::Start,
            held: None,
            retained: SmallVec::new(),
            exit: Flow::Normal,
            panic: None,
        };
        activation.set_status(RegionStatus::Trying);
        activation
    }

    fn set_status(&mut self, status: RegionStatus) {
        self.status = status;
        context::set_status(self.depth, status);
    }

    /// Run one phase with this region's context active
    fn step(&mut self, phase: impl FnOnce() -> Flow<R>) {
        match panic::catch_unwind(AssertUnwindSafe(phase)) {
            Ok(Flow::Normal) => {}
            Ok(exit) => {
                trace!(depth = self.depth, "early exit requested");
                self.exit = exit;
                self.set_status(RegionStatus::Interrupted);
            }
            Err(payload) => match payload.downcast::<Transfer>() {
                Ok(transfer) => self.receive(*transfer),
                Err(payload) => {
                    debug!(depth = self.depth, "panic crossed region");
                    self.panic.get_or_insert(payload);
                }
            },
        }
    }

    fn receive(&mut self, transfer: Transfer) {
        debug_assert_eq!(
            transfer.depth, self.depth,
            "transfer received by the wrong region"
        );
        let incoming = context::take_held(self.depth);
        if let Some(previous) = std::mem::replace(&mut self.held, incoming) {
            self.retained.push(previous);
        }
        self.set_status(transfer.outcome);
    }

    /// Hand the held instance to the first matching catch clause
    fn dispatch(&mut self, catches: Vec<CatchClause<'_, R>>) {
        let Some(caught) = self.held.take() else {
            return;
        };
        let Some(clause) = catches
            .into_iter()
            .find(|clause| caught.is_instance_of(clause.kind))
        else {
            self.held = Some(caught);
            return;
        };

        debug!(
            depth = self.depth,
            kind = caught.kind().name(),
            clause = clause.kind.name(),
            "exception caught"
        );
        self.set_status(RegionStatus::CaughtException);
        let handler = clause.handler;
        self.step(|| handler(&caught));
        if self.held.is_some() {
            self.retained.push(caught);
        } else {
            self.held = Some(caught);
        }
    }

    fn finalize(&mut self, finalizer: Phase<'_, R>) {
        if self.status == RegionStatus::Trying {
            self.set_status(RegionStatus::NoException);
        }
        trace!(depth = self.depth, status = ?self.status, "running finalizer");
        self.step(finalizer);
    }

    /// Pop the context and complete the region
    fn leave(self) -> Flow<R> {
        let Activation {
            depth,
            status,
            held,
            retained,
            exit,
            panic: foreign,
        } = self;

        if let Some(payload) = foreign {
            context::pop(depth, retained.into_iter().chain(held));
            panic::resume_unwind(payload);
        }
        match held {
            Some(instance) if status.is_pending_exception() => {
                context::pop(depth, retained);
                trace!(depth, kind = instance.kind().name(), "propagating");
                engine::raise(instance)
            }
            held => {
                context::pop(depth, retained.into_iter().chain(held));
                exit
            }
        }
    }
}

/// Perform the exit returned by [`Region::run`].
///
/// - `exit_region!(flow)` returns from the enclosing function on [`Flow::Return`]
/// - `exit_region!(flow, loop)` also breaks or continues the innermost loop
/// - `exit_region!(flow, 'label)` breaks or continues the labelled loop
#[macro_export]
macro_rules! exit_region {
    ($flow:expr, loop) => {
        match $flow {
            $crate::Flow::Normal => {}
            $crate::Flow::Return(value) => return value,
            $crate::Flow::Break => break,
            $crate::Flow::Continue => continue,
        }
    };
    ($flow:expr, $label:lifetime) => {
        match $flow {
            $crate::Flow::Normal => {}
            $crate::Flow::Return(value) => return value,
            $crate::Flow::Break => break $label,
            $crate::Flow::Continue => continue $label,
        }
    };
    ($flow:expr) => {
        match $flow {
            $crate::Flow::Normal => {}
            $crate::Flow::Return(value) => return value,
            $crate::Flow::Break | $crate::Flow::Continue => {
                ::std::unreachable!("loop control requested outside of a loop")
            }
        }
    };
}
