//! # trycatch
//!
//! Structured exceptions for Rust code that wants typed throw sites, ordered catch
//! clauses and guaranteed finalization without threading `Result` through every frame.
//!
//! ## Model
//!
//! - **Types**: a forest of `'static` [`ExceptionType`]s with single-parent links.
//!   A clause for a type catches that type and all of its descendants; a clause for
//!   the root [`EXCEPTION`] catches everything.
//! - **Instances**: [`ExceptionInstance`] values carrying a kind, an optional borrowed or
//!   owned message and the throw site.
//! - **Regions**: [`Region`] runs a guarded body, matches catch clauses in declaration
//!   order, runs the finalizer exactly once and pops its context on every exit path.
//! - **Transfer**: [`throw`] unwinds straight to the innermost region. With no region
//!   active the per-thread [`UncaughtHandler`] takes over; it never returns.
//!
//! State is per thread. Exceptions never cross threads.
//!
//! ```ignore
//! use trycatch_core::{EXCEPTION, Flow, Region, define_exception, throw};
//!
//! define_exception! {
//!     pub static IO_ERROR: IOError extends EXCEPTION;
//!     pub static FILE_NOT_FOUND: FileNotFoundError extends IO_ERROR;
//! }
//!
//! let flow = Region::<()>::new(|| throw!(FILE_NOT_FOUND, "missing"))
//!     .catch(&IO_ERROR, |e| {
//!         assert_eq!(e.message(), Some("missing"));
//!         Flow::Normal
//!     })
//!     .run();
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod capture;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod instance;
pub mod region;
pub mod types;
pub mod uncaught;

pub use capture::capture;
pub use context::{RegionStats, RegionStatus, check_balanced};
pub use engine::{raise, rethrow, throw, throw_bare};
pub use error::{Error, Result};
pub use instance::{
    ExceptionInstance, Message, Origin, format_diagnostic, instance_of, write_diagnostic,
};
pub use region::{Flow, Region, try_region};
pub use types::{EXCEPTION, ExceptionType};
pub use uncaught::{
    UncaughtHandler, UncaughtHandlerGuard, default_uncaught_handler, scoped_uncaught_handler,
    set_uncaught_handler, uncaught_handler,
};
