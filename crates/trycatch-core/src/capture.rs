//! Bridge from exceptions to `Result`

use crate::error::{Error, Result};
use crate::region::{Flow, Region};
use crate::types::EXCEPTION;

/// Run `f` in a protected region that catches every exception.
///
/// Returns the closure's value, or [`Error::Thrown`] with the instance that escaped it.
/// Rust panics that are not exceptions are not caught.
pub fn capture<T>(f: impl FnOnce() -> T) -> Result<T> {
    let flow = Region::new(|| Flow::Return(Ok(f())))
        .catch(&EXCEPTION, |e| Flow::Return(Err(Error::Thrown(e.clone()))))
        .run();
    match flow {
        Flow::Return(result) => result,
        Flow::Normal | Flow::Break | Flow::Continue => {
            unreachable!("both phases of a capture region return a value")
        }
    }
}
