//! Try/catch/success/finally state machine

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

use trycatch_core::context::{current_status, depth};
use trycatch_core::{
    EXCEPTION, Flow, Region, RegionStatus, check_balanced, define_exception, rethrow, throw,
};

define_exception! {
    static IO_ERROR: IOError extends EXCEPTION;
    static TIMEOUT: TimeoutError extends IO_ERROR;
    static STATE_ERROR: StateError extends EXCEPTION;
}

#[test]
fn test_finally_runs_once_on_normal_completion() {
    let body = Cell::new(0);
    let finally = Cell::new(0);

    let flow = Region::<()>::new(|| {
        body.set(body.get() + 1);
        Flow::Normal
    })
    .finally(|| {
        finally.set(finally.get() + 1);
        Flow::Normal
    })
    .run();

    assert!(flow.is_normal());
    assert_eq!((body.get(), finally.get()), (1, 1));
    assert!(check_balanced().is_ok());
}

#[test]
fn test_finally_runs_once_when_caught() {
    let finally = Cell::new(0);
    let caught = Cell::new(0);

    Region::<()>::new(|| throw!(TIMEOUT, "slow"))
        .catch(&IO_ERROR, |_| {
            caught.set(caught.get() + 1);
            Flow::Normal
        })
        .finally(|| {
            finally.set(finally.get() + 1);
            Flow::Normal
        })
        .run();

    assert_eq!((caught.get(), finally.get()), (1, 1));
    assert_eq!(depth(), 0);
}

#[test]
fn test_finally_runs_once_when_propagating() {
    let inner_finally = Cell::new(0);
    let outer_caught = Cell::new(false);

    Region::<()>::new(|| {
        Region::new(|| throw!(STATE_ERROR))
            .catch(&IO_ERROR, |_| Flow::Normal)
            .finally(|| {
                inner_finally.set(inner_finally.get() + 1);
                // still inside the inner region while finalizing
                assert_eq!(depth(), 2);
                Flow::Normal
            })
            .run()
    })
    .catch(&STATE_ERROR, |_| {
        outer_caught.set(true);
        assert_eq!(depth(), 1);
        Flow::Normal
    })
    .run();

    assert_eq!(inner_finally.get(), 1);
    assert!(outer_caught.get());
    assert_eq!(depth(), 0);
}

#[test]
fn test_on_success_only_without_exception() {
    let success = Cell::new(0);

    Region::<()>::new(|| Flow::Normal)
        .on_success(|| {
            success.set(success.get() + 1);
            Flow::Normal
        })
        .run();
    assert_eq!(success.get(), 1);

    Region::<()>::new(|| throw!(IO_ERROR))
        .catch(&EXCEPTION, |_| Flow::Normal)
        .on_success(|| {
            success.set(success.get() + 1);
            Flow::Normal
        })
        .run();
    assert_eq!(success.get(), 1);
}

#[test]
fn test_phase_order() {
    let order = RefCell::new(Vec::new());

    Region::<()>::new(|| {
        order.borrow_mut().push("body");
        Flow::Normal
    })
    .on_success(|| {
        order.borrow_mut().push("success");
        Flow::Normal
    })
    .finally(|| {
        order.borrow_mut().push("finally");
        Flow::Normal
    })
    .run();

    assert_eq!(*order.borrow(), ["body", "success", "finally"]);
}

#[test]
fn test_status_observed_in_each_phase() {
    let seen = RefCell::new(Vec::new());

    Region::<()>::new(|| {
        seen.borrow_mut().push(current_status());
        throw!(IO_ERROR)
    })
    .catch(&IO_ERROR, |_| {
        seen.borrow_mut().push(current_status());
        Flow::Normal
    })
    .finally(|| {
        seen.borrow_mut().push(current_status());
        Flow::Normal
    })
    .run();

    assert_eq!(
        *seen.borrow(),
        [
            Some(RegionStatus::Trying),
            Some(RegionStatus::CaughtException),
            Some(RegionStatus::CaughtException),
        ]
    );
    assert_eq!(current_status(), None);
}

#[test]
fn test_finalizer_sees_no_exception_status() {
    let seen = Cell::new(None);

    Region::<()>::new(|| Flow::Normal)
        .finally(|| {
            seen.set(current_status());
            Flow::Normal
        })
        .run();

    assert_eq!(seen.get(), Some(RegionStatus::NoException));
}

#[test]
fn test_throw_in_catch_is_not_rematched_locally() {
    let local_clause = Cell::new(0);
    let finally = Cell::new(0);
    let outer = RefCell::new(None);

    Region::<()>::new(|| {
        Region::new(|| throw!(IO_ERROR, "first"))
            .catch(&IO_ERROR, |_| throw!(STATE_ERROR, "second"))
            .catch(&STATE_ERROR, |_| {
                local_clause.set(local_clause.get() + 1);
                Flow::Normal
            })
            .finally(|| {
                finally.set(finally.get() + 1);
                Flow::Normal
            })
            .run()
    })
    .catch(&EXCEPTION, |e| {
        *outer.borrow_mut() = Some(e.clone());
        Flow::Normal
    })
    .run();

    assert_eq!(local_clause.get(), 0);
    assert_eq!(finally.get(), 1);
    let e = outer.into_inner().expect("outer region should catch");
    assert_eq!(e.kind(), &STATE_ERROR);
    assert_eq!(e.message(), Some("second"));
}

#[test]
fn test_throw_in_finally_does_not_rerun_finally() {
    let finally = Cell::new(0);
    let outer = RefCell::new(None);

    Region::<()>::new(|| {
        Region::new(|| Flow::Normal)
            .finally(|| {
                finally.set(finally.get() + 1);
                throw!(STATE_ERROR, "from finally")
            })
            .run()
    })
    .catch(&EXCEPTION, |e| {
        *outer.borrow_mut() = e.message().map(str::to_owned);
        Flow::Normal
    })
    .run();

    assert_eq!(finally.get(), 1);
    assert_eq!(outer.into_inner().as_deref(), Some("from finally"));
    assert!(check_balanced().is_ok());
}

#[test]
fn test_throw_in_finally_replaces_pending_exception() {
    let outer = RefCell::new(None);

    Region::<()>::new(|| {
        Region::new(|| throw!(IO_ERROR, "original"))
            .finally(|| throw!(STATE_ERROR, "replacement"))
            .run()
    })
    .catch(&EXCEPTION, |e| {
        *outer.borrow_mut() = Some(e.kind().name());
        Flow::Normal
    })
    .run();

    assert_eq!(outer.into_inner(), Some("StateError"));
}

#[test]
fn test_throw_in_on_success_skips_catch_clauses() {
    let local_clause = Cell::new(false);
    let finally = Cell::new(0);
    let outer = Cell::new(false);

    Region::<()>::new(|| {
        Region::new(|| Flow::Normal)
            .catch(&EXCEPTION, |_| {
                local_clause.set(true);
                Flow::Normal
            })
            .on_success(|| throw!(IO_ERROR))
            .finally(|| {
                finally.set(finally.get() + 1);
                Flow::Normal
            })
            .run()
    })
    .catch(&IO_ERROR, |_| {
        outer.set(true);
        Flow::Normal
    })
    .run();

    assert!(!local_clause.get());
    assert_eq!(finally.get(), 1);
    assert!(outer.get());
}

#[test]
fn test_rethrow_reaches_enclosing_region() {
    let inner_second_clause = Cell::new(false);
    let outer = RefCell::new(None);

    Region::<()>::new(|| {
        Region::new(|| throw!(TIMEOUT, "slow"))
            .catch(&TIMEOUT, |e| rethrow(e))
            .catch(&IO_ERROR, |_| {
                inner_second_clause.set(true);
                Flow::Normal
            })
            .run()
    })
    .catch(&IO_ERROR, |e| {
        *outer.borrow_mut() = Some(e.clone());
        Flow::Normal
    })
    .run();

    assert!(!inner_second_clause.get());
    let e = outer.into_inner().expect("rethrow should reach the outer region");
    assert_eq!(e.kind(), &TIMEOUT);
    assert_eq!(e.message(), Some("slow"));
}

#[test]
fn test_foreign_panic_runs_finally_and_pops() {
    let finally = Cell::new(0);
    let catch_clause = Cell::new(false);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        Region::<()>::new(|| panic!("not an exception"))
            .catch(&EXCEPTION, |_| {
                catch_clause.set(true);
                Flow::Normal
            })
            .finally(|| {
                finally.set(finally.get() + 1);
                Flow::Normal
            })
            .run()
    }));

    let payload = result.expect_err("panic should continue unwinding");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"not an exception"));
    assert!(!catch_clause.get());
    assert_eq!(finally.get(), 1);
    assert_eq!(depth(), 0);
}

#[test]
fn test_region_without_clauses_propagates() {
    let outer = Cell::new(false);

    Region::<()>::new(|| Region::new(|| throw!(IO_ERROR)).run())
        .catch(&IO_ERROR, |_| {
            outer.set(true);
            Flow::Normal
        })
        .run();

    assert!(outer.get());
}
